use super::corrections::CorrectionTable;
use super::domain::{CityRecord, Coordinates, IbgeId, VacancyListing};
use super::normalizer::normalize;
use super::sources::{
    parse_coordinates, parse_registry, parse_vacancy_table, CoordinateRow, RegistryRow,
    SourceError, SourceFetcher, VacancyRow,
};
use crate::config::SourceConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Cursor;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTable {
    Vacancies,
    Registry,
    Coordinates,
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceTable::Vacancies => "vacancy",
            SourceTable::Registry => "city registry",
            SourceTable::Coordinates => "coordinates",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not load the {table} table: {source}")]
    Source {
        table: SourceTable,
        #[source]
        source: SourceError,
    },
    #[error("could not read correction rules: {0}")]
    Corrections(#[from] csv::Error),
    #[error("dataset load was interrupted: {0}")]
    Interrupted(String),
}

/// Counters describing how the three sources joined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub vacancy_rows: usize,
    pub registry_rows: usize,
    pub coordinate_rows: usize,
    pub listings: usize,
    pub lookup_cities: usize,
    pub without_registry_match: usize,
    pub without_coordinates: usize,
    pub corrections_applied: usize,
}

/// Every known municipality with coordinates, searchable by state and name.
#[derive(Debug, Clone, Default)]
pub struct CityLookup {
    cities: Vec<CityRecord>,
    by_name: HashMap<(String, String), usize>,
}

impl CityLookup {
    pub fn new(records: impl IntoIterator<Item = CityRecord>) -> Self {
        let mut lookup = Self::default();
        let mut seen: HashSet<IbgeId> = HashSet::new();

        for record in records {
            if !seen.insert(record.ibge_id.clone()) {
                warn!(ibge_id = %record.ibge_id, "duplicate municipality in lookup ignored");
                continue;
            }
            let key = (record.state_code.clone(), record.city_name.clone());
            lookup.by_name.entry(key).or_insert(lookup.cities.len());
            lookup.cities.push(record);
        }

        lookup
    }

    /// Matches user-typed text after normalizing both parts.
    pub fn resolve(&self, city: &str, state: &str) -> Option<&CityRecord> {
        let key = (normalize(state).to_ascii_uppercase(), normalize(city));
        self.by_name.get(&key).map(|index| &self.cities[*index])
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

/// Immutable result of one load: the listings and the origin lookup.
#[derive(Debug, Clone)]
pub struct Dataset {
    listings: Vec<VacancyListing>,
    lookup: CityLookup,
    summary: LoadSummary,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn from_parts(listings: Vec<VacancyListing>, cities: Vec<CityRecord>) -> Self {
        let lookup = CityLookup::new(cities);
        let summary = LoadSummary {
            vacancy_rows: listings.len(),
            listings: listings.len(),
            lookup_cities: lookup.len(),
            ..LoadSummary::default()
        };
        Self {
            listings,
            lookup,
            summary,
            loaded_at: Utc::now(),
        }
    }

    pub fn listings(&self) -> &[VacancyListing] {
        &self.listings
    }

    pub fn lookup(&self) -> &CityLookup {
        &self.lookup
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

pub struct DatasetLoader<F> {
    fetcher: F,
    sources: SourceConfig,
    corrections: CorrectionTable,
}

impl<F: SourceFetcher> DatasetLoader<F> {
    pub fn new(fetcher: F, sources: SourceConfig, corrections: CorrectionTable) -> Self {
        Self {
            fetcher,
            sources,
            corrections,
        }
    }

    /// Built-in corrections plus the operator file named in the config, if any.
    pub fn from_config(fetcher: F, sources: SourceConfig) -> Result<Self, LoadError> {
        let corrections = match &sources.corrections_path {
            Some(path) => CorrectionTable::builtin().with_file(path)?,
            None => CorrectionTable::builtin(),
        };
        debug!(rules = corrections.rules().len(), "correction rules ready");
        Ok(Self::new(fetcher, sources, corrections))
    }

    /// Where each table is fetched from, for linking and logging.
    pub fn sources(&self) -> &SourceConfig {
        &self.sources
    }

    /// Fetches and joins all three sources. Any failure aborts the whole load.
    pub fn load(&self) -> Result<Dataset, LoadError> {
        let vacancies = self
            .fetch(SourceTable::Vacancies, &self.sources.vacancy_url)
            .and_then(|html| parse_vacancy_table(&html))
            .map_err(|source| LoadError::Source {
                table: SourceTable::Vacancies,
                source,
            })?;

        let registry = self
            .fetch(SourceTable::Registry, &self.sources.registry_url)
            .and_then(|body| parse_registry(Cursor::new(body)))
            .map_err(|source| LoadError::Source {
                table: SourceTable::Registry,
                source,
            })?;

        let coordinates = self
            .fetch(SourceTable::Coordinates, &self.sources.coordinates_url)
            .and_then(|body| parse_coordinates(Cursor::new(body)))
            .map_err(|source| LoadError::Source {
                table: SourceTable::Coordinates,
                source,
            })?;

        let dataset = assemble(vacancies, registry, coordinates, &self.corrections);
        let summary = dataset.summary();
        info!(
            vacancy_rows = summary.vacancy_rows,
            listings = summary.listings,
            lookup_cities = summary.lookup_cities,
            without_registry_match = summary.without_registry_match,
            without_coordinates = summary.without_coordinates,
            corrections_applied = summary.corrections_applied,
            "vacancy dataset loaded"
        );
        Ok(dataset)
    }

    fn fetch(&self, table: SourceTable, url: &str) -> Result<String, SourceError> {
        debug!(%table, url, "loading source table");
        self.fetcher.fetch(url)
    }
}

/// Joins parsed sources into a dataset.
///
/// Vacancy rows are left-joined to the registry on state and normalized city
/// name, with correction rules taking precedence over the name match. The
/// result is inner-joined to the coordinates on the IBGE id; rows missing
/// either match are dropped from the listings. The lookup is the registry
/// inner-joined to the coordinates.
pub fn assemble(
    vacancies: Vec<VacancyRow>,
    registry: Vec<RegistryRow>,
    coordinates: Vec<CoordinateRow>,
    corrections: &CorrectionTable,
) -> Dataset {
    let mut summary = LoadSummary {
        vacancy_rows: vacancies.len(),
        registry_rows: registry.len(),
        coordinate_rows: coordinates.len(),
        ..LoadSummary::default()
    };

    let mut registry_by_name: HashMap<(&str, &str), &RegistryRow> = HashMap::new();
    let mut registry_by_id: HashMap<&IbgeId, &RegistryRow> = HashMap::new();
    for row in &registry {
        registry_by_name
            .entry((row.state_code.as_str(), row.city_name.as_str()))
            .or_insert(row);
        registry_by_id.entry(&row.ibge_id).or_insert(row);
    }

    let mut positions: HashMap<&IbgeId, Coordinates> = HashMap::new();
    for row in &coordinates {
        positions.entry(&row.ibge_id).or_insert(row.coordinates);
    }

    let mut listings = Vec::with_capacity(vacancies.len());
    for vacancy in vacancies {
        let corrected = corrections
            .lookup(&vacancy.state_code, &vacancy.city_name)
            .and_then(|ibge_id| {
                let found = registry_by_id.get(ibge_id).copied();
                if found.is_none() {
                    warn!(%ibge_id, city = %vacancy.city_name_raw, "correction targets an unknown municipality");
                }
                found
            });
        if corrected.is_some() {
            summary.corrections_applied += 1;
        }

        let matched = corrected.or_else(|| {
            registry_by_name
                .get(&(vacancy.state_code.as_str(), vacancy.city_name.as_str()))
                .copied()
        });

        let Some(city) = matched else {
            debug!(state = %vacancy.state_code, city = %vacancy.city_name_raw, "no registry match");
            summary.without_registry_match += 1;
            continue;
        };

        let Some(position) = positions.get(&city.ibge_id).copied() else {
            debug!(ibge_id = %city.ibge_id, city = %vacancy.city_name_raw, "no coordinates");
            summary.without_coordinates += 1;
            continue;
        };

        listings.push(VacancyListing {
            state_code: vacancy.state_code,
            city_name_raw: vacancy.city_name_raw,
            city_name: vacancy.city_name,
            openings: vacancy.openings,
            ibge_id: city.ibge_id.clone(),
            coordinates: position,
        });
    }

    if summary.without_registry_match + summary.without_coordinates > 0 {
        warn!(
            without_registry_match = summary.without_registry_match,
            without_coordinates = summary.without_coordinates,
            "vacancy rows dropped from the map"
        );
    }

    let cities = registry.iter().filter_map(|row| {
        positions.get(&row.ibge_id).map(|position| CityRecord {
            ibge_id: row.ibge_id.clone(),
            city_name: row.city_name.clone(),
            state_code: row.state_code.clone(),
            coordinates: *position,
            population: row.population,
        })
    });
    let lookup = CityLookup::new(cities);

    summary.listings = listings.len();
    summary.lookup_cities = lookup.len();

    Dataset {
        listings,
        lookup,
        summary,
        loaded_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vacancies::domain::{Openings, Profession};
    use crate::vacancies::sources::StaticFetcher;

    fn vacancy(state: &str, city: &str, medicine: u32) -> VacancyRow {
        VacancyRow {
            state_code: state.to_string(),
            city_name_raw: city.to_string(),
            city_name: normalize(city),
            openings: Openings::default().with(Profession::Medicine, medicine),
        }
    }

    fn registry(id: &str, city: &str, state: &str) -> RegistryRow {
        RegistryRow {
            ibge_id: IbgeId::new(id),
            city_name: normalize(city),
            state_code: state.to_string(),
            population: None,
        }
    }

    fn position(id: &str, latitude: f64, longitude: f64) -> CoordinateRow {
        CoordinateRow {
            ibge_id: IbgeId::new(id),
            coordinates: Coordinates::new(latitude, longitude),
        }
    }

    #[test]
    fn listings_require_registry_and_coordinate_matches() {
        let dataset = assemble(
            vec![
                vacancy("AC", "Rio Branco", 2),
                vacancy("AC", "Cidade Fantasma", 1),
                vacancy("AM", "Manaus", 5),
            ],
            vec![
                registry("1200401", "Rio Branco", "AC"),
                registry("1302603", "Manaus", "AM"),
                registry("1200203", "Cruzeiro do Sul", "AC"),
            ],
            vec![
                position("1200401", -9.97499, -67.8243),
                position("1200203", -7.63, -72.67),
            ],
            &CorrectionTable::default(),
        );

        assert_eq!(dataset.listings().len(), 1);
        assert_eq!(dataset.listings()[0].ibge_id.as_str(), "1200401");
        assert_eq!(dataset.summary().without_registry_match, 1);
        assert_eq!(dataset.summary().without_coordinates, 1);

        assert_eq!(dataset.lookup().len(), 2);
        let origin = dataset
            .lookup()
            .resolve("Cruzeiro-do-Sul", "ac")
            .expect("lookup includes cities without vacancies");
        assert_eq!(origin.ibge_id.as_str(), "1200203");
        assert!(dataset.lookup().resolve("Manaus", "AM").is_none());
    }

    #[test]
    fn corrections_override_name_join() {
        let dataset = assemble(
            vec![vacancy("SP", "Embu", 3)],
            vec![registry("3515004", "Embu das Artes", "SP")],
            vec![position("3515004", -23.65, -46.85)],
            &CorrectionTable::builtin(),
        );

        assert_eq!(dataset.summary().corrections_applied, 1);
        assert_eq!(dataset.listings().len(), 1);
        assert_eq!(dataset.listings()[0].ibge_id.as_str(), "3515004");
        assert_eq!(dataset.listings()[0].city_name_raw, "Embu");
    }

    #[test]
    fn lookup_keeps_first_duplicate_id() {
        let lookup = CityLookup::new(vec![
            CityRecord {
                ibge_id: IbgeId::new("1"),
                city_name: "a".to_string(),
                state_code: "AC".to_string(),
                coordinates: Coordinates::new(0.0, 0.0),
                population: None,
            },
            CityRecord {
                ibge_id: IbgeId::new("1"),
                city_name: "b".to_string(),
                state_code: "AC".to_string(),
                coordinates: Coordinates::new(1.0, 1.0),
                population: None,
            },
        ]);
        assert_eq!(lookup.len(), 1);
        assert!(lookup.resolve("b", "AC").is_none());
    }

    #[test]
    fn from_config_keeps_sources_and_rejects_missing_rule_file() {
        let sources = SourceConfig {
            vacancy_url: "mem://vagas".to_string(),
            ..SourceConfig::default()
        };
        let loader = DatasetLoader::from_config(StaticFetcher::default(), sources.clone())
            .expect("built-in rules need no file");
        assert_eq!(loader.sources().vacancy_url, "mem://vagas");

        let missing = SourceConfig {
            corrections_path: Some("/nonexistent/correcoes.csv".into()),
            ..sources
        };
        assert!(matches!(
            DatasetLoader::from_config(StaticFetcher::default(), missing),
            Err(LoadError::Corrections(_))
        ));
    }

    #[test]
    fn fetch_failure_names_the_failing_table() {
        let sources = SourceConfig {
            vacancy_url: "mem://vagas".to_string(),
            registry_url: "mem://cidades".to_string(),
            coordinates_url: "mem://coordenadas".to_string(),
            ..SourceConfig::default()
        };
        let fetcher = StaticFetcher::default().with_document(
            "mem://vagas",
            "<table><tr><th>UF</th><th>Município</th><th>Medicina</th><th>Enfermagem</th><th>Farmácia</th><th>Fisioterapia</th></tr></table>",
        );
        let loader = DatasetLoader::new(fetcher, sources, CorrectionTable::builtin());

        match loader.load() {
            Err(LoadError::Source { table, source }) => {
                assert_eq!(table, SourceTable::Registry);
                assert!(matches!(source, SourceError::Missing(_)));
            }
            other => panic!("expected registry failure, got {other:?}"),
        }
    }
}
