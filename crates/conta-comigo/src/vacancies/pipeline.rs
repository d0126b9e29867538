use super::distance::compute_distances;
use super::domain::{CityRecord, FilterState, Profession, VacancyListing};
use super::loader::Dataset;
use serde::Serialize;
use tracing::info;

/// How the origin typed by the user was resolved for this interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginStatus {
    NotSet,
    Resolved(CityRecord),
    NotFound { city: String, state: String },
}

impl OriginStatus {
    pub fn city(&self) -> Option<&CityRecord> {
        match self {
            OriginStatus::Resolved(city) => Some(city),
            OriginStatus::NotSet | OriginStatus::NotFound { .. } => None,
        }
    }

    pub fn message(&self) -> Option<String> {
        match self {
            OriginStatus::NotSet | OriginStatus::Resolved(_) => None,
            OriginStatus::NotFound { city, state } => Some(format!(
                "Cidade '{city}' ({state}) não encontrada; mostrando todas as cidades sem filtro de distância."
            )),
        }
    }
}

/// Slider range derived from the distances of the rows on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistanceBounds {
    pub min_km: u32,
    pub max_km: u32,
}

impl DistanceBounds {
    fn spanning(distances: impl Iterator<Item = f64>) -> Option<Self> {
        let (min, max) = distances.fold(None, |range: Option<(f64, f64)>, km| match range {
            None => Some((km, km)),
            Some((min, max)) => Some((min.min(km), max.max(km))),
        })?;
        Some(Self {
            min_km: min.ceil() as u32,
            max_km: max.ceil() as u32,
        })
    }

    pub fn clamp(&self, km: u32) -> u32 {
        km.clamp(self.min_km, self.max_km)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingMatch<'a> {
    pub listing: &'a VacancyListing,
    pub distance_km: Option<f64>,
}

impl ListingMatch<'_> {
    pub fn openings(&self, profession: Profession) -> u32 {
        self.listing.openings.get(profession)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    pub profession: Profession,
    pub origin: OriginStatus,
    pub distance_bounds: Option<DistanceBounds>,
    /// Cutoff actually applied; `None` without a resolved origin.
    pub max_distance_km: Option<u32>,
    pub rows: Vec<ListingMatch<'a>>,
}

/// Runs one interaction against the snapshot.
///
/// Without a resolved origin the rows keep source order and carry no
/// distance. With one, rows are sorted by distance (ties by IBGE id) and cut
/// at the requested maximum, or `default_max_km` clamped into the slider
/// range when the user has not chosen one.
pub fn apply<'a>(dataset: &'a Dataset, filter: &FilterState, default_max_km: u32) -> FilteredView<'a> {
    let origin = resolve_origin(dataset, filter);
    let profession = filter.profession;

    let mut rows: Vec<ListingMatch<'a>> = match origin.city() {
        Some(city) => {
            let distances = compute_distances(dataset.listings(), city.coordinates);
            let mut rows: Vec<_> = dataset
                .listings()
                .iter()
                .map(|listing| ListingMatch {
                    listing,
                    distance_km: distances.get(&listing.ibge_id).copied(),
                })
                .collect();
            rows.sort_by(|a, b| {
                let a_km = a.distance_km.unwrap_or(f64::INFINITY);
                let b_km = b.distance_km.unwrap_or(f64::INFINITY);
                a_km.total_cmp(&b_km)
                    .then_with(|| a.listing.ibge_id.cmp(&b.listing.ibge_id))
            });
            rows
        }
        None => dataset
            .listings()
            .iter()
            .map(|listing| ListingMatch {
                listing,
                distance_km: None,
            })
            .collect(),
    };

    rows.retain(|row| row.openings(profession) > 0);

    let (distance_bounds, max_distance_km) = if origin.city().is_some() {
        let bounds = DistanceBounds::spanning(rows.iter().filter_map(|row| row.distance_km));
        let cutoff = filter
            .max_distance_km
            .or_else(|| bounds.map(|bounds| bounds.clamp(default_max_km)))
            .unwrap_or(default_max_km);
        rows.retain(|row| {
            row.distance_km
                .is_some_and(|km| km <= f64::from(cutoff))
        });
        (bounds, Some(cutoff))
    } else {
        (None, None)
    };

    FilteredView {
        profession,
        origin,
        distance_bounds,
        max_distance_km,
        rows,
    }
}

fn resolve_origin(dataset: &Dataset, filter: &FilterState) -> OriginStatus {
    let Some((city, state)) = filter.origin_query() else {
        return OriginStatus::NotSet;
    };

    match dataset.lookup().resolve(city, state) {
        Some(record) => OriginStatus::Resolved(record.clone()),
        None => {
            info!(city, state, "origin city not found; distance filter skipped");
            OriginStatus::NotFound {
                city: city.to_string(),
                state: state.to_string(),
            }
        }
    }
}
