use super::SourceError;
use crate::vacancies::domain::{Coordinates, IbgeId, Openings, Profession};
use crate::vacancies::normalizer::normalize;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use tracing::warn;

/// One row of the vacancy page, city name already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct VacancyRow {
    pub state_code: String,
    pub city_name_raw: String,
    pub city_name: String,
    pub openings: Openings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryRow {
    pub ibge_id: IbgeId,
    pub city_name: String,
    pub state_code: String,
    pub population: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRow {
    pub ibge_id: IbgeId,
    pub coordinates: Coordinates,
}

fn selector(css: &'static str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|_| SourceError::Selector(css))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct VacancyColumns {
    state: usize,
    city: usize,
    professions: [(Profession, usize); 4],
}

impl VacancyColumns {
    fn locate(headers: &[String]) -> Result<Self, SourceError> {
        let find = |wanted: &'static str| {
            headers
                .iter()
                .position(|header| normalize(header) == wanted)
                .ok_or(SourceError::MissingColumn(wanted))
        };

        let mut professions = [(Profession::Medicine, 0); 4];
        for (slot, profession) in professions.iter_mut().zip(Profession::ordered()) {
            let wanted = match profession {
                Profession::Medicine => "medicina",
                Profession::Nursing => "enfermagem",
                Profession::Pharmacy => "farmacia",
                Profession::Physiotherapy => "fisioterapia",
            };
            *slot = (profession, find(wanted)?);
        }

        Ok(Self {
            state: find("uf")?,
            city: find("municipio")?,
            professions,
        })
    }
}

/// Reads the first `<table>` of the vacancy page. The first row with cells is
/// the header; rows without a state or city (totals, spacers) are skipped.
pub fn parse_vacancy_table(html: &str) -> Result<Vec<VacancyRow>, SourceError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("th, td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or(SourceError::NoTable)?;

    let mut rows = table
        .select(&row_selector)
        .map(|row| row.select(&cell_selector).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty());

    let headers = rows.next().ok_or(SourceError::MissingColumn("uf"))?;
    let columns = VacancyColumns::locate(&headers)?;

    let mut parsed = Vec::new();
    for (index, cells) in rows.enumerate() {
        let state_code = cells
            .get(columns.state)
            .map(|value| value.trim().to_ascii_uppercase())
            .unwrap_or_default();
        let city_name_raw = cells.get(columns.city).cloned().unwrap_or_default();
        if state_code.is_empty() || city_name_raw.trim().is_empty() {
            continue;
        }

        let mut openings = Openings::default();
        for (profession, column) in columns.professions {
            let raw = cells.get(column).map(String::as_str).unwrap_or("");
            let count = parse_count(raw).ok_or_else(|| SourceError::InvalidCount {
                row: index + 1,
                column: profession.label(),
                value: raw.to_string(),
            })?;
            openings.set(profession, count);
        }

        parsed.push(VacancyRow {
            city_name: normalize(&city_name_raw),
            state_code,
            city_name_raw,
            openings,
        });
    }

    Ok(parsed)
}

/// Blank cells count as zero; `1.234` is a thousands-separated 1234.
fn parse_count(raw: &str) -> Option<u32> {
    let digits: String = raw.trim().chars().filter(|c| *c != '.').collect();
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse::<u32>().ok()
}

#[derive(Debug, Deserialize)]
struct RawRegistryRow {
    #[serde(rename = "ibgeID")]
    ibge_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    cidade: Option<String>,
    estado: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pop: Option<String>,
}

/// Reads the population registry (`ibgeID,cidade,estado,pop`); extra columns
/// such as a leading unnamed index are ignored.
pub fn parse_registry<R: Read>(reader: R) -> Result<Vec<RegistryRow>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<RawRegistryRow>() {
        let row = record?;
        let Some(city) = row.cidade else {
            warn!(ibge_id = %row.ibge_id, "registry row without city name skipped");
            continue;
        };

        rows.push(RegistryRow {
            ibge_id: IbgeId::new(&row.ibge_id),
            city_name: normalize(&city),
            state_code: row.estado.to_ascii_uppercase(),
            population: row.pop.as_deref().and_then(parse_population),
        });
    }

    Ok(rows)
}

fn parse_population(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value.round() as u64)
    })
}

#[derive(Debug, Deserialize)]
struct RawCoordinateRow {
    codigo_ibge: String,
    latitude: f64,
    longitude: f64,
}

/// Reads the coordinates registry, keeping only the id and the position.
pub fn parse_coordinates<R: Read>(reader: R) -> Result<Vec<CoordinateRow>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<RawCoordinateRow>() {
        let row = record?;
        rows.push(CoordinateRow {
            ibge_id: IbgeId::new(&row.codigo_ibge),
            coordinates: Coordinates::new(row.latitude, row.longitude),
        });
    }

    Ok(rows)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PAGE: &str = r#"<html><body>
<p>Lista de vagas</p>
<table>
  <thead><tr><th>UF</th><th>Município</th><th>Medicina</th><th>Enfermagem</th><th>Farmácia</th><th>Fisioterapia</th></tr></thead>
  <tbody>
    <tr><td>AC</td><td>Rio Branco</td><td>4</td><td>10</td><td>0</td><td>2</td></tr>
    <tr><td>sp</td><td>São  Paulo</td><td>1.200</td><td></td><td>7</td><td>0</td></tr>
    <tr><td></td><td>Total</td><td>1204</td><td>10</td><td>7</td><td>2</td></tr>
  </tbody>
</table>
<table><tr><td>ignored</td></tr></table>
</body></html>"#;

    #[test]
    fn vacancy_table_reads_first_table_and_skips_totals() {
        let rows = parse_vacancy_table(PAGE).expect("page parses");
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].state_code, "AC");
        assert_eq!(rows[0].city_name_raw, "Rio Branco");
        assert_eq!(rows[0].city_name, "rio branco");
        assert_eq!(rows[0].openings.get(Profession::Nursing), 10);

        assert_eq!(rows[1].state_code, "SP");
        assert_eq!(rows[1].city_name_raw, "São Paulo");
        assert_eq!(rows[1].city_name, "sao paulo");
        assert_eq!(rows[1].openings.get(Profession::Medicine), 1200);
        assert_eq!(rows[1].openings.get(Profession::Nursing), 0);
    }

    #[test]
    fn vacancy_table_requires_profession_columns() {
        let page = "<table><tr><th>UF</th><th>Municipio</th><th>Medicina</th></tr></table>";
        assert!(matches!(
            parse_vacancy_table(page),
            Err(SourceError::MissingColumn("enfermagem"))
        ));
    }

    #[test]
    fn vacancy_table_rejects_non_numeric_counts() {
        let page = "<table><tr><td>UF</td><td>Município</td><td>Medicina</td><td>Enfermagem</td><td>Farmácia</td><td>Fisioterapia</td></tr>\
<tr><td>AC</td><td>Xapuri</td><td>n/a</td><td>0</td><td>0</td><td>0</td></tr></table>";
        match parse_vacancy_table(page) {
            Err(SourceError::InvalidCount { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "Medicina");
                assert_eq!(value, "n/a");
            }
            other => panic!("expected invalid count, got {other:?}"),
        }
    }

    #[test]
    fn page_without_table_is_an_error() {
        assert!(matches!(
            parse_vacancy_table("<html><body>manutenção</body></html>"),
            Err(SourceError::NoTable)
        ));
    }

    #[test]
    fn registry_ignores_index_column_and_skips_nameless_rows() {
        let csv = ",ibgeID,cidade,estado,pop\n\
0,1200401,Rio Branco,AC,413418\n\
1,3550308,São Paulo,SP,12325232.0\n\
2,9999999,,SP,\n";
        let rows = parse_registry(Cursor::new(csv)).expect("registry parses");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ibge_id, IbgeId::new("1200401"));
        assert_eq!(rows[0].population, Some(413_418));
        assert_eq!(rows[1].city_name, "sao paulo");
        assert_eq!(rows[1].population, Some(12_325_232));
    }

    #[test]
    fn coordinates_keep_id_and_position() {
        let csv = "codigo_ibge,nome,latitude,longitude,capital,codigo_uf\n\
1200401,Rio Branco,-9.97499,-67.8243,1,12\n";
        let rows = parse_coordinates(Cursor::new(csv)).expect("coordinates parse");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ibge_id.as_str(), "1200401");
        assert_eq!(rows[0].coordinates, Coordinates::new(-9.97499, -67.8243));
    }

    #[test]
    fn malformed_coordinates_fail_the_parse() {
        let csv = "codigo_ibge,latitude,longitude\n1200401,north,-67.8\n";
        assert!(matches!(
            parse_coordinates(Cursor::new(csv)),
            Err(SourceError::Csv(_))
        ));
    }
}
