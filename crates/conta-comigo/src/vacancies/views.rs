use super::domain::{FilterState, IbgeId, Profession};
use super::loader::{Dataset, LoadSummary};
use super::pipeline::{DistanceBounds, FilteredView, OriginStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginView {
    pub status: OriginState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ibge_id: Option<IbgeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginState {
    NotSet,
    Resolved,
    NotFound,
}

impl From<&OriginStatus> for OriginView {
    fn from(origin: &OriginStatus) -> Self {
        match origin {
            OriginStatus::NotSet => Self {
                status: OriginState::NotSet,
                city: None,
                state: None,
                ibge_id: None,
                message: None,
            },
            OriginStatus::Resolved(record) => Self {
                status: OriginState::Resolved,
                city: Some(record.city_name.clone()),
                state: Some(record.state_code.clone()),
                ibge_id: Some(record.ibge_id.clone()),
                message: None,
            },
            OriginStatus::NotFound { city, state } => Self {
                status: OriginState::NotFound,
                city: Some(city.clone()),
                state: Some(state.clone()),
                ibge_id: None,
                message: origin.message(),
            },
        }
    }
}

/// One marker on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
    pub openings: u32,
}

/// One line of the optional results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub state_code: String,
    pub city_name: String,
    pub openings: u32,
    pub ibge_id: IbgeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacancySearchView {
    pub profession: Profession,
    pub profession_label: &'static str,
    pub origin: OriginView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_bounds: Option<DistanceBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance_km: Option<u32>,
    pub result_count: usize,
    pub points: Vec<MapPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<ResultRow>>,
    pub loaded_at: DateTime<Utc>,
    pub load_summary: LoadSummary,
}

impl VacancySearchView {
    pub fn build(dataset: &Dataset, filter: &FilterState, view: &FilteredView<'_>) -> Self {
        let profession = view.profession;
        let points = view
            .rows
            .iter()
            .map(|row| MapPoint {
                latitude: row.listing.coordinates.latitude,
                longitude: row.listing.coordinates.longitude,
                label: format!("{} ({})", row.listing.city_name_raw, row.listing.state_code),
                openings: row.openings(profession),
            })
            .collect();

        let table = filter.show_table.then(|| {
            view.rows
                .iter()
                .map(|row| ResultRow {
                    state_code: row.listing.state_code.clone(),
                    city_name: row.listing.city_name_raw.clone(),
                    openings: row.openings(profession),
                    ibge_id: row.listing.ibge_id.clone(),
                    distance_km: row.distance_km.map(round_km),
                })
                .collect()
        });

        Self {
            profession,
            profession_label: profession.label(),
            origin: OriginView::from(&view.origin),
            distance_bounds: view.distance_bounds,
            max_distance_km: view.max_distance_km,
            result_count: view.rows.len(),
            points,
            table,
            loaded_at: dataset.loaded_at(),
            load_summary: dataset.summary().clone(),
        }
    }
}

fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}
