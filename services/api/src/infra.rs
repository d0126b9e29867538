use conta_comigo::config::DashboardConfig;
use conta_comigo::vacancies::sources::SourceFetcher;
use conta_comigo::vacancies::{DatasetCache, FilterState, Profession};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{de, Deserialize, Deserializer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) type SharedDataset = Arc<DatasetCache<Box<dyn SourceFetcher>>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) dataset: SharedDataset,
    pub(crate) dashboard: DashboardConfig,
    /// Vacancy page the snapshot was scraped from, linked on the dashboard.
    pub(crate) source_url: Arc<str>,
}

impl AppState {
    /// Bound to its socket and holding a loaded snapshot.
    pub(crate) fn is_ready(&self) -> bool {
        self.readiness.load(Ordering::Acquire) && self.dataset.is_loaded()
    }
}

/// Query string shared by the dashboard form and the JSON endpoint.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) profession: Profession,
    #[serde(default, deserialize_with = "deserialize_optional_km")]
    pub(crate) max_distance: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub(crate) show_table: bool,
}

impl From<SearchQuery> for FilterState {
    fn from(query: SearchQuery) -> Self {
        FilterState {
            city: query.city,
            state: query.state,
            profession: query.profession,
            max_distance_km: query.max_distance,
            show_table: query.show_table,
        }
    }
}

/// Empty form fields mean "not chosen yet".
pub(crate) fn deserialize_optional_km<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| de::Error::custom(format!("invalid distance `{trimmed}`, expected whole km")))
}

/// HTML checkboxes submit `on`; API callers tend to send `true`.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "" | "off" | "false" | "0" | "no" => Ok(false),
        other => Err(de::Error::custom(format!("invalid flag `{other}`"))),
    }
}
