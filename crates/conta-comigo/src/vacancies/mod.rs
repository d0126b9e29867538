pub mod cache;
pub mod corrections;
pub mod distance;
pub mod domain;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod sources;
pub mod views;

pub use cache::DatasetCache;
pub use corrections::{CorrectionRule, CorrectionTable};
pub use distance::{compute_distances, distance_km};
pub use domain::{CityRecord, Coordinates, FilterState, IbgeId, Openings, Profession, VacancyListing};
pub use loader::{assemble, CityLookup, Dataset, DatasetLoader, LoadError, LoadSummary, SourceTable};
pub use normalizer::normalize;
pub use pipeline::{apply, DistanceBounds, FilteredView, ListingMatch, OriginStatus};
pub use views::{MapPoint, OriginState, OriginView, ResultRow, VacancySearchView};
