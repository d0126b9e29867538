mod decode;
mod fetch;
mod parser;

pub use decode::decode_document;
pub use fetch::{HttpFetcher, SourceFetcher, StaticFetcher};
pub use parser::{
    parse_coordinates, parse_registry, parse_vacancy_table, CoordinateRow, RegistryRow,
    VacancyRow,
};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("no document registered for {0}")]
    Missing(String),
    #[error("vacancy page has no table")]
    NoTable,
    #[error("vacancy table is missing the '{0}' column")]
    MissingColumn(&'static str),
    #[error("invalid {column} count '{value}' on vacancy row {row}")]
    InvalidCount {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("invalid selector '{0}'")]
    Selector(&'static str),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}
