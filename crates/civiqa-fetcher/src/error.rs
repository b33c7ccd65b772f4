use civiqa_models::DomainId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] civiqa_cache::CacheError),

    #[error("no rows fetched for domain {0}")]
    EmptyDataset(DomainId),

    #[error("domain {0} is not configured for fetching")]
    UnknownDomain(DomainId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("fetcher internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
