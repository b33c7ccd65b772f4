pub mod client;
pub mod config;
pub mod daemon;
pub mod error;
pub mod service;
pub mod source;
pub mod store;
pub mod test_support;

pub use client::{DataPortal, SocrataClient};
pub use daemon::Daemon;
pub use error::FetchError;
pub use service::DatasetService;
pub use source::{fetch_domain, DomainSource, SoqlQuery};
pub use store::SqliteWriter;
