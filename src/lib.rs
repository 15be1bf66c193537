pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;
pub use config::IngestConfig;

pub use adapters::{FileStore, HttpTransport, LocalStorage, MemoryStore};
pub use core::{
    etl::{IngestReport, IngestionEngine},
    persister::ReingestPolicy,
};
pub use domain::model::{
    CanonicalJob, Company, Currency, JobType, Location, PersistedJob, ProviderReference, Salary,
    Skill,
};
pub use utils::error::{IngestError, Result};
