pub mod aggregator;
pub mod etl;
pub mod persister;
pub mod reconciler;

pub use crate::domain::model::{CanonicalJob, PersistedJob};
pub use crate::domain::ports::{
    EntityRepository, JobRepository, ProviderAdapter, Storage, Transport,
};
pub use crate::utils::error::Result;
