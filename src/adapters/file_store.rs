use crate::adapters::file_storage::LocalStorage;
use crate::adapters::memory_store::{MemoryStore, StoreSnapshot};
use crate::domain::model::{
    Company, CompanyDraft, NewJob, PersistedJob, ProviderReference, Skill, SkillDraft,
};
use crate::domain::ports::{EntityRepository, JobRepository, SaveOutcome, Storage, WriteMode};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use tokio::sync::Mutex;

pub const DEFAULT_STORE_FILENAME: &str = "job_store.json";

/// Durable store backed by one JSON snapshot on a `Storage`.
///
/// Every repository call reloads the snapshot, applies the change through
/// `MemoryStore` and writes the snapshot back before returning, so consecutive runs
/// (and separate `FileStore` instances over the same file) see each other's rows.
/// Calls on one instance are serialized; separate processes must not overlap.
pub struct FileStore<S: Storage = LocalStorage> {
    storage: S,
    file: String,
    lock: Mutex<()>,
}

impl<S: Storage> FileStore<S> {
    pub fn new(storage: S, file: impl Into<String>) -> Self {
        Self {
            storage,
            file: file.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// 讀取目前的 snapshot；檔案不存在時視為空的 store
    pub async fn load(&self) -> Result<MemoryStore> {
        match self.storage.read_file(&self.file).await {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                Ok(MemoryStore::from_snapshot(snapshot))
            }
            Err(IngestError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("📂 {} not found, starting from an empty store", self.file);
                Ok(MemoryStore::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, store: &MemoryStore) -> Result<()> {
        let data = serde_json::to_vec_pretty(&store.snapshot().await)?;
        self.storage.write_file(&self.file, &data).await
    }

    pub async fn companies(&self) -> Result<Vec<Company>> {
        Ok(self.load().await?.companies().await)
    }

    pub async fn skills(&self) -> Result<Vec<Skill>> {
        Ok(self.load().await?.skills().await)
    }

    pub async fn jobs(&self) -> Result<Vec<PersistedJob>> {
        Ok(self.load().await?.jobs().await)
    }

    pub async fn job_by_reference(&self, reference: &ProviderReference) -> Result<Option<PersistedJob>> {
        Ok(self.load().await?.job_by_reference(reference).await)
    }
}

#[async_trait]
impl<S: Storage + 'static> EntityRepository<Company> for FileStore<S> {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Company>> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        <MemoryStore as EntityRepository<Company>>::find_by_names(&store, names).await
    }

    async fn insert_many(&self, drafts: &[CompanyDraft]) -> Result<Vec<Company>> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        let created = <MemoryStore as EntityRepository<Company>>::insert_many(&store, drafts).await?;
        self.save(&store).await?;
        Ok(created)
    }
}

#[async_trait]
impl<S: Storage + 'static> EntityRepository<Skill> for FileStore<S> {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Skill>> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        <MemoryStore as EntityRepository<Skill>>::find_by_names(&store, names).await
    }

    async fn insert_many(&self, drafts: &[SkillDraft]) -> Result<Vec<Skill>> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        let created = <MemoryStore as EntityRepository<Skill>>::insert_many(&store, drafts).await?;
        self.save(&store).await?;
        Ok(created)
    }
}

#[async_trait]
impl<S: Storage + 'static> JobRepository for FileStore<S> {
    async fn save_batch(&self, jobs: Vec<NewJob>, mode: WriteMode) -> Result<SaveOutcome> {
        let _guard = self.lock.lock().await;
        let store = self.load().await?;
        let outcome = store.save_batch(jobs, mode).await?;
        self.save(&store).await?;
        Ok(outcome)
    }
}
