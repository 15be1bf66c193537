use crate::domain::model::{
    CanonicalJob, Company, CompanyDraft, CompanyId, NewJob, PersistedJob, Skill, SkillDraft,
    SkillId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Provider 回傳的原始內容，尚未解析
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
}

impl RawPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

/// 注入的傳輸能力；失敗時回傳 TransportError
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPayload>;
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name; first half of every job's ProviderReference.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<RawPayload>;

    /// Pure mapping into canonical jobs. Any unmappable value fails the whole payload.
    fn normalize(&self, payload: RawPayload) -> Result<Vec<CanonicalJob>>;
}

/// 以 natural key (name) 去重的參照實體，例如 Company、Skill
pub trait NamedEntity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Debug + Send + Sync + 'static;
    type Draft: Clone + Send + Sync + 'static;

    const KIND: &'static str;

    fn id(&self) -> Self::Id;
    fn name(&self) -> &str;
    fn draft_name(draft: &Self::Draft) -> &str;
}

impl NamedEntity for Company {
    type Id = CompanyId;
    type Draft = CompanyDraft;

    const KIND: &'static str = "company";

    fn id(&self) -> CompanyId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn draft_name(draft: &CompanyDraft) -> &str {
        &draft.name
    }
}

impl NamedEntity for Skill {
    type Id = SkillId;
    type Draft = SkillDraft;

    const KIND: &'static str = "skill";

    fn id(&self) -> SkillId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn draft_name(draft: &SkillDraft) -> &str {
        &draft.name
    }
}

/// Bulk-read / bulk-create contract for natural-key entities.
///
/// - `find_by_names` is one round trip returning every stored entity whose name is in
///   `names`; unknown names are simply absent from the result.
/// - `insert_many` is one atomic round trip. If any draft's name already exists it
///   writes nothing and fails with `ReconciliationConflict` listing the clashing names.
#[async_trait]
pub trait EntityRepository<E: NamedEntity>: Send + Sync {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<E>>;
    async fn insert_many(&self, drafts: &[E::Draft]) -> Result<Vec<E>>;
}

/// 已存在相同 ProviderReference 時的寫入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Upsert,
    Skip,
    InsertOnly,
}

#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    pub jobs: Vec<PersistedJob>,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Saves a batch in one atomic round trip: either every job is applied or none is.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn save_batch(&self, jobs: Vec<NewJob>, mode: WriteMode) -> Result<SaveOutcome>;
}
