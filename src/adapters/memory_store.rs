use crate::domain::model::{
    Company, CompanyDraft, CompanyId, JobId, NewJob, PersistedJob, ProviderReference, Skill,
    SkillDraft, SkillId,
};
use crate::domain::ports::{EntityRepository, JobRepository, SaveOutcome, WriteMode};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// 每個 repository 呼叫計數，用於驗證 round trip 數量
#[derive(Debug, Default)]
pub struct StoreStats {
    pub company_reads: AtomicUsize,
    pub company_writes: AtomicUsize,
    pub skill_reads: AtomicUsize,
    pub skill_writes: AtomicUsize,
    pub job_writes: AtomicUsize,
}

#[derive(Debug, Default)]
struct State {
    companies: BTreeMap<CompanyId, Company>,
    company_names: HashMap<String, CompanyId>,
    skills: BTreeMap<SkillId, Skill>,
    skill_names: HashMap<String, SkillId>,
    jobs: BTreeMap<JobId, PersistedJob>,
    job_refs: HashMap<ProviderReference, JobId>,
    next_id: u64,
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut state = State {
            next_id: snapshot.next_id,
            ..State::default()
        };
        for company in snapshot.companies {
            state.next_id = state.next_id.max(company.id.0);
            state.company_names.insert(company.name.clone(), company.id);
            state.companies.insert(company.id, company);
        }
        for skill in snapshot.skills {
            state.next_id = state.next_id.max(skill.id.0);
            state.skill_names.insert(skill.name.clone(), skill.id);
            state.skills.insert(skill.id, skill);
        }
        for job in snapshot.jobs {
            state.next_id = state.next_id.max(job.id.0);
            state.job_refs.insert(job.provider.clone(), job.id);
            state.jobs.insert(job.id, job);
        }
        state
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            next_id: self.next_id,
            companies: self.companies.values().cloned().collect(),
            skills: self.skills.values().cloned().collect(),
            jobs: self.jobs.values().cloned().collect(),
        }
    }
}

/// 可序列化的 store 內容；name 與 reference 索引在載入時重建
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_id: u64,
    pub companies: Vec<Company>,
    pub skills: Vec<Skill>,
    pub jobs: Vec<PersistedJob>,
}

/// In-process job store. Every trait call takes the lock once, so each call behaves
/// like a single database transaction with unique constraints on company name,
/// skill name and provider reference.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(State::from_snapshot(snapshot)),
            stats: StoreStats::default(),
        }
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.snapshot()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.state.read().await.companies.values().cloned().collect()
    }

    pub async fn skills(&self) -> Vec<Skill> {
        self.state.read().await.skills.values().cloned().collect()
    }

    pub async fn jobs(&self) -> Vec<PersistedJob> {
        self.state.read().await.jobs.values().cloned().collect()
    }

    pub async fn job_by_reference(&self, reference: &ProviderReference) -> Option<PersistedJob> {
        let state = self.state.read().await;
        state
            .job_refs
            .get(reference)
            .and_then(|id| state.jobs.get(id))
            .cloned()
    }
}

fn conflicting_names<'a>(
    names: impl Iterator<Item = &'a str>,
    existing: &HashMap<String, impl Copy>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut conflicts = Vec::new();
    for name in names {
        // 同一批次內重複的 name 也違反 unique constraint
        if existing.contains_key(name) || !seen.insert(name) {
            conflicts.push(name.to_string());
        }
    }
    conflicts
}

#[async_trait]
impl EntityRepository<Company> for MemoryStore {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Company>> {
        self.stats.company_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(names
            .iter()
            .filter_map(|name| state.company_names.get(name))
            .filter_map(|id| state.companies.get(id))
            .cloned()
            .collect())
    }

    async fn insert_many(&self, drafts: &[CompanyDraft]) -> Result<Vec<Company>> {
        self.stats.company_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;

        let conflicts = conflicting_names(drafts.iter().map(|d| d.name.as_str()), &state.company_names);
        if !conflicts.is_empty() {
            return Err(IngestError::ReconciliationConflict {
                kind: "company",
                names: conflicts,
            });
        }

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let company = Company {
                id: CompanyId(state.allocate_id()),
                name: draft.name.clone(),
                industry: draft.industry.clone(),
                website: draft.website.clone(),
            };
            state.company_names.insert(company.name.clone(), company.id);
            state.companies.insert(company.id, company.clone());
            created.push(company);
        }
        Ok(created)
    }
}

#[async_trait]
impl EntityRepository<Skill> for MemoryStore {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Skill>> {
        self.stats.skill_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(names
            .iter()
            .filter_map(|name| state.skill_names.get(name))
            .filter_map(|id| state.skills.get(id))
            .cloned()
            .collect())
    }

    async fn insert_many(&self, drafts: &[SkillDraft]) -> Result<Vec<Skill>> {
        self.stats.skill_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;

        let conflicts = conflicting_names(drafts.iter().map(|d| d.name.as_str()), &state.skill_names);
        if !conflicts.is_empty() {
            return Err(IngestError::ReconciliationConflict {
                kind: "skill",
                names: conflicts,
            });
        }

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let skill = Skill {
                id: SkillId(state.allocate_id()),
                name: draft.name.clone(),
            };
            state.skill_names.insert(skill.name.clone(), skill.id);
            state.skills.insert(skill.id, skill.clone());
            created.push(skill);
        }
        Ok(created)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn save_batch(&self, jobs: Vec<NewJob>, mode: WriteMode) -> Result<SaveOutcome> {
        self.stats.job_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;

        // 先完整檢查整批，確保失敗時不寫入任何資料
        let mut batch_refs = HashSet::new();
        for job in &jobs {
            if !state.companies.contains_key(&job.company_id) {
                return Err(IngestError::StorageError {
                    message: format!("company {:?} does not exist", job.company_id),
                });
            }
            if let Some(missing) = job.skill_ids.iter().find(|id| !state.skills.contains_key(id)) {
                return Err(IngestError::StorageError {
                    message: format!("skill {:?} does not exist", missing),
                });
            }
            let duplicate_in_batch = !batch_refs.insert(&job.provider);
            let duplicate_in_store = state.job_refs.contains_key(&job.provider);
            if mode == WriteMode::InsertOnly && (duplicate_in_batch || duplicate_in_store) {
                return Err(IngestError::UniqueViolation {
                    constraint: "jobs_provider_reference_key".to_string(),
                    key: job.provider.to_string(),
                });
            }
        }

        let now = Utc::now();
        let mut outcome = SaveOutcome::default();
        for job in jobs {
            match state.job_refs.get(&job.provider).copied() {
                Some(id) if mode == WriteMode::Skip => {
                    if let Some(existing) = state.jobs.get(&id) {
                        outcome.jobs.push(existing.clone());
                    }
                    outcome.skipped += 1;
                }
                Some(id) => {
                    if let Some(existing) = state.jobs.get_mut(&id) {
                        existing.apply_update(job, now);
                        outcome.jobs.push(existing.clone());
                    }
                    outcome.updated += 1;
                }
                None => {
                    let id = JobId(state.allocate_id());
                    let persisted = PersistedJob::from_new(id, job, now);
                    state.job_refs.insert(persisted.provider.clone(), id);
                    state.jobs.insert(id, persisted.clone());
                    outcome.jobs.push(persisted);
                    outcome.inserted += 1;
                }
            }
        }

        Ok(outcome)
    }
}
