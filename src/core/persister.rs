use crate::core::reconciler::ResolvedReferences;
use crate::domain::model::{CanonicalJob, NewJob, ProviderReference};
use crate::domain::ports::{JobRepository, SaveOutcome, WriteMode};
use crate::utils::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 再次收到相同 ProviderReference 時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReingestPolicy {
    /// 更新既有資料，保留 id
    #[default]
    Upsert,
    /// 保留既有資料不變
    Skip,
    /// 視為錯誤，整批失敗
    Reject,
}

impl ReingestPolicy {
    pub fn write_mode(&self) -> WriteMode {
        match self {
            Self::Upsert => WriteMode::Upsert,
            Self::Skip => WriteMode::Skip,
            Self::Reject => WriteMode::InsertOnly,
        }
    }
}

impl std::str::FromStr for ReingestPolicy {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(Self::Upsert),
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(IngestError::InvalidConfigValueError {
                field: "ingest.reingest_policy".to_string(),
                value: other.to_string(),
                reason: "Expected one of: upsert, skip, reject".to_string(),
            }),
        }
    }
}

pub struct JobPersister {
    repo: Arc<dyn JobRepository>,
    policy: ReingestPolicy,
}

impl JobPersister {
    pub fn new(repo: Arc<dyn JobRepository>, policy: ReingestPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> ReingestPolicy {
        self.policy
    }

    /// Rewrites names to resolved identities and saves the batch in one storage call.
    pub async fn persist(
        &self,
        jobs: Vec<CanonicalJob>,
        refs: &ResolvedReferences,
    ) -> Result<SaveOutcome> {
        let jobs = self.collapse_duplicates(jobs)?;
        if jobs.is_empty() {
            return Ok(SaveOutcome::default());
        }

        let batch = jobs
            .into_iter()
            .map(|job| resolve_job(job, refs))
            .collect::<Result<Vec<_>>>()?;

        let outcome = self
            .repo
            .save_batch(batch, self.policy.write_mode())
            .await
            .map_err(|e| match e {
                IngestError::UniqueViolation { key, .. } => {
                    IngestError::persistence(format!("job {} was already ingested", key))
                }
                other => other.into_persistence("failed to save job batch"),
            })?;

        tracing::info!(
            "💾 Persisted {} jobs (inserted: {}, updated: {}, skipped: {})",
            outcome.jobs.len(),
            outcome.inserted,
            outcome.updated,
            outcome.skipped
        );
        Ok(outcome)
    }

    /// 同一批次內重複的 reference：upsert 取最後一筆，skip 取第一筆，reject 直接失敗
    fn collapse_duplicates(&self, jobs: Vec<CanonicalJob>) -> Result<Vec<CanonicalJob>> {
        let mut positions: HashMap<ProviderReference, usize> = HashMap::new();
        let mut unique: Vec<CanonicalJob> = Vec::with_capacity(jobs.len());

        for job in jobs {
            match positions.get(&job.provider) {
                None => {
                    positions.insert(job.provider.clone(), unique.len());
                    unique.push(job);
                }
                Some(&i) => match self.policy {
                    ReingestPolicy::Upsert => {
                        tracing::warn!("⚠️ {} appears twice in the batch, keeping the last", job.provider);
                        unique[i] = job;
                    }
                    ReingestPolicy::Skip => {
                        tracing::warn!("⚠️ {} appears twice in the batch, keeping the first", job.provider);
                    }
                    ReingestPolicy::Reject => {
                        return Err(IngestError::persistence(format!(
                            "job {} appears more than once in the batch",
                            job.provider
                        )));
                    }
                },
            }
        }

        Ok(unique)
    }
}

fn resolve_job(job: CanonicalJob, refs: &ResolvedReferences) -> Result<NewJob> {
    let company_id = refs.companies.get(&job.company.name).ok_or_else(|| {
        IngestError::persistence(format!(
            "company `{}` for job {} was not resolved",
            job.company.name, job.provider
        ))
    })?;

    let skill_ids = job
        .skills
        .iter()
        .map(|name| {
            refs.skills.get(name).ok_or_else(|| {
                IngestError::persistence(format!(
                    "skill `{}` for job {} was not resolved",
                    name, job.provider
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NewJob {
        title: job.title,
        provider: job.provider,
        company_id,
        skill_ids,
        salary: job.salary,
        location: job.location,
        is_remote: job.is_remote,
        job_type: job.job_type,
        experience_years: job.experience_years,
        posted_date: job.posted_date,
    })
}
