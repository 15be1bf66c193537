use crate::domain::model::{CanonicalJob, Company, CompanyDraft, CompanyId, Skill, SkillDraft, SkillId};
use crate::domain::ports::{EntityRepository, NamedEntity};
use crate::utils::error::{IngestError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// 同一批次中 conflict 重試的上限
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// name -> identity 對照表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMap<Id> {
    entries: HashMap<String, Id>,
}

impl<Id: Copy> NameMap<Id> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, id: Id) {
        self.entries.insert(name.into(), id);
    }

    pub fn get(&self, name: &str) -> Option<Id> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Id)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

impl<Id: Copy> Default for NameMap<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Resolution<Id> {
    pub map: NameMap<Id>,
    pub created: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences {
    pub companies: NameMap<CompanyId>,
    pub skills: NameMap<SkillId>,
    pub companies_created: usize,
    pub skills_created: usize,
}

/// Resolves the batch's company and skill names to stored identities with one bulk
/// read and at most one bulk create per entity kind (plus re-reads on conflict).
pub struct EntityReconciler {
    companies: Arc<dyn EntityRepository<Company>>,
    skills: Arc<dyn EntityRepository<Skill>>,
}

impl EntityReconciler {
    pub fn new(
        companies: Arc<dyn EntityRepository<Company>>,
        skills: Arc<dyn EntityRepository<Skill>>,
    ) -> Self {
        Self { companies, skills }
    }

    pub async fn reconcile(&self, jobs: &[CanonicalJob]) -> Result<ResolvedReferences> {
        let companies = resolve(self.companies.as_ref(), company_drafts(jobs)).await?;
        let skills = resolve(self.skills.as_ref(), skill_drafts(jobs)).await?;

        tracing::info!(
            "🔗 Resolved {} companies ({} new) and {} skills ({} new)",
            companies.map.len(),
            companies.created,
            skills.map.len(),
            skills.created
        );

        Ok(ResolvedReferences {
            companies: companies.map,
            skills: skills.map,
            companies_created: companies.created,
            skills_created: skills.created,
        })
    }
}

/// 每個公司名稱一筆 draft；同名的後續出現只補齊缺少的屬性
pub fn company_drafts(jobs: &[CanonicalJob]) -> Vec<CompanyDraft> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut drafts: Vec<CompanyDraft> = Vec::new();
    for job in jobs {
        match index.get(job.company.name.as_str()) {
            Some(&i) => drafts[i].absorb(&job.company),
            None => {
                index.insert(job.company.name.as_str(), drafts.len());
                drafts.push(job.company.clone());
            }
        }
    }
    drafts
}

pub fn skill_drafts(jobs: &[CanonicalJob]) -> Vec<SkillDraft> {
    let mut seen = std::collections::HashSet::new();
    jobs.iter()
        .flat_map(|job| job.skills.iter())
        .filter(|name| seen.insert(name.as_str()))
        .map(|name| SkillDraft { name: name.clone() })
        .collect()
}

/// 1. bulk read  2. bulk create missing  3. conflict 時重讀並採用既有 identity
pub async fn resolve<E: NamedEntity>(
    repo: &dyn EntityRepository<E>,
    drafts: Vec<E::Draft>,
) -> Result<Resolution<E::Id>> {
    let mut map = NameMap::new();
    if drafts.is_empty() {
        return Ok(Resolution { map, created: 0 });
    }

    let names: Vec<String> = drafts
        .iter()
        .map(|d| E::draft_name(d).to_string())
        .collect();

    let existing = repo
        .find_by_names(&names)
        .await
        .map_err(|e| e.into_persistence("failed to read existing entities"))?;
    for entity in existing {
        map.insert(entity.name(), entity.id());
    }

    let mut pending: Vec<E::Draft> = drafts
        .into_iter()
        .filter(|d| !map.contains(E::draft_name(d)))
        .collect();

    let mut created = 0;
    let mut attempts = 0;
    while !pending.is_empty() {
        match repo.insert_many(&pending).await {
            Ok(rows) => {
                created += rows.len();
                for entity in rows {
                    map.insert(entity.name(), entity.id());
                }
                break;
            }
            Err(IngestError::ReconciliationConflict { names, .. })
                if attempts < MAX_CONFLICT_RETRIES =>
            {
                attempts += 1;
                tracing::warn!(
                    "⚠️ {} names created concurrently by another run, adopting existing: {:?}",
                    E::KIND,
                    names
                );
                let winners = repo
                    .find_by_names(&names)
                    .await
                    .map_err(|e| e.into_persistence("failed to re-read conflicting entities"))?;
                for entity in winners {
                    map.insert(entity.name(), entity.id());
                }
                pending.retain(|d| !map.contains(E::draft_name(d)));
            }
            Err(IngestError::ReconciliationConflict { names, .. }) => {
                return Err(IngestError::persistence(format!(
                    "could not reconcile {} names {:?} after {} retries",
                    E::KIND,
                    names,
                    MAX_CONFLICT_RETRIES
                )));
            }
            Err(e) => return Err(e.into_persistence("failed to create entities")),
        }
    }

    Ok(Resolution { map, created })
}
