use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use crate::domain::currency::Currency;

/// 欄位值無法對應到 canonical model 時的原因；由 adapter 包裝成 NormalizationError
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unsupported currency `{0}`")]
    UnsupportedCurrency(String),

    #[error("salary range `{0}` does not match `<symbol><amount>[k] - <symbol><amount>[k]`")]
    MalformedSalary(String),

    #[error("salary range mixes currencies `{left}` and `{right}`")]
    MismatchedCurrency { left: String, right: String },

    #[error("salary minimum {min} exceeds maximum {max}")]
    SalaryRangeInverted { min: u64, max: u64 },

    #[error("location `{0}` must look like `<city>, <state>`")]
    MalformedLocation(String),

    #[error("unknown job type `{0}`")]
    UnknownJobType(String),

    #[error("invalid date `{0}`")]
    InvalidDate(String),

    #[error("value must not be empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderReference {
    pub provider_name: String,
    pub provider_job_id: String,
}

impl ProviderReference {
    pub fn new(provider_name: impl Into<String>, provider_job_id: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_job_id: provider_job_id.into(),
        }
    }
}

impl fmt::Display for ProviderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_name, self.provider_job_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salary {
    min: u64,
    max: u64,
    currency: Currency,
}

impl Salary {
    pub fn new(min: u64, max: u64, currency: Currency) -> Result<Self, ValueError> {
        if min > max {
            return Err(ValueError::SalaryRangeInverted { min, max });
        }
        Ok(Self { min, max, currency })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// 以 Source A 的格式輸出，例如 `$69k - $141k`；可被 1000 整除的金額使用 `k`
    pub fn to_range_string(&self) -> String {
        let symbol = self.currency.symbol();
        format!(
            "{}{} - {}{}",
            symbol,
            format_amount(self.min),
            symbol,
            format_amount(self.max)
        )
    }
}

fn format_amount(amount: u64) -> String {
    if amount != 0 && amount % 1000 == 0 {
        format!("{}k", amount / 1000)
    } else {
        amount.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Result<Self, ValueError> {
        let city = city.into().trim().to_string();
        let state = state.into().trim().to_string();
        if city.is_empty() || state.is_empty() {
            return Err(ValueError::MalformedLocation(format!("{}, {}", city, state)));
        }
        Ok(Self { city, state })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
}

impl JobType {
    pub fn from_token(token: &str) -> Result<Self, ValueError> {
        let normalized = token.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "full-time" => Ok(Self::FullTime),
            "part-time" => Ok(Self::PartTime),
            "contract" => Ok(Self::Contract),
            _ => Err(ValueError::UnknownJobType(token.to_string())),
        }
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::FullTime => "full-time",
            Self::PartTime => "part-time",
            Self::Contract => "contract",
        }
    }
}

/// 公司在 feed 中出現時附帶的屬性；name 是 natural key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDraft {
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
}

impl CompanyDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: None,
            website: None,
        }
    }

    /// Fills attributes this draft lacks from another sighting of the same company.
    pub fn absorb(&mut self, other: &CompanyDraft) {
        if self.industry.is_none() {
            self.industry = other.industry.clone();
        }
        if self.website.is_none() {
            self.website = other.website.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDraft {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalJob {
    pub title: String,
    pub provider: ProviderReference,
    pub company: CompanyDraft,
    pub skills: Vec<String>,
    pub salary: Salary,
    pub location: Location,
    pub is_remote: bool,
    pub job_type: Option<JobType>,
    pub experience_years: Option<u32>,
    pub posted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
}

/// 已解析 identity、尚未寫入的 job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub provider: ProviderReference,
    pub company_id: CompanyId,
    pub skill_ids: Vec<SkillId>,
    pub salary: Salary,
    pub location: Location,
    pub is_remote: bool,
    pub job_type: Option<JobType>,
    pub experience_years: Option<u32>,
    pub posted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedJob {
    pub id: JobId,
    pub title: String,
    pub provider: ProviderReference,
    pub company_id: CompanyId,
    pub skill_ids: Vec<SkillId>,
    pub salary: Salary,
    pub location: Location,
    pub is_remote: bool,
    pub job_type: Option<JobType>,
    pub experience_years: Option<u32>,
    pub posted_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PersistedJob {
    pub fn from_new(id: JobId, job: NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: job.title,
            provider: job.provider,
            company_id: job.company_id,
            skill_ids: job.skill_ids,
            salary: job.salary,
            location: job.location,
            is_remote: job.is_remote,
            job_type: job.job_type,
            experience_years: job.experience_years,
            posted_date: job.posted_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// 以新資料覆寫，保留 id 與 created_at
    pub fn apply_update(&mut self, job: NewJob, now: DateTime<Utc>) {
        self.title = job.title;
        self.company_id = job.company_id;
        self.skill_ids = job.skill_ids;
        self.salary = job.salary;
        self.location = job.location;
        self.is_remote = job.is_remote;
        self.job_type = job.job_type;
        self.experience_years = job.experience_years;
        self.posted_date = job.posted_date;
        self.updated_at = now;
    }
}
