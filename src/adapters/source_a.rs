use crate::adapters::{clean_skills, optional_text, required_text, string_or_number, FeedSource};
use crate::domain::model::{
    CanonicalJob, CompanyDraft, Currency, JobType, Location, ProviderReference, Salary,
    ValueError,
};
use crate::domain::ports::{ProviderAdapter, RawPayload};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Source A 的原始結構：`{ metadata, jobs: [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct ArrayFeed {
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub jobs: Vec<ArrayPosting>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayPosting {
    #[serde(deserialize_with = "string_or_number")]
    pub job_id: String,
    pub title: String,
    pub details: ArrayPostingDetails,
    pub company: ArrayPostingCompany,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub posted_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayPostingDetails {
    pub location: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub salary_range: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayPostingCompany {
    pub name: String,
    #[serde(default)]
    pub industry: Option<String>,
}

static SALARY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*([^\d\s.\-])\s*(\d+(?:\.\d+)?)\s*([kK])?\s*-\s*([^\d\s.\-])\s*(\d+(?:\.\d+)?)\s*([kK])?\s*$",
    )
    .expect("salary range pattern is valid")
});

/// 解析 `$69k - $141k` 形式的薪資範圍
pub fn parse_salary_range(raw: &str) -> std::result::Result<Salary, ValueError> {
    let caps = SALARY_RANGE
        .captures(raw)
        .ok_or_else(|| ValueError::MalformedSalary(raw.to_string()))?;

    let left = &caps[1];
    let right = &caps[4];
    if left != right {
        return Err(ValueError::MismatchedCurrency {
            left: left.to_string(),
            right: right.to_string(),
        });
    }
    let currency = Currency::from_symbol(left)?;

    let min = parse_amount(raw, &caps[2], caps.get(3).is_some())?;
    let max = parse_amount(raw, &caps[5], caps.get(6).is_some())?;

    Salary::new(min, max, currency)
}

/// 以字串位移處理 `k` 倍率；無法精確表示為整數的金額視為格式錯誤
fn parse_amount(raw: &str, digits: &str, thousands: bool) -> std::result::Result<u64, ValueError> {
    let malformed = || ValueError::MalformedSalary(raw.to_string());
    let scale = if thousands { 3 } else { 0 };

    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > scale {
        return Err(malformed());
    }

    let mut scaled = String::with_capacity(whole.len() + scale);
    scaled.push_str(whole);
    scaled.push_str(fraction);
    scaled.extend(std::iter::repeat('0').take(scale - fraction.len()));
    scaled.parse().map_err(|_| malformed())
}

/// 以第一個逗號切分 `City, State`
pub fn parse_location(raw: &str) -> std::result::Result<Location, ValueError> {
    let (city, state) = raw
        .split_once(',')
        .ok_or_else(|| ValueError::MalformedLocation(raw.to_string()))?;
    Location::new(city, state).map_err(|_| ValueError::MalformedLocation(raw.to_string()))
}

/// RFC 3339 timestamps, or a bare `YYYY-MM-DD` date taken as midnight UTC.
pub fn parse_posted_date(raw: &str) -> std::result::Result<DateTime<Utc>, ValueError> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValueError::InvalidDate(raw.to_string()))
}

/// Array-shaped feed with free-text salary, location and job type fields.
pub struct ArrayFeedAdapter {
    source: FeedSource,
}

impl ArrayFeedAdapter {
    pub fn new(source: FeedSource) -> Self {
        Self { source }
    }

    fn to_canonical(&self, index: usize, posting: ArrayPosting) -> Result<CanonicalJob> {
        let at = |field: &str| format!("jobs[{}].{}", index, field);
        let fail = |field: &str, err: ValueError| self.source.field_error(at(field), err);

        let provider_job_id =
            required_text(&posting.job_id).map_err(|e| fail("jobId", e))?;
        let title = required_text(&posting.title).map_err(|e| fail("title", e))?;
        let company_name =
            required_text(&posting.company.name).map_err(|e| fail("company.name", e))?;

        let salary = parse_salary_range(&posting.details.salary_range)
            .map_err(|e| fail("details.salaryRange", e))?;
        let location =
            parse_location(&posting.details.location).map_err(|e| fail("details.location", e))?;
        let job_type =
            JobType::from_token(&posting.details.job_type).map_err(|e| fail("details.type", e))?;
        let posted_date = posting
            .posted_date
            .as_deref()
            .map(parse_posted_date)
            .transpose()
            .map_err(|e| fail("postedDate", e))?;

        Ok(CanonicalJob {
            title,
            provider: ProviderReference::new(self.source.name(), provider_job_id),
            company: CompanyDraft {
                name: company_name,
                industry: optional_text(posting.company.industry),
                website: None,
            },
            skills: clean_skills(posting.skills),
            salary,
            location,
            is_remote: false,
            job_type: Some(job_type),
            experience_years: None,
            posted_date,
        })
    }
}

#[async_trait]
impl ProviderAdapter for ArrayFeedAdapter {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn fetch(&self) -> Result<RawPayload> {
        self.source.fetch().await
    }

    fn normalize(&self, payload: RawPayload) -> Result<Vec<CanonicalJob>> {
        let feed: ArrayFeed = serde_json::from_slice(&payload.bytes)
            .map_err(|e| IngestError::normalization(self.name(), "payload", e))?;

        feed.jobs
            .into_iter()
            .enumerate()
            .map(|(index, posting)| self.to_canonical(index, posting))
            .collect()
    }
}
