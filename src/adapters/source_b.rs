use crate::adapters::{clean_skills, optional_text, required_text, FeedSource};
use crate::domain::model::{
    CanonicalJob, CompanyDraft, Currency, Location, ProviderReference, Salary, ValueError,
};
use crate::domain::ports::{ProviderAdapter, RawPayload};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source B 的原始結構：`{ status, data: { jobsList: { <id>: {...} } } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedFeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub data: KeyedFeedData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedFeedData {
    #[serde(rename = "jobsList")]
    pub jobs_list: BTreeMap<String, KeyedPosting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedPosting {
    pub position: String,
    pub location: KeyedLocation,
    pub compensation: KeyedCompensation,
    pub employer: KeyedEmployer,
    #[serde(default)]
    pub requirements: KeyedRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedLocation {
    pub city: String,
    pub state: String,
    #[serde(default)]
    pub remote: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedCompensation {
    pub min: u64,
    pub max: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedEmployer {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyedRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

pub fn parse_compensation(raw: &KeyedCompensation) -> std::result::Result<Salary, ValueError> {
    let currency = Currency::from_code(&raw.currency)?;
    Salary::new(raw.min, raw.max, currency)
}

pub fn parse_date_posted(raw: &str) -> std::result::Result<DateTime<Utc>, ValueError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValueError::InvalidDate(raw.to_string()))
}

/// canonical -> provider 形狀；僅供 round-trip 驗證，不在正式流程中使用
pub fn to_keyed_posting(job: &CanonicalJob) -> (String, KeyedPosting) {
    let posting = KeyedPosting {
        position: job.title.clone(),
        location: KeyedLocation {
            city: job.location.city.clone(),
            state: job.location.state.clone(),
            remote: job.is_remote,
        },
        compensation: KeyedCompensation {
            min: job.salary.min(),
            max: job.salary.max(),
            currency: job.salary.currency().code().to_string(),
        },
        employer: KeyedEmployer {
            company_name: job.company.name.clone(),
            website: job.company.website.clone(),
        },
        requirements: KeyedRequirements {
            experience: job.experience_years,
            technologies: job.skills.clone(),
        },
        date_posted: job
            .posted_date
            .map(|date| date.format(DATE_FORMAT).to_string()),
    };
    (job.provider.provider_job_id.clone(), posting)
}

pub fn to_keyed_feed(jobs: &[CanonicalJob]) -> KeyedFeed {
    KeyedFeed {
        status: Some("success".to_string()),
        data: KeyedFeedData {
            jobs_list: jobs.iter().map(to_keyed_posting).collect(),
        },
    }
}

/// Map-shaped feed keyed by opaque ids, with already-typed nested fields.
pub struct KeyedFeedAdapter {
    source: FeedSource,
}

impl KeyedFeedAdapter {
    pub fn new(source: FeedSource) -> Self {
        Self { source }
    }

    fn to_canonical(&self, id: String, posting: KeyedPosting) -> Result<CanonicalJob> {
        let id = required_text(&id).map_err(|e| self.source.field_error("data.jobsList", e))?;
        let at = |field: &str| format!("data.jobsList.{}.{}", id, field);
        let fail = |field: &str, err: ValueError| self.source.field_error(at(field), err);

        let title = required_text(&posting.position).map_err(|e| fail("position", e))?;
        let company_name = required_text(&posting.employer.company_name)
            .map_err(|e| fail("employer.companyName", e))?;
        let salary =
            parse_compensation(&posting.compensation).map_err(|e| fail("compensation", e))?;
        let location = Location::new(posting.location.city, posting.location.state)
            .map_err(|e| fail("location", e))?;
        let posted_date = posting
            .date_posted
            .as_deref()
            .map(parse_date_posted)
            .transpose()
            .map_err(|e| fail("datePosted", e))?;

        Ok(CanonicalJob {
            title,
            provider: ProviderReference::new(self.source.name(), id.clone()),
            company: CompanyDraft {
                name: company_name,
                industry: None,
                website: optional_text(posting.employer.website),
            },
            skills: clean_skills(posting.requirements.technologies),
            salary,
            location,
            is_remote: posting.location.remote,
            job_type: None,
            experience_years: posting.requirements.experience,
            posted_date,
        })
    }
}

#[async_trait]
impl ProviderAdapter for KeyedFeedAdapter {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn fetch(&self) -> Result<RawPayload> {
        self.source.fetch().await
    }

    fn normalize(&self, payload: RawPayload) -> Result<Vec<CanonicalJob>> {
        let feed: KeyedFeed = serde_json::from_slice(&payload.bytes)
            .map_err(|e| IngestError::normalization(self.name(), "payload", e))?;

        if let Some(status) = feed.status.as_deref() {
            if !status.eq_ignore_ascii_case("success") {
                return Err(IngestError::normalization(
                    self.name(),
                    "status",
                    format!("provider reported status `{}`", status),
                ));
            }
        }

        feed.data
            .jobs_list
            .into_iter()
            .map(|(id, posting)| self.to_canonical(id, posting))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FetchRequest, Transport};
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn fetch(&self, request: &FetchRequest) -> Result<RawPayload> {
            Err(IngestError::transport(&request.endpoint, "offline"))
        }
    }

    fn adapter() -> KeyedFeedAdapter {
        KeyedFeedAdapter::new(FeedSource::new(
            "provider_b",
            FetchRequest::default(),
            Arc::new(NoTransport),
        ))
    }

    fn sample_feed() -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "data": {
                "jobsList": {
                    "job-9f2": {
                        "position": "Data Engineer",
                        "location": { "city": "Boston", "state": "MA", "remote": true },
                        "compensation": { "min": 120000, "max": 150000, "currency": "USD" },
                        "employer": { "companyName": "Initech", "website": "https://initech.example" },
                        "requirements": { "experience": 4, "technologies": ["Python", "Spark"] },
                        "datePosted": "2024-02-20"
                    },
                    "job-a01": {
                        "position": "Platform Engineer",
                        "location": { "city": "Berlin", "state": "BE", "remote": false },
                        "compensation": { "min": 70000, "max": 90000, "currency": "EUR" },
                        "employer": { "companyName": "Acme" },
                        "requirements": { "technologies": ["Rust"] }
                    }
                }
            }
        })
    }

    #[test]
    fn test_normalize_passes_typed_fields_through() {
        let jobs = adapter()
            .normalize(RawPayload::new(sample_feed().to_string()))
            .unwrap();

        assert_eq!(jobs.len(), 2);
        let job = jobs
            .iter()
            .find(|j| j.provider.provider_job_id == "job-9f2")
            .unwrap();
        assert_eq!(job.provider.provider_name, "provider_b");
        assert_eq!(job.title, "Data Engineer");
        assert!(job.is_remote);
        assert_eq!(job.experience_years, Some(4));
        assert_eq!(job.skills, vec!["Python".to_string(), "Spark".to_string()]);
        assert_eq!(job.salary.currency(), Currency::Usd);
        assert_eq!(job.company.website.as_deref(), Some("https://initech.example"));
        assert!(job.job_type.is_none());
        assert_eq!(
            job.posted_date.unwrap().to_rfc3339(),
            "2024-02-20T00:00:00+00:00"
        );
    }

    #[test]
    fn test_normalize_rejects_inverted_compensation() {
        let mut feed = sample_feed();
        feed["data"]["jobsList"]["job-a01"]["compensation"]["min"] = serde_json::json!(95000);

        let err = adapter()
            .normalize(RawPayload::new(feed.to_string()))
            .unwrap_err();
        match err {
            IngestError::NormalizationError { field, reason, .. } => {
                assert_eq!(field, "data.jobsList.job-a01.compensation");
                assert!(reason.contains("exceeds"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_rejects_unknown_currency_code() {
        let mut feed = sample_feed();
        feed["data"]["jobsList"]["job-9f2"]["compensation"]["currency"] = serde_json::json!("XYZ");

        let err = adapter()
            .normalize(RawPayload::new(feed.to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported currency `XYZ`"));
    }

    #[test]
    fn test_normalize_rejects_failed_status() {
        let mut feed = sample_feed();
        feed["status"] = serde_json::json!("error");

        let err = adapter()
            .normalize(RawPayload::new(feed.to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::NormalizationError { ref field, .. } if field == "status"
        ));
    }

    #[test]
    fn test_normalize_rejects_blank_job_key() {
        let mut feed = sample_feed();
        let posting = feed["data"]["jobsList"]["job-a01"].clone();
        feed["data"]["jobsList"][" "] = posting;

        let err = adapter()
            .normalize(RawPayload::new(feed.to_string()))
            .unwrap_err();
        match err {
            IngestError::NormalizationError { field, .. } => assert_eq!(field, "data.jobsList"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reverse_mapping_round_trips() {
        let adapter = adapter();
        let jobs = adapter
            .normalize(RawPayload::new(sample_feed().to_string()))
            .unwrap();

        let feed = to_keyed_feed(&jobs);
        let reparsed = adapter
            .normalize(RawPayload::new(serde_json::to_vec(&feed).unwrap()))
            .unwrap();

        assert_eq!(reparsed, jobs);
    }

    #[test]
    fn test_parse_date_posted() {
        assert!(parse_date_posted("2024-02-20").is_ok());
        assert!(parse_date_posted("20/02/2024").is_err());
    }
}
