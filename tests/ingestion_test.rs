use httpmock::prelude::*;
use job_ingest::domain::ports::ProviderAdapter;
use job_ingest::utils::error::ErrorCategory;
use job_ingest::{
    FileStore, HttpTransport, IngestConfig, IngestError, IngestionEngine, JobType, LocalStorage,
    MemoryStore, ProviderReference, ReingestPolicy,
};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn array_feed(title: &str) -> serde_json::Value {
    serde_json::json!({
        "metadata": { "requestId": "req-1" },
        "jobs": [
            {
                "jobId": "P1-101",
                "title": title,
                "details": {
                    "location": "San Francisco, CA",
                    "type": "Full-Time",
                    "salaryRange": "$69k - $141k"
                },
                "company": { "name": "Acme", "industry": "Robotics" },
                "skills": ["Rust", "PostgreSQL"],
                "postedDate": "2024-03-01T09:30:00Z"
            },
            {
                "jobId": "P1-102",
                "title": "Data Analyst",
                "details": {
                    "location": "Austin, TX",
                    "type": "Contract",
                    "salaryRange": "$50k - $60k"
                },
                "company": { "name": "Globex" },
                "skills": ["SQL", "Python"]
            }
        ]
    })
}

fn keyed_feed() -> serde_json::Value {
    serde_json::json!({
        "status": "success",
        "data": {
            "jobsList": {
                "job-9f2": {
                    "position": "Data Engineer",
                    "location": { "city": "Boston", "state": "MA", "remote": true },
                    "compensation": { "min": 120000, "max": 150000, "currency": "USD" },
                    "employer": { "companyName": "Acme", "website": "https://acme.example" },
                    "requirements": { "experience": 4, "technologies": ["Python", "Spark"] },
                    "datePosted": "2024-02-20"
                }
            }
        }
    })
}

fn config_for(array_url: &str, keyed_url: &str, policy: &str) -> IngestConfig {
    IngestConfig::from_toml_str(&format!(
        r#"
[ingest]
name = "integration"
reingest_policy = "{policy}"

[[providers]]
name = "provider_a"
kind = "array_feed"
endpoint = "{array_url}"
timeout_seconds = 5

[[providers]]
name = "provider_b"
kind = "keyed_feed"
endpoint = "{keyed_url}"
timeout_seconds = 5
"#
    ))
    .unwrap()
}

fn engine(config: &IngestConfig, store: &Arc<MemoryStore>) -> IngestionEngine {
    IngestionEngine::from_config(config, Arc::new(HttpTransport::new()), store.clone()).unwrap()
}

#[tokio::test]
async fn test_end_to_end_ingestion_from_both_providers() {
    let server = MockServer::start();
    let array_mock = server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(array_feed("Backend Engineer"));
    });
    let keyed_mock = server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    assert!(config.validate_config().is_ok());

    let store = Arc::new(MemoryStore::new());
    let report = engine(&config, &store).run().await.unwrap();

    array_mock.assert();
    keyed_mock.assert();

    assert_eq!(report.fetched, 3);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.jobs.len(), 3);
    // Acme 出現在兩個 provider，只建立一次
    assert_eq!(report.companies_created, 2);
    assert_eq!(store.companies().await.len(), 2);

    let skill_names: HashSet<String> = store.skills().await.into_iter().map(|s| s.name).collect();
    assert_eq!(skill_names.len(), 5);
    assert!(skill_names.contains("Python"));

    let acme = store
        .companies()
        .await
        .into_iter()
        .find(|c| c.name == "Acme")
        .unwrap();
    assert_eq!(acme.industry.as_deref(), Some("Robotics"));
    assert_eq!(acme.website.as_deref(), Some("https://acme.example"));

    let backend = store
        .job_by_reference(&ProviderReference::new("provider_a", "P1-101"))
        .await
        .unwrap();
    assert_eq!(backend.company_id, acme.id);
    assert_eq!(backend.salary.to_range_string(), "$69k - $141k");
    assert_eq!(backend.job_type, Some(JobType::FullTime));

    let remote = store
        .job_by_reference(&ProviderReference::new("provider_b", "job-9f2"))
        .await
        .unwrap();
    assert!(remote.is_remote);
    assert_eq!(remote.company_id, acme.id);
    assert_eq!(remote.experience_years, Some(4));
}

#[tokio::test]
async fn test_empty_feeds_persist_nothing() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(serde_json::json!({ "jobs": [] }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200)
            .json_body(serde_json::json!({ "status": "success", "data": { "jobsList": {} } }));
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    let store = Arc::new(MemoryStore::new());
    let jobs = engine(&config, &store).load().await.unwrap();

    assert!(jobs.is_empty());
    assert!(store.companies().await.is_empty());
    assert!(store.skills().await.is_empty());
    assert!(store.jobs().await.is_empty());
}

#[tokio::test]
async fn test_failing_provider_aborts_the_whole_run() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    let failing = server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(500).body("internal error");
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    let store = Arc::new(MemoryStore::new());
    let err = engine(&config, &store).run().await.unwrap_err();

    failing.assert();
    assert!(matches!(err, IngestError::TransportError { .. }));
    assert_eq!(err.category(), ErrorCategory::Transport);
    assert!(store.jobs().await.is_empty());
    assert!(store.companies().await.is_empty());
}

#[tokio::test]
async fn test_malformed_posting_aborts_the_whole_run() {
    let server = MockServer::start();
    let mut feed = array_feed("Backend Engineer");
    feed["jobs"][1]["details"]["salaryRange"] = serde_json::json!("negotiable");
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(feed);
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    let store = Arc::new(MemoryStore::new());
    let err = engine(&config, &store).run().await.unwrap_err();

    match err {
        IngestError::NormalizationError { provider, field, .. } => {
            assert_eq!(provider, "provider_a");
            assert_eq!(field, "jobs[1].details.salaryRange");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.jobs().await.is_empty());
}

#[tokio::test]
async fn test_reingestion_upserts_in_place() {
    let first = MockServer::start();
    first.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    first.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let second = MockServer::start();
    second.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Senior Backend Engineer"));
    });
    second.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let store = Arc::new(MemoryStore::new());
    let reference = ProviderReference::new("provider_a", "P1-101");

    let config = config_for(&first.url("/a/jobs"), &first.url("/b/jobs"), "upsert");
    engine(&config, &store).run().await.unwrap();
    let before = store.job_by_reference(&reference).await.unwrap();

    let config = config_for(&second.url("/a/jobs"), &second.url("/b/jobs"), "upsert");
    let report = engine(&config, &store).run().await.unwrap();
    let after = store.job_by_reference(&reference).await.unwrap();

    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 3);
    assert_eq!(report.companies_created, 0);
    assert_eq!(store.jobs().await.len(), 3);
    assert_eq!(after.id, before.id);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.title, "Senior Backend Engineer");
}

#[tokio::test]
async fn test_reingestion_rejected_under_reject_policy() {
    let server = MockServer::start();
    let array_mock = server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "reject");
    assert_eq!(config.reingest_policy(), ReingestPolicy::Reject);

    let store = Arc::new(MemoryStore::new());
    engine(&config, &store).run().await.unwrap();
    let err = engine(&config, &store).run().await.unwrap_err();

    array_mock.assert_hits(2);
    assert!(matches!(err, IngestError::PersistenceError { .. }));
    assert_eq!(store.jobs().await.len(), 3);
}

#[tokio::test]
async fn test_overlapping_runs_do_not_duplicate_companies_or_skills() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    let store = Arc::new(MemoryStore::new());
    let left = engine(&config, &store);
    let right = engine(&config, &store);

    let (a, b) = tokio::join!(left.run(), right.run());
    a.unwrap();
    b.unwrap();

    let companies: Vec<String> = store.companies().await.into_iter().map(|c| c.name).collect();
    let unique: HashSet<&String> = companies.iter().collect();
    assert_eq!(companies.len(), unique.len());
    assert_eq!(companies.len(), 2);

    let skills = store.skills().await;
    assert_eq!(skills.len(), 5);
    assert_eq!(store.jobs().await.len(), 3);
}

#[tokio::test]
async fn test_disabled_provider_is_not_contacted() {
    let server = MockServer::start();
    let array_mock = server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    let keyed_mock = server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let mut config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "upsert");
    config.providers[1].enabled = Some(false);

    let adapters = config.build_adapters(Arc::new(HttpTransport::new()));
    assert_eq!(adapters.len(), 1);
    assert_eq!(adapters[0].name(), "provider_a");

    let store = Arc::new(MemoryStore::new());
    let report = engine(&config, &store).run().await.unwrap();

    array_mock.assert();
    keyed_mock.assert_hits(0);
    assert_eq!(report.providers, vec!["provider_a".to_string()]);
    assert_eq!(report.jobs.len(), 2);
}

#[tokio::test]
async fn test_report_written_to_output_directory() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "skip");
    let store = Arc::new(MemoryStore::new());
    let report = engine(&config, &store).run().await.unwrap();

    let storage = LocalStorage::new(temp_dir.path());
    let written = storage.write_json("reports/run.json", &report).await.unwrap();
    assert!(written.exists());

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(written).unwrap()).unwrap();
    assert_eq!(content["policy"], "skip");
    assert_eq!(content["inserted"], 3);
    assert_eq!(content["jobs"].as_array().unwrap().len(), 3);
}

fn file_store_engine(config: &IngestConfig, dir: &TempDir) -> IngestionEngine {
    let store = Arc::new(FileStore::new(LocalStorage::new(dir.path()), "jobs.json"));
    IngestionEngine::from_config(config, Arc::new(HttpTransport::new()), store).unwrap()
}

#[tokio::test]
async fn test_file_store_rejects_reingestion_across_store_instances() {
    let data_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let config = config_for(&server.url("/a/jobs"), &server.url("/b/jobs"), "reject");

    let first = file_store_engine(&config, &data_dir).run().await.unwrap();
    assert_eq!(first.inserted, 3);

    let err = file_store_engine(&config, &data_dir).run().await.unwrap_err();
    assert!(matches!(err, IngestError::PersistenceError { .. }));

    let store = FileStore::new(LocalStorage::new(data_dir.path()), "jobs.json");
    assert_eq!(store.jobs().await.unwrap().len(), 3);
    assert_eq!(store.companies().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_file_store_upsert_keeps_ids_across_store_instances() {
    let data_dir = TempDir::new().unwrap();
    let first = MockServer::start();
    first.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Backend Engineer"));
    });
    first.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });
    let second = MockServer::start();
    second.mock(|when, then| {
        when.method(GET).path("/a/jobs");
        then.status(200).json_body(array_feed("Senior Backend Engineer"));
    });
    second.mock(|when, then| {
        when.method(GET).path("/b/jobs");
        then.status(200).json_body(keyed_feed());
    });

    let reference = ProviderReference::new("provider_a", "P1-101");
    let config = config_for(&first.url("/a/jobs"), &first.url("/b/jobs"), "upsert");
    let initial = file_store_engine(&config, &data_dir).load().await.unwrap();
    let before = initial.iter().find(|j| j.provider == reference).unwrap().clone();

    let config = config_for(&second.url("/a/jobs"), &second.url("/b/jobs"), "upsert");
    let report = file_store_engine(&config, &data_dir).run().await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.updated, 3);
    assert_eq!(report.companies_created, 0);
    assert_eq!(report.skills_created, 0);

    let store = FileStore::new(LocalStorage::new(data_dir.path()), "jobs.json");
    let after = store.job_by_reference(&reference).await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.title, "Senior Backend Engineer");
    assert_eq!(store.jobs().await.unwrap().len(), 3);
}
