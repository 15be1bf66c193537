use crate::config::IngestConfig;
use crate::core::aggregator::AggregationCoordinator;
use crate::core::persister::{JobPersister, ReingestPolicy};
use crate::core::reconciler::EntityReconciler;
use crate::domain::model::{Company, PersistedJob, Skill};
use crate::domain::ports::{EntityRepository, JobRepository, ProviderAdapter, Transport};
use crate::utils::error::Result;
use crate::utils::monitor::{PhaseTiming, RunMonitor};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// 單次 ingestion 的結果摘要
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub policy: ReingestPolicy,
    pub providers: Vec<String>,
    pub fetched: usize,
    pub companies_created: usize,
    pub skills_created: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub phases: Vec<PhaseTiming>,
    pub jobs: Vec<PersistedJob>,
}

/// Fetch -> reconcile -> persist. Each call is one all-or-nothing ingestion run.
pub struct IngestionEngine {
    coordinator: AggregationCoordinator,
    reconciler: EntityReconciler,
    persister: JobPersister,
    monitor_enabled: bool,
}

impl IngestionEngine {
    pub fn new(
        coordinator: AggregationCoordinator,
        reconciler: EntityReconciler,
        persister: JobPersister,
    ) -> Self {
        Self {
            coordinator,
            reconciler,
            persister,
            monitor_enabled: false,
        }
    }

    /// 以同一個 store 同時提供 company、skill 與 job 的存取
    pub fn with_store<S>(
        adapters: Vec<Box<dyn ProviderAdapter>>,
        store: Arc<S>,
        policy: ReingestPolicy,
    ) -> Result<Self>
    where
        S: EntityRepository<Company> + EntityRepository<Skill> + JobRepository + 'static,
    {
        let coordinator = AggregationCoordinator::new(adapters)?;
        let reconciler = EntityReconciler::new(store.clone(), store.clone());
        let persister = JobPersister::new(store, policy);
        Ok(Self::new(coordinator, reconciler, persister))
    }

    /// 依照 TOML 配置建立引擎
    pub fn from_config<S>(
        config: &IngestConfig,
        transport: Arc<dyn Transport>,
        store: Arc<S>,
    ) -> Result<Self>
    where
        S: EntityRepository<Company> + EntityRepository<Skill> + JobRepository + 'static,
    {
        let adapters = config.build_adapters(transport);
        Ok(Self::with_store(adapters, store, config.reingest_policy())?
            .with_concurrent_fetch(config.ingest.concurrent_fetch)
            .with_monitoring(config.monitoring_enabled()))
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }

    pub fn with_concurrent_fetch(mut self, concurrent: bool) -> Self {
        self.coordinator = self.coordinator.with_concurrency(concurrent);
        self
    }

    /// Runs one ingestion and returns the persisted jobs.
    pub async fn load(&self) -> Result<Vec<PersistedJob>> {
        Ok(self.run().await?.jobs)
    }

    pub async fn run(&self) -> Result<IngestReport> {
        let started_at = Utc::now();
        let monitor = RunMonitor::new(self.monitor_enabled);
        tracing::info!(
            "🚀 Starting ingestion from {} providers (policy: {:?})",
            self.coordinator.provider_names().len(),
            self.persister.policy()
        );

        let phase = Instant::now();
        let jobs = self.coordinator.collect().await?;
        monitor.record("fetch", phase.elapsed());
        let fetched = jobs.len();

        let phase = Instant::now();
        let refs = self.reconciler.reconcile(&jobs).await?;
        monitor.record("reconcile", phase.elapsed());

        let phase = Instant::now();
        let outcome = self.persister.persist(jobs, &refs).await?;
        monitor.record("persist", phase.elapsed());

        tracing::info!(
            "✅ Ingestion finished: {} fetched, {} persisted in {:?}",
            fetched,
            outcome.jobs.len(),
            monitor.elapsed()
        );

        Ok(IngestReport {
            started_at,
            finished_at: Utc::now(),
            policy: self.persister.policy(),
            providers: self
                .coordinator
                .provider_names()
                .into_iter()
                .map(String::from)
                .collect(),
            fetched,
            companies_created: refs.companies_created,
            skills_created: refs.skills_created,
            inserted: outcome.inserted,
            updated: outcome.updated,
            skipped: outcome.skipped,
            phases: monitor.phases(),
            jobs: outcome.jobs,
        })
    }
}
