use crate::domain::model::CanonicalJob;
use crate::domain::ports::ProviderAdapter;
use crate::utils::error::Result;
use crate::utils::validation::validate_unique_names;
use futures::future::try_join_all;
use std::time::Instant;

/// 執行所有 provider adapter 並合併結果；任一 adapter 失敗即中止整批
pub struct AggregationCoordinator {
    adapters: Vec<Box<dyn ProviderAdapter>>,
    concurrent: bool,
}

impl AggregationCoordinator {
    pub fn new(adapters: Vec<Box<dyn ProviderAdapter>>) -> Result<Self> {
        validate_unique_names("providers.name", adapters.iter().map(|a| a.name()))?;
        Ok(Self {
            adapters,
            concurrent: true,
        })
    }

    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub async fn collect(&self) -> Result<Vec<CanonicalJob>> {
        let batches = if self.concurrent {
            // try_join_all 在第一個錯誤時丟棄其餘仍在執行的 future
            try_join_all(self.adapters.iter().map(|a| Self::run_adapter(a.as_ref()))).await?
        } else {
            let mut batches = Vec::with_capacity(self.adapters.len());
            for adapter in &self.adapters {
                batches.push(Self::run_adapter(adapter.as_ref()).await?);
            }
            batches
        };

        let jobs: Vec<CanonicalJob> = batches.into_iter().flatten().collect();
        tracing::info!(
            "📥 Collected {} jobs from {} providers",
            jobs.len(),
            self.adapters.len()
        );
        Ok(jobs)
    }

    async fn run_adapter(adapter: &dyn ProviderAdapter) -> Result<Vec<CanonicalJob>> {
        let start = Instant::now();
        let name = adapter.name();

        let outcome = match adapter.fetch().await {
            Ok(payload) => adapter.normalize(payload),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(jobs) => {
                tracing::info!(
                    "✅ {}: normalized {} jobs in {:?}",
                    name,
                    jobs.len(),
                    start.elapsed()
                );
                Ok(jobs)
            }
            Err(e) => {
                tracing::error!("❌ {}: {}", name, e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for AggregationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationCoordinator")
            .field("providers", &self.provider_names())
            .field("concurrent", &self.concurrent)
            .finish()
    }
}
