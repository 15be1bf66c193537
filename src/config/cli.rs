use super::{IngestConfig, MonitoringConfig};
use crate::core::persister::ReingestPolicy;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "job-ingest")]
#[command(about = "Fetch job postings from providers, normalize and store them")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "ingest.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Override re-ingestion policy (upsert, skip, reject)
    #[arg(long)]
    pub policy: Option<ReingestPolicy>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Dry run - show what would be fetched without executing
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// 將命令列覆蓋設定套用到配置
    pub fn apply_overrides(&self, config: &mut IngestConfig) {
        if let Some(policy) = self.policy {
            config.ingest.reingest_policy = policy;
            tracing::info!("🔧 Re-ingestion policy overridden to: {:?}", policy);
        }

        if let Some(enabled) = self.monitor {
            match config.monitoring.as_mut() {
                Some(monitoring) => monitoring.enabled = enabled,
                None => {
                    config.monitoring = Some(MonitoringConfig {
                        enabled,
                        log_format: None,
                    })
                }
            }
        }
    }
}
