#[cfg(feature = "cli")]
pub mod cli;

use crate::adapters::file_store::DEFAULT_STORE_FILENAME;
use crate::adapters::{ArrayFeedAdapter, FeedSource, FileStore, KeyedFeedAdapter, LocalStorage};
use crate::core::persister::ReingestPolicy;
use crate::domain::ports::{FetchRequest, ProviderAdapter, Transport};
use crate::utils::error::{IngestError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_required_field,
    validate_unique_names, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_OUTPUT_FILENAME: &str = "ingest_report.json";
pub const DEFAULT_STORE_PATH: &str = "./data";

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env placeholder pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub store: StoreConfig,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub reingest_policy: ReingestPolicy,
    #[serde(default = "default_true")]
    pub concurrent_fetch: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            reingest_policy: ReingestPolicy::default(),
            concurrent_fetch: true,
        }
    }
}

/// Provider 的 payload 形狀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    ArrayFeed,
    KeyedFeed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub enabled: Option<bool>,
    pub headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            endpoint: self.endpoint.clone(),
            headers: self.headers.clone().unwrap_or_default(),
            timeout: Some(Duration::from_secs(
                self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            )),
        }
    }

    pub fn build_adapter(&self, transport: Arc<dyn Transport>) -> Box<dyn ProviderAdapter> {
        let source = FeedSource::new(&self.name, self.fetch_request(), transport);
        match self.kind {
            ProviderKind::ArrayFeed => Box::new(ArrayFeedAdapter::new(source)),
            ProviderKind::KeyedFeed => Box::new(KeyedFeedAdapter::new(source)),
        }
    }
}

/// 跨次執行保存 company、skill 與 job 的 JSON 檔位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
    pub filename: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            filename: None,
        }
    }
}

impl StoreConfig {
    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or(DEFAULT_STORE_FILENAME)
    }

    pub fn open(&self) -> FileStore {
        FileStore::new(LocalStorage::new(&self.path), self.filename())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<String>,
}

fn default_name() -> String {
    "job-ingest".to_string()
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

fn default_true() -> bool {
    true
}

impl IngestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IngestError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| IngestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${FEED_TOKEN})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.is_enabled())
    }

    pub fn build_adapters(&self, transport: Arc<dyn Transport>) -> Vec<Box<dyn ProviderAdapter>> {
        self.enabled_providers()
            .map(|p| p.build_adapter(transport.clone()))
            .collect()
    }

    pub fn reingest_policy(&self) -> ReingestPolicy {
        self.ingest.reingest_policy
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_format.as_deref())
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }

    /// 報告輸出位置 (目錄, 檔名)
    pub fn output_target(&self) -> Option<(&str, &str)> {
        self.output.as_ref().and_then(|o| {
            o.path.as_deref().map(|path| {
                (
                    path,
                    o.filename.as_deref().unwrap_or(DEFAULT_OUTPUT_FILENAME),
                )
            })
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("ingest.name", &self.ingest.name)?;

        if self.enabled_providers().next().is_none() {
            return Err(IngestError::ConfigValidationError {
                field: "providers".to_string(),
                message: "At least one enabled provider is required".to_string(),
            });
        }

        for (i, provider) in self.providers.iter().enumerate() {
            validate_non_empty_string(&format!("providers[{}].name", i), &provider.name)?;
            validate_url(&format!("providers[{}].endpoint", i), &provider.endpoint)?;
            if let Some(timeout) = provider.timeout_seconds {
                validate_range(&format!("providers[{}].timeout_seconds", i), timeout, 1, 300)?;
            }
        }

        validate_unique_names("providers.name", self.providers.iter().map(|p| p.name.as_str()))?;

        validate_path("store.path", &self.store.path)?;
        if let Some(filename) = &self.store.filename {
            validate_path("store.filename", filename)?;
        }

        if let Some(output) = &self.output {
            let path = validate_required_field("output.path", &output.path)?;
            validate_path("output.path", path)?;
            if let Some(filename) = &output.filename {
                validate_path("output.filename", filename)?;
            }
        }

        if let Some(format) = self.monitoring.as_ref().and_then(|m| m.log_format.as_deref()) {
            if !["compact", "json"].contains(&format) {
                return Err(IngestError::InvalidConfigValueError {
                    field: "monitoring.log_format".to_string(),
                    value: format.to_string(),
                    reason: "Unsupported format. Valid formats: compact, json".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Validate for IngestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
