// Adapters layer: concrete implementations for external systems (provider feeds, http, storage).

pub mod file_storage;
pub mod file_store;
pub mod http;
pub mod memory_store;
pub mod source_a;
pub mod source_b;

use crate::domain::model::ValueError;
use crate::domain::ports::{FetchRequest, RawPayload, Transport};
use crate::utils::error::{IngestError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::sync::Arc;

pub use file_storage::LocalStorage;
pub use file_store::FileStore;
pub use http::HttpTransport;
pub use memory_store::{MemoryStore, StoreSnapshot};
pub use source_a::ArrayFeedAdapter;
pub use source_b::KeyedFeedAdapter;

/// Provider 名稱、請求設定與注入的 transport；兩種 feed adapter 共用
#[derive(Clone)]
pub struct FeedSource {
    name: String,
    request: FetchRequest,
    transport: Arc<dyn Transport>,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, request: FetchRequest, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            request,
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn fetch(&self) -> Result<RawPayload> {
        let payload = self.transport.fetch(&self.request).await?;
        tracing::debug!(
            "📥 {}: received {} bytes from {}",
            self.name,
            payload.bytes.len(),
            self.request.endpoint
        );
        Ok(payload)
    }

    pub(crate) fn field_error(&self, field: impl Into<String>, err: ValueError) -> IngestError {
        IngestError::normalization(&self.name, field, err)
    }
}

pub(crate) fn required_text(value: &str) -> std::result::Result<String, ValueError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValueError::Empty);
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 去除空白與空字串，並保留第一次出現的順序去重
pub(crate) fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Provider job ids show up as both JSON strings and numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
