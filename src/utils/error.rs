use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Transport error fetching {endpoint}: {message}")]
    TransportError { endpoint: String, message: String },

    #[error("Normalization error in {provider} at `{field}`: {reason}")]
    NormalizationError {
        provider: String,
        field: String,
        reason: String,
    },

    #[error("Reconciliation conflict on {kind}: {names:?} already exist")]
    ReconciliationConflict {
        kind: &'static str,
        names: Vec<String>,
    },

    #[error("Persistence error: {message}")]
    PersistenceError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Unique constraint `{constraint}` violated by {key}")]
    UniqueViolation { constraint: String, key: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for `{field}`: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration `{field}`")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Normalization,
    Reconciliation,
    Persistence,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// CLI 退出碼；失敗的執行一律非 0
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Medium => 2,
            Self::Low | Self::High => 1,
            Self::Critical => 3,
        }
    }
}

impl IngestError {
    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::TransportError {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn normalization(
        provider: impl Into<String>,
        field: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::NormalizationError {
            provider: provider.into(),
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    /// Store-level failures surface as `PersistenceError` with `context` as the message;
    /// the underlying detail only goes to the log.
    pub fn into_persistence(self, context: &str) -> Self {
        match self {
            Self::StorageError { .. } | Self::UniqueViolation { .. } => {
                tracing::debug!("{}: {}", context, self);
                Self::persistence(context)
            }
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TransportError { .. } => ErrorCategory::Transport,
            Self::NormalizationError { .. } => ErrorCategory::Normalization,
            Self::ReconciliationConflict { .. } => ErrorCategory::Reconciliation,
            Self::PersistenceError { .. }
            | Self::StorageError { .. }
            | Self::UniqueViolation { .. } => ErrorCategory::Persistence,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Reconciliation => ErrorSeverity::Low,
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Normalization | ErrorCategory::Persistence => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Transport failures usually clear up on the next scheduled run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError { .. } | Self::ReconciliationConflict { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::TransportError { endpoint, .. } => format!(
                "Check that {} is reachable; the next scheduled run will try again",
                endpoint
            ),
            Self::NormalizationError { provider, field, .. } => format!(
                "Provider '{}' sent a value at `{}` that cannot be mapped; contact the provider or extend the parser",
                provider, field
            ),
            Self::ReconciliationConflict { .. } => {
                "Another run created the same entities concurrently; re-read and retry".to_string()
            }
            Self::PersistenceError { .. } | Self::UniqueViolation { .. } => {
                "Review the reingest_policy setting, or inspect the store for previously ingested jobs".to_string()
            }
            Self::StorageError { .. } => "Verify the job store is available".to_string(),
            Self::IoError(_) => "Check file permissions and available disk space".to_string(),
            Self::SerializationError(_) => "Inspect the payload for malformed JSON".to_string(),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => {
                "Fix the configuration file and run again".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::TransportError { endpoint, .. } => {
                format!("Could not download jobs from {}", endpoint)
            }
            Self::NormalizationError { provider, field, .. } => {
                format!("Provider '{}' sent an unreadable value in `{}`", provider, field)
            }
            Self::PersistenceError { message } => format!("Jobs were not saved: {}", message),
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. }
            | Self::MissingConfigError { field } => {
                format!("Configuration problem in `{}`", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
