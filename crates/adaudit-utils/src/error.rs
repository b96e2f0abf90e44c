use std::fmt;

use thiserror::Error;

/// Library-level error type for audit orchestration.
///
/// `AuditError` is returned by every fallible orchestrator, store and query
/// operation. It provides:
/// - A stable taxonomy for programmatic handling
/// - User-friendly messages with context and suggestions
/// - A mapping to API response codes through [`AuditError::api_code`]
///
/// # Error Categories
///
/// | Variant | Surfaced as | Retried |
/// |---------|-------------|---------|
/// | `InvalidArgument` | 400 | no |
/// | `NotFound` | 404 | no |
/// | `TransientResolutionFailure` | 503 | yes, by the resolver |
/// | `Internal` | 500 | no |
/// | `Config` | 500 | no |
///
/// Submission-time errors are returned synchronously and never create a
/// task record. Resolution-time errors are recorded on the task instead of
/// being returned to any caller.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Transient resolution failure for task {task_id}: {reason}")]
    TransientResolutionFailure { task_id: u64, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AuditError {
    /// Shorthand for a missing or malformed request field.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for an unknown entity on a query.
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Shorthand for an unexpected defect.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify a provider failure raised while resolving `task_id`.
    #[must_use]
    pub fn from_provider(task_id: u64, err: ProviderError) -> Self {
        match err {
            ProviderError::Transient(reason) => {
                Self::TransientResolutionFailure { task_id, reason }
            }
            ProviderError::Permanent(reason) => {
                Self::Internal(format!("provider rejected request: {reason}"))
            }
        }
    }

    /// Numeric code placed in the `code` field of API envelopes.
    #[must_use]
    pub const fn api_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::NotFound { .. } => 404,
            Self::TransientResolutionFailure { .. } => 503,
            Self::Internal(_) | Self::Config(_) => 500,
        }
    }

    /// Whether the operation may succeed if attempted again later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientResolutionFailure { .. })
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Lookup,
    Provider,
    Internal,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "Validation"),
            Self::Lookup => write!(f, "Lookup"),
            Self::Provider => write!(f, "Provider"),
            Self::Internal => write!(f, "Internal"),
            Self::Configuration => write!(f, "Configuration"),
        }
    }
}

impl UserFriendlyError for AuditError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument(reason) => format!("The request was rejected: {reason}"),
            Self::NotFound { kind, id } => format!("No {kind} exists with id '{id}'"),
            Self::TransientResolutionFailure { task_id, .. } => {
                format!("The compliance provider is temporarily unavailable for task {task_id}")
            }
            Self::Internal(_) => "An unexpected internal error occurred".to_string(),
            Self::Config(err) => err.user_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidArgument(_) => {
                Some("Submissions are validated before any task is created".to_string())
            }
            Self::TransientResolutionFailure { reason, .. } => Some(reason.clone()),
            Self::Internal(detail) => Some(detail.clone()),
            Self::Config(err) => err.context(),
            Self::NotFound { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidArgument(_) => vec![
                "Check that accountId and materialId are present and non-empty".to_string(),
            ],
            Self::NotFound { kind, .. } => {
                vec![format!("Verify the {kind} id returned at submission time")]
            }
            Self::TransientResolutionFailure { .. } => vec![
                "The task stays pending while retries are attempted; poll its status later"
                    .to_string(),
            ],
            Self::Internal(_) => vec!["Check the service logs for details".to_string()],
            Self::Config(err) => err.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::Lookup,
            Self::TransientResolutionFailure { .. } => ErrorCategory::Provider,
            Self::Internal(_) => ErrorCategory::Internal,
            Self::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some("Configuration files use TOML syntax".to_string()),
            Self::InvalidValue { key, .. } => Some(format!("Key '{key}' failed range validation")),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec!["Validate the file with a TOML linter".to_string()],
            Self::InvalidValue { key, .. } => {
                vec![format!("Adjust '{key}' or remove it to use the default")]
            }
            Self::NotFound { .. } => vec![
                "Pass --config with an existing path or unset ADAUDIT_CONFIG".to_string(),
            ],
            Self::DiscoveryFailed { .. } => {
                vec!["Run from a directory you can read".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Failure reported by a verdict provider.
///
/// Distinct from a compliance `failed` verdict: a provider error means no
/// verdict was obtained at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network or rate-limit style failure; the resolver retries with backoff.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The provider refused the request; the task fails immediately.
    #[error("provider rejected request: {0}")]
    Permanent(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_codes_follow_taxonomy() {
        assert_eq!(AuditError::invalid_argument("x").api_code(), 400);
        assert_eq!(AuditError::not_found("task", 7).api_code(), 404);
        assert_eq!(
            AuditError::TransientResolutionFailure {
                task_id: 1,
                reason: "timeout".to_string()
            }
            .api_code(),
            503
        );
        assert_eq!(AuditError::internal("boom").api_code(), 500);
    }

    #[test]
    fn test_not_found_display() {
        let err = AuditError::not_found("task", 42);
        assert_eq!(err.to_string(), "task not found: 42");
        assert_eq!(err.category(), ErrorCategory::Lookup);
    }

    #[test]
    fn test_provider_failures_classify_by_kind() {
        let transient =
            AuditError::from_provider(12, ProviderError::Transient("upstream 503".to_string()));
        assert!(transient.is_retryable());
        assert_eq!(transient.api_code(), 503);
        assert!(transient.to_string().contains("task 12: upstream 503"));

        let permanent =
            AuditError::from_provider(12, ProviderError::Permanent("bad token".to_string()));
        assert!(!permanent.is_retryable());
        assert!(permanent.to_string().contains("provider rejected request: bad token"));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(
            AuditError::TransientResolutionFailure {
                task_id: 1,
                reason: String::new()
            }
            .is_retryable()
        );
        assert!(!AuditError::invalid_argument("x").is_retryable());
    }

    #[test]
    fn test_config_error_wraps_into_audit_error() {
        let err: AuditError = ConfigError::InvalidValue {
            key: "pass_probability".to_string(),
            value: "must be within 0.0..=1.0".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_message().contains("pass_probability"));
        assert!(!err.suggestions().is_empty());
    }
}
