//! Provider error taxonomy.

use cirrus_core::ResourceKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    /// Throttling. Retryable with backoff inside a single step.
    #[error("provider throttled the request: {0}")]
    Throttled(String),

    /// Bounded wait elapsed. Retryable inside a step; once retries are
    /// exhausted this is a step failure, never "resource does not exist".
    #[error("provider call timed out: {0}")]
    Timeout(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The provider refused a deletion because a dependent resource still
    /// exists.
    #[error("deletion blocked by dependent resource: {0}")]
    DependencyViolation(String),

    #[error("unsupported operation for {kind}: {message}")]
    Unsupported {
        kind: ResourceKind,
        message: String,
    },

    #[error("provider command failed: {0}")]
    CommandFailed(String),

    #[error("tracker state error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Eligible for a bounded in-step retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Throttled(_) | ProviderError::Timeout(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
