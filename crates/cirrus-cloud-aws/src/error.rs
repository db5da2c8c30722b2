//! AWS provider error types.

use cirrus_cloud::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Install the AWS CLI v2 and make sure it is on PATH")]
    CliNotFound,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("request throttled: {0}")]
    Throttled(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dependency violation: {0}")]
    DependencyViolation(String),

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AwsError> for ProviderError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::CliNotFound => ProviderError::CommandFailed(err.to_string()),
            AwsError::AuthenticationFailed(m) => ProviderError::AuthenticationFailed(m),
            AwsError::Throttled(m) => ProviderError::Throttled(m),
            AwsError::NotFound(m) => ProviderError::NotFound(m),
            AwsError::PermissionDenied(m) => ProviderError::PermissionDenied(m),
            AwsError::InvalidParameter(m) => ProviderError::InvalidParameter(m),
            AwsError::DependencyViolation(m) => ProviderError::DependencyViolation(m),
            AwsError::CommandFailed(m) => ProviderError::CommandFailed(m),
            AwsError::Json(e) => ProviderError::Json(e),
            AwsError::Io(e) => ProviderError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
