//! Provider error types and classification

use crate::protocol::AttemptOutcome;
use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur when calling a generation backend
///
/// Variants are classified as transient (infrastructure failure, a
/// lower-priority provider may still succeed) or permanent (the
/// request itself was refused). Neither class is retried against the
/// same provider within a request; the chain falls forward.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Network or connection error
    #[error("network error: {0}")]
    Network(String),

    /// Backend returned a 5xx-class failure
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Backend rate-limited the call
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Backend rejected the request outright (bad prompt, unsupported input)
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Credentials were refused
    #[error("authentication failed")]
    Authentication,

    /// Backend response could not be parsed
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// A deferred generation task reported failure
    #[error("generation task failed: {0}")]
    TaskFailed(String),

    /// The submit call or polling loop exceeded its budget
    #[error("provider call timed out")]
    Timeout,
}

impl ProviderError {
    /// Whether this error is infrastructure-level rather than a
    /// rejection of the request itself
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Server { .. }
                | ProviderError::RateLimited { .. }
        )
    }

    /// The attempt outcome this error closes with
    pub fn attempt_outcome(&self) -> AttemptOutcome {
        match self {
            ProviderError::Timeout => AttemptOutcome::Timeout,
            e if e.is_transient() => AttemptOutcome::TransientFailure,
            _ => AttemptOutcome::PermanentFailure,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_connect() {
            ProviderError::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}
