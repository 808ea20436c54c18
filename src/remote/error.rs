//! Error types for the platform API

use thiserror::Error;

use crate::progress::SnapshotError;

/// Errors that can occur when talking to the platform API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Session token missing or rejected
    #[error("Not authorized; sign in again")]
    Unauthorized,

    /// Rate limited by the API
    #[error("Rate limited. Retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds to wait before retrying
        retry_after_seconds: u64,
    },

    /// Response body was not JSON
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    InvalidSnapshot(#[from] SnapshotError),

    /// Remote could not be reached for another reason
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// Check if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            RemoteError::RateLimited { .. }
            | RemoteError::RequestError(_)
            | RemoteError::Unavailable(_) => true,
            RemoteError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if the session has to be re-established
    pub fn requires_reauth(&self) -> bool {
        matches!(self, RemoteError::Unauthorized | RemoteError::ApiError { status: 401 | 403, .. })
    }
}
