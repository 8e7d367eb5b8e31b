//! Error taxonomy for client operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenience alias for fallible client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Primary error type for API client operations.
///
/// Transport and status failures are propagated unchanged from the request
/// that produced them; only [`ClientError::Refresh`] is synthesized by the
/// client itself, when a token-refresh cycle fails.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure or malformed response body.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Api {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Best-effort description extracted from the response body.
        message: String,
    },
    /// The token-refresh cycle failed; the session has been cleared.
    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshError),
    /// Reading or writing the persisted token slot failed.
    #[error("token store failure: {0}")]
    TokenStore(#[from] std::io::Error),
    /// A request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
    /// A request path could not be joined onto the base URL.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Outcome of a failed refresh cycle.
///
/// Cloneable so a single failure can settle every request queued behind the
/// refresh, each receiving the same error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RefreshError {
    /// Status returned by the refresh endpoint, when a response arrived.
    pub status: Option<u16>,
    /// Human-readable failure description.
    pub message: String,
}

impl RefreshError {
    /// Failure that never reached the refresh endpoint.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Failure reported by the refresh endpoint itself.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_error_displays_message() {
        let err = RefreshError::rejected(401, "refresh rejected with status 401");
        assert_eq!(err.to_string(), "refresh rejected with status 401");
        assert_eq!(err.status, Some(401));
    }

    #[test]
    fn client_error_wraps_refresh_failure() {
        let err = ClientError::from(RefreshError::transport("connection reset"));
        assert!(err.to_string().contains("session refresh failed"));
        assert!(err.to_string().contains("connection reset"));
    }
}
