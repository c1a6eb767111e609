//! Error types for upstream API operations.

use thiserror::Error;

/// Errors talking to the Pendle API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: String },

    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Parse(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Parse(err.to_string())
    }
}

impl UpstreamError {
    /// Returns true if this error is likely to succeed on retry.
    /// Network failures, 5xx responses and rate limits qualify;
    /// other HTTP statuses and malformed payloads do not.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Network(_) | UpstreamError::RateLimited { .. } => true,
            UpstreamError::Http { status, .. } => *status >= 500,
            UpstreamError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(UpstreamError::Network("reset".into()).is_transient());
        assert!(UpstreamError::RateLimited { endpoint: "x".into() }.is_transient());
        assert!(UpstreamError::Http { status: 503, endpoint: "x".into() }.is_transient());
        assert!(!UpstreamError::Http { status: 404, endpoint: "x".into() }.is_transient());
        assert!(!UpstreamError::Parse("bad json".into()).is_transient());
    }
}
