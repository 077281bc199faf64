//! Error types for ticker fetches.

use thiserror::Error;

/// Errors that can occur while fetching tickers.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout(err.to_string())
        } else if err.is_decode() {
            FeedError::ParseError(err.to_string())
        } else {
            FeedError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl From<url::ParseError> for FeedError {
    fn from(err: url::ParseError) -> Self {
        FeedError::InvalidUrl(err.to_string())
    }
}

impl FeedError {
    /// Returns true if a later attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::ConnectionFailed(_) | FeedError::Timeout(_) => true,
            FeedError::Status(code) => *code == 429 || *code >= 500,
            FeedError::ParseError(_) | FeedError::InvalidUrl(_) => false,
        }
    }
}
