//! Error types for the agent chat client.

use thiserror::Error;

/// Result type for data-access operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors raised at the data-access boundary.
///
/// Callers treat every variant the same way: the operation did not take effect.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid client settings (bad base URL, unusable HTTP client)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the server
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
