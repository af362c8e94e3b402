//! Error types for the interaction core.

use agent_chat_client::ApiError;
use thiserror::Error;

use crate::responder::ResponderError;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    /// A persistence call was rejected; nothing it asked for took effect
    #[error("store error: {0}")]
    Store(#[from] ApiError),

    /// The reply backend could not produce a reply
    #[error("responder error: {0}")]
    Responder(#[from] ResponderError),

    /// Reply delay bounds are inverted
    #[error("invalid reply delay: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidDelay { min_ms: u128, max_ms: u128 },

    /// The background reply task panicked or was aborted
    #[error("reply task failed: {0}")]
    Task(String),
}
