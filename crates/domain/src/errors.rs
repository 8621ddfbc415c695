//! Error types used throughout Skylist

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Skylist
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SkylistError {
    #[error("Decode error: {0}")]
    Decode(String),

    /// `next_page` was called on a page without a cursor or document.
    #[error("Missing next token: {0}")]
    MissingContinuation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// A stored filter could not be re-encoded into request variables.
    ///
    /// This indicates a programming error upstream, never a transient
    /// condition; callers must not retry.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Skylist operations
pub type Result<T> = std::result::Result<T, SkylistError>;

impl From<serde_json::Error> for SkylistError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
