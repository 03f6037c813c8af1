//! Core error types for Farescout.

use thiserror::Error;

/// Core error type for Farescout operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Query failed validation.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Unknown source identifier.
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Invalid data while building a model.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
