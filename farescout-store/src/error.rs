//! Store error types.

use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration (de)serialization error.
    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),
}
