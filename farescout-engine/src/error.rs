//! Engine error types.

use thiserror::Error;

/// Aggregated error surfaced to the caller.
///
/// Adapter-level failures stay inside health accounting; the caller sees
/// at most one of these, and only when every tier is exhausted.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The query failed validation.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No source is eligible for this route.
    #[error("No route coverage for {origin}->{destination}")]
    NoRoute {
        /// Query origin.
        origin: String,
        /// Query destination.
        destination: String,
    },

    /// Every eligible source failed.
    #[error("All sources failed")]
    AllSourcesFailed,

    /// The request deadline expired with nothing to return.
    #[error("Request timed out")]
    Timeout,

    /// Store-layer failure.
    #[error("Store error: {0}")]
    Store(#[from] farescout_store::StoreError),
}

impl EngineError {
    /// Stable error code for the API collaborator.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::NoRoute { .. } => "NO_ROUTE",
            Self::AllSourcesFailed => "ALL_SOURCES_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::InvalidQuery("x".to_string()).code(),
            "INVALID_QUERY"
        );
        assert_eq!(
            EngineError::NoRoute {
                origin: "ICN".to_string(),
                destination: "NRT".to_string()
            }
            .code(),
            "NO_ROUTE"
        );
        assert_eq!(EngineError::AllSourcesFailed.code(), "ALL_SOURCES_FAILED");
        assert_eq!(EngineError::Timeout.code(), "TIMEOUT");
    }
}
