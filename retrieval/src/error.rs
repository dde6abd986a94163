//! Error types for the register retrieval system.

use std::path::PathBuf;

use thiserror::Error;

/// Retrieval error type.
#[derive(Debug, Error)]
pub enum RetrievalErr {
    /// Invalid configuration value.
    #[error("Invalid config '{field}': {cause}")]
    ConfigError { field: String, cause: String },

    /// Configuration file could not be parsed.
    #[error("Failed to parse config {path:?}: {cause}")]
    ConfigParseError { path: PathBuf, cause: String },

    /// Register input could not be loaded.
    #[error("Failed to load registers from {path:?}: {cause}")]
    InputParseError { path: PathBuf, cause: String },

    /// Caller supplied an unusable argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Embedding provider failed.
    #[error("Embedding failed: {cause}")]
    EmbeddingFailed { cause: String },

    /// Embedding vector has the wrong length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch { expected: i32, actual: i32 },

    /// Cross-encoder scoring failed.
    #[error("Rerank failed: {cause}")]
    RerankFailed { cause: String },

    /// Vector store request failed.
    #[error("Vector store '{store}' failed: {cause}")]
    StoreFailed { store: String, cause: String },

    /// An external call did not finish in time.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Feature is not compiled in or not configured.
    #[error("Feature not enabled: {0}")]
    NotEnabled(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RetrievalErr {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Timeouts and transport-level failures of external services are
    /// transient; configuration and input errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalErr::Timeout { .. }
                | RetrievalErr::EmbeddingFailed { .. }
                | RetrievalErr::RerankFailed { .. }
                | RetrievalErr::StoreFailed { .. }
        )
    }

    pub(crate) fn store(store: &str, cause: impl std::fmt::Display) -> Self {
        RetrievalErr::StoreFailed {
            store: store.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalErr>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let timeout = RetrievalErr::Timeout {
            operation: "search_hybrid".to_string(),
            timeout_ms: 100,
        };
        assert!(timeout.is_retryable());
        assert!(RetrievalErr::store("qdrant", "connection refused").is_retryable());
        assert!(!RetrievalErr::InvalidInput("empty query".to_string()).is_retryable());
        assert!(
            !RetrievalErr::ConfigError {
                field: "search.top_k".to_string(),
                cause: "must be > 0".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_display() {
        let err = RetrievalErr::EmbeddingDimensionMismatch {
            expected: 384,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 384, got 3"
        );
    }
}
