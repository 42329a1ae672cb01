//! Error types for the Sanskara domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only [`RecallError`] is ever
//! surfaced to callers of the context layer; the others are recovered locally.

use thiserror::Error;

/// The top-level error type for all Sanskara operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Recall errors ---
    #[error("Recall error: {0}")]
    Recall(#[from] RecallError),

    // --- State slice errors ---
    #[error("State slice error: {0}")]
    Slice(#[from] SliceError),

    // --- Snapshot I/O ---
    #[error("Failed to read snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of a memory backend. Inside semantic recall every variant
/// triggers the recency fallback.
#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Memory backend timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Input rejected by the semantic memory index before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecallError {
    #[error("Invalid recall input: {0}")]
    InvalidInput(String),
}

/// A state slice could not be fetched. The assembler substitutes the slice's
/// empty value; this error never escapes assembly.
#[derive(Debug, Clone, Error)]
pub enum SliceError {
    #[error("Slice '{0}' is not available from this source")]
    Unavailable(String),

    #[error("Slice '{slice}' fetch failed: {reason}")]
    Failed { slice: String, reason: String },

    #[error("Slice '{slice}' timed out after {timeout_ms}ms")]
    Timeout { slice: String, timeout_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_error_displays_correctly() {
        let err = Error::Slice(SliceError::Failed {
            slice: "budget".into(),
            reason: "connection reset".into(),
        });
        assert!(err.to_string().contains("budget"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn recall_error_converts_into_top_level() {
        let err: Error = RecallError::InvalidInput("top_k must be at least 1".into()).into();
        assert!(matches!(err, Error::Recall(_)));
        assert!(err.to_string().contains("top_k"));
    }

    #[test]
    fn snapshot_error_keeps_path_and_cause() {
        let err = Error::Snapshot {
            path: "/tmp/state.json".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/tmp/state.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn memory_timeout_mentions_duration() {
        let err = MemoryError::Timeout { timeout_ms: 2500 };
        assert!(err.to_string().contains("2500ms"));
    }
}
