//! Error taxonomy for the memory subsystem.
//!
//! Errors fall into three groups: transient collaborator failures (retried,
//! then degraded), per-document failures (the file is skipped), and fatal
//! index/schema failures that need an operator.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    /// Embedding service unreachable, timed out, or returned a bad response.
    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("vision service unavailable: {0}")]
    VisionUnavailable(String),

    #[error("generation service unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Embedding dimension differs from the index dimension. Requires reindexing.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// Persisted vectors and metadata disagree.
    #[error("vector index corrupt: {0}")]
    IndexCorrupt(String),

    #[error("malformed document {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("batch length mismatch: {vectors} vectors for {records} records")]
    BatchMismatch { vectors: usize, records: usize },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("attachment path escapes the uploads directory: {0}")]
    UnsafePath(String),

    #[error("index lock poisoned")]
    LockPoisoned,

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("vector blob encoding failed: {0}")]
    Blob(#[from] bincode::Error),
}

impl MemoryError {
    /// Failures of an external service that may succeed on another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::EmbeddingUnavailable(_)
                | Self::VisionUnavailable(_)
                | Self::GenerationUnavailable(_)
                | Self::Timeout { .. }
        )
    }

    /// Failures that leave the index unusable until an operator intervenes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::IndexCorrupt(_) | Self::LockPoisoned
        )
    }

    pub(crate) fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<tokio::task::JoinError> for MemoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
