//! Error taxonomy shared by every pipeline stage.
//!
//! Errors fall in two classes: retryable (network-class failures of the
//! embedding service or the store) and permanent. [`PagewiseError::is_retryable`]
//! is the single source of truth for that split; the retry decorator in the
//! app crate consults nothing else.

use std::fmt;

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, PagewiseError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PagewiseError {
    /// Every page of the document normalized to empty text.
    #[error("document '{source_id}' has no non-empty pages")]
    EmptyDocument { source_id: String },

    /// Network failure, timeout, rate limit, or server error from the embedding service.
    #[error("transient embedding failure: {0}")]
    TransientEmbedding(String),

    /// Malformed or oversized input, or a malformed response from the model.
    #[error("embedding rejected: {0}")]
    PermanentEmbedding(String),

    /// The store could not be reached (connection, pool, or I/O failure).
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store is reachable but refused the operation.
    #[error("vector store rejected operation: {0}")]
    StoreRejected(String),

    #[error("vector dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("collection is pinned to embedding model '{expected}', not '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PagewiseError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PagewiseError::TransientEmbedding(_) | PagewiseError::StoreUnavailable(_)
        )
    }
}

/// The ingestion stage that was running when a document failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Chunking,
    Embedding,
    Storing,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Chunking => "chunking",
            IngestStage::Embedding => "embedding",
            IngestStage::Storing => "storing",
        };
        f.write_str(name)
    }
}

/// Failure of a whole document ingestion.
///
/// Carries the failing stage so callers can tell the user where the
/// document stopped, and whether trying again later may help.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("ingestion of '{source_id}' failed during {stage}: {source}")]
pub struct IngestError {
    pub source_id: String,
    pub stage: IngestStage,
    #[source]
    pub source: PagewiseError,
}

impl IngestError {
    pub fn new(source_id: impl Into<String>, stage: IngestStage, source: PagewiseError) -> Self {
        Self {
            source_id: source_id.into(),
            stage,
            source,
        }
    }

    /// Whether re-submitting the same document later may succeed.
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}
