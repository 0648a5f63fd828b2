//! Ingestion pipeline orchestration.
//!
//! Drives one document through `Received → Chunked → Embedded → Stored`,
//! or `Failed` with the stage that broke. Retries of transient failures
//! happen inside the embedder and store handles (the app crate wraps them
//! in a retry decorator); the pipeline itself never retries and never
//! reports partial success.
//!
//! Vectors are validated before anything is written and the whole document
//! goes to the store in a single `upsert`, so with an atomic backend a
//! failed ingestion leaves no records behind.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::chunk::chunk_document;
use crate::embedding::{validate_batch, Embedder};
use crate::error::{IngestError, IngestStage};
use crate::models::{EmbeddingRecord, IngestState, IngestSummary, RawDocument};
use crate::store::VectorStore;

/// Chunker → embedder → store, for one document at a time.
///
/// Cheap to clone; the embedder and store handles are shared.
#[derive(Clone)]
pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl IngestPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Ingest a document and return a confirmation summary.
    ///
    /// # Errors
    ///
    /// An [`IngestError`] naming the failing stage:
    /// - chunking: the document has no non-empty pages;
    /// - embedding: a permanent model error, or transient errors that outlasted the retry budget;
    /// - storing: the store stayed unreachable, or rejected the vectors' dimension.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future cancels the ingestion at its next await
    /// point and nothing already written is rolled back by the pipeline.
    /// Whether a half-finished `upsert` leaves records behind is up to the
    /// backend: the SQLite store writes the batch in one transaction that is
    /// rolled back when dropped, and the in-memory store appends the batch
    /// under a single lock. A backend that writes records one at a time may
    /// keep the ones that landed before cancellation.
    pub async fn ingest(&self, document: &RawDocument) -> Result<IngestSummary, IngestError> {
        let source_id = document.source_id.as_str();
        let mut state = IngestState::Received;
        debug!(source_id, ?state, pages = document.segments.len(), "document received");

        let chunks = chunk_document(document)
            .map_err(|e| fail(source_id, &mut state, IngestStage::Chunking, e))?;
        state = IngestState::Chunked;
        debug!(source_id, ?state, chunks = chunks.len(), "document chunked");

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .and_then(|v| validate_batch(&v, texts.len(), self.embedder.dims()).map(|_| v))
            .map_err(|e| fail(source_id, &mut state, IngestStage::Embedding, e))?;
        state = IngestState::Embedded;
        debug!(source_id, ?state, model = self.embedder.model_name(), "chunks embedded");

        // chunk_document guarantees at least one chunk, so records[0] exists.
        let records: Vec<EmbeddingRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord { chunk, vector })
            .collect();

        self.store
            .upsert(&records)
            .await
            .map_err(|e| fail(source_id, &mut state, IngestStage::Storing, e))?;
        state = IngestState::Stored;
        info!(
            source_id,
            ?state,
            chunks = records.len(),
            backend = self.store.backend_name(),
            "document stored"
        );

        Ok(IngestSummary {
            source_id: source_id.to_string(),
            first_chunk_content: records[0].chunk.content.clone(),
            first_chunk_vector: records[0].vector.clone(),
            chunk_count: records.len(),
        })
    }
}

fn fail(
    source_id: &str,
    state: &mut IngestState,
    stage: IngestStage,
    error: crate::error::PagewiseError,
) -> IngestError {
    *state = IngestState::Failed;
    warn!(
        source_id,
        state = ?*state,
        %stage,
        retryable = error.is_retryable(),
        error = %error,
        "ingestion failed"
    );
    IngestError::new(source_id, stage, error)
}
