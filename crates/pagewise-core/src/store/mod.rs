//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only contract the pipeline has with a
//! similarity-search backend. Backends are chosen by configuration in the
//! app crate; the in-memory backend here serves tests and embedding-only
//! tools.
//!
//! # Contract
//!
//! | Method | Guarantee |
//! |--------|-----------|
//! | [`upsert`](VectorStore::upsert) | At-least-once. Re-uploading a `(source_id, ordinal)` may add a duplicate. A batch with any dimension mismatch is rejected before any write. |
//! | [`query`](VectorStore::query) | At most `k` results, score non-increasing, ties by insertion order (earliest first). |
//!
//! Implementations must be `Send + Sync` and safe for concurrent use; a
//! single handle is shared by every in-flight request.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::error::{PagewiseError, Result};
use crate::models::{EmbeddingRecord, RetrievalResult};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend identifier for logs and stats (e.g. `"sqlite"`).
    fn backend_name(&self) -> &str;

    /// Dimension the collection is pinned to, if any record or config fixed it.
    fn dims(&self) -> Option<usize>;

    /// Persist a batch of records.
    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()>;

    /// Return the `k` most similar records to `vector`.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>>;

    /// Count stored records, optionally restricted to one source document.
    async fn count(&self, source_id: Option<&str>) -> Result<usize>;

    /// Record counts per source document, sorted by `source_id`.
    async fn source_counts(&self) -> Result<Vec<(String, usize)>>;

    /// Release backend resources. Called once at shutdown.
    async fn close(&self) {}
}

/// Check every record against the collection dimension.
///
/// `pinned` is the dimension already fixed for the collection. When it is
/// `None` the first record's dimension becomes the expectation for the rest
/// of the batch. Returns the batch dimension (or `pinned` for an empty batch).
pub fn check_dimensions(
    pinned: Option<usize>,
    records: &[EmbeddingRecord],
) -> Result<Option<usize>> {
    let expected = pinned.or_else(|| records.first().map(EmbeddingRecord::dims));
    if let Some(expected) = expected {
        if let Some(bad) = records.iter().find(|r| r.dims() != expected) {
            return Err(PagewiseError::DimensionMismatch {
                expected,
                actual: bad.dims(),
            });
        }
    }
    Ok(expected)
}

/// Check a query vector against the collection dimension.
pub fn check_query_dimensions(pinned: Option<usize>, vector: &[f32]) -> Result<()> {
    match pinned {
        Some(expected) if expected != vector.len() => Err(PagewiseError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(()),
    }
}

/// Order candidates by descending score and keep the top `k`.
///
/// Candidates must arrive in insertion order: the sort is stable, so equal
/// scores keep that order. `total_cmp` keeps the ordering total even for
/// NaN scores.
pub fn rank_candidates(mut candidates: Vec<RetrievalResult>, k: usize) -> Vec<RetrievalResult> {
    candidates.sort_by(|a, b| descending(a.score, b.score));
    candidates.truncate(k);
    candidates
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}
