//! In-memory [`VectorStore`] for tests and single-process use.
//!
//! Records live in a `Vec` behind a `std::sync::RwLock`, in insertion order.
//! Query is brute-force cosine similarity over every stored vector.
//! Duplicates are never removed: re-ingesting a document appends its
//! chunks again.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::{EmbeddingRecord, RetrievalResult};

use super::{check_dimensions, check_query_dimensions, rank_candidates, VectorStore};

struct Collection {
    dims: Option<usize>,
    records: Vec<EmbeddingRecord>,
}

/// In-memory store; contents are lost when the process exits.
pub struct InMemoryStore {
    inner: RwLock<Collection>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collection {
                dims: None,
                records: Vec::new(),
            }),
        }
    }

    /// Create a store pinned to a vector dimension up front.
    pub fn with_dims(dims: usize) -> Self {
        Self {
            inner: RwLock::new(Collection {
                dims: Some(dims),
                records: Vec::new(),
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn dims(&self) -> Option<usize> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dims
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let mut collection = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let dims = check_dimensions(collection.dims, records)?;
        collection.dims = dims;
        collection.records.extend_from_slice(records);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        let collection = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        check_query_dimensions(collection.dims, vector)?;
        let candidates = collection
            .records
            .iter()
            .map(|r| RetrievalResult {
                source_id: r.chunk.source_id.clone(),
                ordinal: r.chunk.ordinal,
                content: r.chunk.content.clone(),
                score: cosine_similarity(vector, &r.vector),
            })
            .collect();
        Ok(rank_candidates(candidates, k))
    }

    async fn count(&self, source_id: Option<&str>) -> Result<usize> {
        let collection = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(match source_id {
            Some(id) => collection
                .records
                .iter()
                .filter(|r| r.chunk.source_id == id)
                .count(),
            None => collection.records.len(),
        })
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        let collection = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in &collection.records {
            *counts.entry(r.chunk.source_id.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PagewiseError;
    use crate::models::Chunk;

    fn record(source_id: &str, ordinal: u32, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            chunk: Chunk {
                source_id: source_id.to_string(),
                ordinal,
                content: format!("{} page {}", source_id, ordinal),
                hash: String::new(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_descending_score() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                record("a", 1, vec![0.0, 1.0]),
                record("a", 2, vec![1.0, 0.0]),
                record("b", 1, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!((results[0].source_id.as_str(), results[0].ordinal), ("a", 2));
        assert_eq!((results[1].source_id.as_str(), results[1].ordinal), ("b", 1));
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_query_ties_keep_insertion_order() {
        let store = InMemoryStore::new();
        store
            .upsert(&[record("first", 1, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(&[record("second", 1, vec![2.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(&[record("third", 1, vec![3.0, 0.0])])
            .await
            .unwrap();

        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_k_larger_than_store_returns_all() {
        let store = InMemoryStore::new();
        store
            .upsert(&[record("a", 1, vec![1.0]), record("a", 2, vec![0.5])])
            .await
            .unwrap();
        assert_eq!(store.query(&[1.0], 10).await.unwrap().len(), 2);
        assert!(store.query(&[1.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_query_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.query(&[1.0, 2.0], 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejects_whole_batch() {
        let store = InMemoryStore::new();
        store.upsert(&[record("a", 1, vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .upsert(&[record("b", 1, vec![1.0, 0.0]), record("b", 2, vec![1.0])])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PagewiseError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(store.count(None).await.unwrap(), 1);
        assert_eq!(store.count(Some("b")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pinned_dims_reject_query() {
        let store = InMemoryStore::with_dims(3);
        assert_eq!(store.dims(), Some(3));
        assert!(matches!(
            store.query(&[1.0], 1).await,
            Err(PagewiseError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_reupsert_appends_duplicates() {
        let store = InMemoryStore::new();
        let batch = vec![record("a", 1, vec![1.0]), record("a", 2, vec![0.5])];
        store.upsert(&batch).await.unwrap();
        store.upsert(&batch).await.unwrap();
        assert_eq!(store.count(Some("a")).await.unwrap(), 4);
        assert_eq!(
            store.source_counts().await.unwrap(),
            vec![("a".to_string(), 4)]
        );
    }
}
