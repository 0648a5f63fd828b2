//! Embedding client trait and vector utilities.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus pure helpers for batch validation, vector serialization, and
//! similarity computation.
//!
//! Concrete providers (Ollama, OpenAI, fastembed) live in the `pagewise`
//! app crate.

use async_trait::async_trait;

use crate::error::{PagewiseError, Result};

/// Maps text to fixed-dimension vectors through an external model.
///
/// Implementations must be deterministic for a fixed model version and
/// must report failures with the retryable/permanent split of
/// [`PagewiseError`]: network-class failures as
/// [`TransientEmbedding`](PagewiseError::TransientEmbedding), everything
/// else as [`PermanentEmbedding`](PagewiseError::PermanentEmbedding).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding dimensionality (e.g. `768`).
    fn dims(&self) -> usize;

    /// Embed a batch of texts.
    ///
    /// Output is in input order with one vector per input. A permanent
    /// failure on any text fails the whole batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.into_iter().next().ok_or_else(|| {
            PagewiseError::PermanentEmbedding("empty embedding response".to_string())
        })
    }
}

/// Check a provider's batch output against the request.
///
/// Rejects a response whose length differs from `expected_len`, any vector
/// whose length differs from `dims` (skipped when `dims` is 0, meaning the
/// provider does not know its dimension up front), and non-finite values.
pub fn validate_batch(vectors: &[Vec<f32>], expected_len: usize, dims: usize) -> Result<()> {
    if vectors.len() != expected_len {
        return Err(PagewiseError::PermanentEmbedding(format!(
            "expected {} vectors, model returned {}",
            expected_len,
            vectors.len()
        )));
    }
    for (i, v) in vectors.iter().enumerate() {
        if dims > 0 && v.len() != dims {
            return Err(PagewiseError::PermanentEmbedding(format!(
                "vector {} has {} dimensions, model is configured for {}",
                i,
                v.len(),
                dims
            )));
        }
        if v.is_empty() {
            return Err(PagewiseError::PermanentEmbedding(format!(
                "vector {} is empty",
                i
            )));
        }
        if v.iter().any(|x| !x.is_finite()) {
            return Err(PagewiseError::PermanentEmbedding(format!(
                "vector {} contains non-finite values",
                i
            )));
        }
    }
    Ok(())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use pagewise_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, and zero-magnitude vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
