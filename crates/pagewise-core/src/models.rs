//! Core data models that flow through the ingestion and retrieval pipeline.

use std::fmt;

use serde::Serialize;

/// Raw page text produced by a source adapter before normalization.
///
/// `segments` are in source order, one entry per page (PDF) or segment
/// (README section, form-feed page). Blank segments are allowed here and
/// are dropped by the chunker.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub source_id: String,
    pub segments: Vec<String>,
}

impl RawDocument {
    pub fn new<I, S>(source_id: impl Into<String>, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_id: source_id.into(),
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}

/// A normalized, non-empty unit of text with a stable position in its document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub source_id: String,
    /// 1-based position among the document's kept pages.
    pub ordinal: u32,
    pub content: String,
    /// SHA-256 of `content`, hex encoded.
    pub hash: String,
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn dims(&self) -> usize {
        self.vector.len()
    }
}

/// One ranked hit from [`VectorStore::query`](crate::store::VectorStore::query).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub source_id: String,
    pub ordinal: u32,
    pub content: String,
    /// Cosine similarity; higher is more similar.
    pub score: f32,
}

/// Ranked result contents joined into one grounding block for a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContextBlock(String);

impl ContextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirmation returned to the caller after a document is fully stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub source_id: String,
    pub first_chunk_content: String,
    pub first_chunk_vector: Vec<f32>,
    pub chunk_count: usize,
}

/// Lifecycle of a single document inside the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Received,
    Chunked,
    Embedded,
    Stored,
    Failed,
}
