//! Retrieval and context assembly.
//!
//! Embeds a query, asks the store for the `k` nearest chunks, and joins
//! their contents into a [`ContextBlock`] in exactly the order the store
//! ranked them. The raw results come back alongside the block so callers
//! can show provenance (source, page, score) without querying again.

use std::sync::Arc;

use tracing::info;

use crate::embedding::Embedder;
use crate::error::{PagewiseError, Result};
use crate::models::{ContextBlock, RetrievalResult};
use crate::store::VectorStore;

/// Delimiter placed between consecutive passages in a [`ContextBlock`].
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Embedder → store query → ranked context block.
#[derive(Clone)]
pub struct ContextAssembler {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    max_chars: Option<usize>,
}

impl ContextAssembler {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            max_chars: None,
        }
    }

    /// Cap the assembled block at `max_chars` characters, separators included.
    pub fn with_max_chars(mut self, max_chars: Option<usize>) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Retrieve the `k` best passages for `query` and assemble them.
    ///
    /// A store with no relevant data yields an empty block and no results;
    /// an unreachable store is an error, never an empty block. Every query,
    /// blank or not, is embedded and sent to the store.
    ///
    /// # Errors
    ///
    /// - [`PagewiseError::InvalidArgument`] when `k <= 0`.
    /// - Embedding and store errors, unmodified.
    pub async fn retrieve_context(
        &self,
        query: &str,
        k: i64,
    ) -> Result<(ContextBlock, Vec<RetrievalResult>)> {
        if k <= 0 {
            return Err(PagewiseError::InvalidArgument(format!(
                "k must be greater than 0, got {}",
                k
            )));
        }
        let vector = self.embedder.embed(query).await?;
        let results = self.store.query(&vector, k as usize).await?;
        let (block, results) = assemble(results, self.max_chars);
        info!(
            k,
            results = results.len(),
            context_len = block.len(),
            "context assembled"
        );
        Ok((block, results))
    }
}

/// Join ranked results into a context block, preserving their order.
///
/// With `max_chars`, assembly stops before the first passage that would
/// push the block past the cap, counted in Unicode scalar values; the
/// returned results are exactly the ones in the block.
pub fn assemble(
    results: Vec<RetrievalResult>,
    max_chars: Option<usize>,
) -> (ContextBlock, Vec<RetrievalResult>) {
    let separator_chars = CONTEXT_SEPARATOR.chars().count();
    let mut block = String::new();
    let mut block_chars = 0;
    let mut kept = Vec::with_capacity(results.len());

    for result in results {
        let content_chars = result.content.chars().count();
        let extra = if block.is_empty() {
            content_chars
        } else {
            separator_chars + content_chars
        };
        if let Some(cap) = max_chars {
            if block_chars + extra > cap {
                break;
            }
        }
        block_chars += extra;
        if !block.is_empty() {
            block.push_str(CONTEXT_SEPARATOR);
        }
        block.push_str(&result.content);
        kept.push(result);
    }

    (ContextBlock::new(block), kept)
}
