//! Page-bounded chunker.
//!
//! Turns a [`RawDocument`] into one [`Chunk`] per non-blank page. Page
//! boundaries come from the source adapter; the chunker never merges or
//! splits pages. Each chunk carries a SHA-256 hash of its normalized text.

use sha2::{Digest, Sha256};

use crate::error::{PagewiseError, Result};
use crate::models::{Chunk, RawDocument};
use crate::normalize::normalize;

/// Split a document into ordered chunks, one per non-blank page.
///
/// Ordinals start at 1 and count only the pages that survive
/// normalization, so they are always contiguous.
///
/// # Errors
///
/// - [`PagewiseError::EmptyDocument`] when every page normalizes to empty text.
/// - [`PagewiseError::InvalidArgument`] when the document has more than
///   `u32::MAX` non-blank pages.
pub fn chunk_document(document: &RawDocument) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for content in document
        .segments
        .iter()
        .map(|segment| normalize(segment))
        .filter(|content| !content.is_empty())
    {
        let ordinal = u32::try_from(chunks.len() + 1).map_err(|_| {
            PagewiseError::InvalidArgument(format!(
                "document '{}' has more pages than ordinals can number",
                document.source_id
            ))
        })?;
        chunks.push(make_chunk(&document.source_id, ordinal, content));
    }

    if chunks.is_empty() {
        return Err(PagewiseError::EmptyDocument {
            source_id: document.source_id.clone(),
        });
    }

    Ok(chunks)
}

/// Hex-encoded SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(source_id: &str, ordinal: u32, content: String) -> Chunk {
    Chunk {
        source_id: source_id.to_string(),
        ordinal,
        hash: content_hash(&content),
        content,
    }
}
