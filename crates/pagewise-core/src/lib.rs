//! # Pagewise Core
//!
//! Runtime-agnostic logic for Pagewise: data models, text normalization,
//! page chunking, the embedding and vector store traits, the ingestion
//! pipeline, and retrieval-context assembly.
//!
//! This crate performs no network or filesystem I/O of its own. Concrete
//! embedding providers and persistent stores live in the `pagewise` app
//! crate and plug in through [`embedding::Embedder`] and
//! [`store::VectorStore`].
//!
//! ```text
//! RawDocument ─▶ normalize ─▶ chunk ─▶ Embedder ─▶ VectorStore::upsert
//! query text  ─▶ Embedder ─▶ VectorStore::query ─▶ ContextBlock
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod retrieve;
pub mod store;

pub use error::{IngestError, IngestStage, PagewiseError, Result};
