//! # Pagewise
//!
//! Document ingestion and retrieval for retrieval-augmented generation.
//!
//! Documents (PDFs, text and markdown files, GitHub READMEs) are split into
//! page-level chunks, embedded with a configured model and stored in a
//! vector store. Questions are embedded with the same model and answered
//! with a context block built from the most similar chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌──────────────┐
//! │   Sources    │──▶│ Normalize, Chunk,    │──▶│ Vector store │
//! │ fs / GitHub  │   │ Embed (retrying)     │   │ SQLite / mem │
//! └──────────────┘   └──────────────────────┘   └──────┬───────┘
//!                                                      │
//!                    ┌─────────────────────────────────┘
//!                    ▼
//!             ┌──────────────┐
//!             │   Context    │  top-k by cosine similarity
//!             │  assembler   │
//!             └──────────────┘
//! ```
//!
//! The domain logic lives in the `pagewise-core` crate; this crate adds
//! configuration, concrete embedding providers and stores, retries, source
//! adapters and the CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`services`] | Embedder and store built once per process |
//! | [`embedding`] | Ollama, OpenAI and local embedding providers |
//! | [`store`] | Backend selection; SQLite vector store |
//! | [`retry`] | Exponential backoff for transient failures |
//! | [`extract`] | PDF and text page extraction |
//! | [`connector_fs`] | Filesystem source adapter |
//! | [`connector_github`] | GitHub README source adapter |
//! | [`ingest`], [`query`], [`stats`] | CLI commands |
//! | [`db`], [`migrate`] | SQLite connection and schema |
//! | [`logging`] | `tracing` subscriber setup |

pub mod config;
pub mod connector_fs;
pub mod connector_github;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod query;
pub mod retry;
pub mod services;
pub mod stats;
pub mod store;
