//! Vector store backends and configuration-driven selection.
//!
//! | `store.backend` | Backend |
//! |-----------------|---------|
//! | `"sqlite"` | [`SqliteStore`](sqlite::SqliteStore), persistent, file at `store.path` |
//! | `"memory"` | [`InMemoryStore`], process-local |

pub mod sqlite;

use std::sync::Arc;

use anyhow::{bail, Result};
use pagewise_core::store::memory::InMemoryStore;
use pagewise_core::store::VectorStore;
use tracing::{info, warn};

use crate::config::Config;

/// Open the configured backend, bound to the embedding model `model`.
pub async fn open_store(config: &Config, model: &str) -> Result<Arc<dyn VectorStore>> {
    let dims = config.store.dims.or(config.embedding.dims);
    match config.store.backend.as_str() {
        "sqlite" => {
            let store = sqlite::SqliteStore::open(&config.store.path, model, dims).await?;
            info!(
                path = %config.store.path.display(),
                model,
                dims = ?store.dims(),
                "opened sqlite vector store"
            );
            Ok(Arc::new(store))
        }
        "memory" => {
            warn!("using in-memory vector store; records are lost when the process exits");
            Ok(Arc::new(match dims {
                Some(d) => InMemoryStore::with_dims(d),
                None => InMemoryStore::new(),
            }))
        }
        other => bail!("Unknown store backend: {}", other),
    }
}
