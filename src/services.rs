//! Process-wide resources built once at startup.
//!
//! [`Services`] owns the embedding client and the vector store handle,
//! both wrapped in the retry decorator. Commands borrow it to build
//! pipelines; nothing is re-created per request. Call
//! [`shutdown`](Services::shutdown) before exiting so the store can flush
//! and close its connections.

use std::sync::Arc;

use anyhow::Result;
use pagewise_core::embedding::Embedder;
use pagewise_core::ingest::IngestPipeline;
use pagewise_core::retrieve::ContextAssembler;
use pagewise_core::store::VectorStore;
use tracing::debug;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::retry::{RetryPolicy, Retrying};
use crate::store::open_store;

pub struct Services {
    pub config: Config,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<dyn VectorStore>,
}

impl Services {
    /// Build the configured embedder and store, each behind [`Retrying`].
    pub async fn start(config: Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let store = open_store(&config, embedder.model_name()).await?;
        Ok(Self::from_parts(config, embedder, store))
    }

    /// Assemble services from existing handles, applying the configured retry policy.
    pub fn from_parts(
        config: Config,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let policy = RetryPolicy::from_config(&config.retry);
        debug!(?policy, "retry policy");
        Self {
            embedder: Arc::new(Retrying::new(embedder, policy.clone())),
            store: Arc::new(Retrying::new(store, policy)),
            config,
        }
    }

    pub fn ingest_pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(Arc::clone(&self.embedder), Arc::clone(&self.store))
    }

    pub fn assembler(&self) -> ContextAssembler {
        ContextAssembler::new(Arc::clone(&self.embedder), Arc::clone(&self.store))
            .with_max_chars(self.config.retrieval.max_context_chars)
    }

    pub async fn shutdown(self) {
        self.store.close().await;
    }
}
