//! Retry-with-backoff decorator for embedding and store handles.
//!
//! [`Retrying`] wraps any [`Embedder`] or [`VectorStore`] and re-runs a
//! call while it fails with a retryable error
//! ([`PagewiseError::is_retryable`]), sleeping an exponentially growing
//! delay between attempts. Permanent errors return immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagewise_core::embedding::Embedder;
use pagewise_core::models::{EmbeddingRecord, RetrievalResult};
use pagewise_core::store::VectorStore;
use pagewise_core::Result;
use tracing::{debug, warn};

use crate::config::RetryConfig;

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before retry number `retry` (1-based): `base × 2^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Run `operation` until it succeeds, fails permanently, or exhausts the policy.
///
/// The last error is returned unmodified so callers still see the
/// original taxonomy.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(label, attempts = attempt, error = %e, "retry budget exhausted");
                }
                return Err(e);
            }
        }
    }
}

/// Decorator applying a [`RetryPolicy`] to every call of the wrapped handle.
pub struct Retrying<T: ?Sized> {
    inner: Arc<T>,
    policy: RetryPolicy,
}

impl<T: ?Sized> Retrying<T> {
    pub fn new(inner: Arc<T>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Retrying<T> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dims(&self) -> usize {
        self.inner.dims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = &self.inner;
        retry(&self.policy, "embed_batch", move || inner.embed_batch(texts)).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let inner = &self.inner;
        retry(&self.policy, "embed", move || inner.embed(text)).await
    }
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for Retrying<T> {
    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    fn dims(&self) -> Option<usize> {
        self.inner.dims()
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let inner = &self.inner;
        retry(&self.policy, "store.upsert", move || inner.upsert(records)).await
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        let inner = &self.inner;
        retry(&self.policy, "store.query", move || inner.query(vector, k)).await
    }

    async fn count(&self, source_id: Option<&str>) -> Result<usize> {
        let inner = &self.inner;
        retry(&self.policy, "store.count", move || inner.count(source_id)).await
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        let inner = &self.inner;
        retry(&self.policy, "store.source_counts", move || inner.source_counts()).await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
