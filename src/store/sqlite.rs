//! SQLite-backed [`VectorStore`].
//!
//! Records are rows in a `records` table with the vector stored as a
//! little-endian f32 BLOB. Query is brute-force cosine similarity over
//! every row, scanned in insertion order (`seq`) so the stable ranking in
//! [`rank_candidates`] breaks ties earliest-first.
//!
//! The collection is pinned to the embedding model and vector dimension in
//! the single-row `collection` table: at open when the dimension is
//! configured, otherwise by the first write. Re-ingesting a document
//! inserts its chunks again; nothing is deduplicated.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use anyhow::Context;
use async_trait::async_trait;
use pagewise_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use pagewise_core::models::{EmbeddingRecord, RetrievalResult};
use pagewise_core::store::{check_dimensions, check_query_dimensions, rank_candidates, VectorStore};
use pagewise_core::{PagewiseError, Result};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::db;
use crate::migrate;

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
    model: String,
    dims: OnceLock<usize>,
    /// Whether the `collection` row exists in the database.
    pinned_in_db: AtomicBool,
}

impl SqliteStore {
    /// Open the database at `path`, creating the schema if needed, and bind
    /// the collection to `model`.
    ///
    /// # Errors
    ///
    /// Besides I/O and SQL failures, returns [`PagewiseError::ModelMismatch`]
    /// or [`PagewiseError::DimensionMismatch`] (wrapped in `anyhow`) when the
    /// collection was created by a different model or dimension.
    pub async fn open(path: &Path, model: &str, dims: Option<usize>) -> anyhow::Result<Self> {
        let pool = db::connect(path)
            .await
            .with_context(|| format!("Failed to open vector store at {}", path.display()))?;
        migrate::run_migrations(&pool).await?;
        Ok(Self::with_pool(pool, model, dims).await?)
    }

    /// Bind an already-migrated pool to `model`.
    ///
    /// An unpinned collection is pinned to `(model, dims)` right away when
    /// `dims` is known; otherwise the first write pins it.
    pub async fn with_pool(pool: SqlitePool, model: &str, dims: Option<usize>) -> Result<Self> {
        let dims = match read_pin(&pool).await? {
            Some((pinned_model, pinned_dims)) => {
                verify_pin(&pinned_model, pinned_dims, model, dims)?;
                Some(pinned_dims)
            }
            None => match dims {
                Some(d) => {
                    let (pinned_model, pinned_dims) = pin(&pool, model, d).await?;
                    verify_pin(&pinned_model, pinned_dims, model, Some(d))?;
                    Some(pinned_dims)
                }
                None => None,
            },
        };

        let cell = OnceLock::new();
        if let Some(d) = dims {
            let _ = cell.set(d);
        }
        Ok(Self {
            pool,
            model: model.to_string(),
            dims: cell,
            pinned_in_db: AtomicBool::new(dims.is_some()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

async fn read_pin<'e, E>(executor: E) -> Result<Option<(String, usize)>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT model, dims FROM collection WHERE id = 1")
            .fetch_optional(executor)
            .await
            .map_err(store_error)?;
    Ok(row.map(|(model, dims)| (model, dims as usize)))
}

/// Insert the collection row unless one exists, and return whatever is pinned.
async fn pin(pool: &SqlitePool, model: &str, dims: usize) -> Result<(String, usize)> {
    let mut tx = pool.begin().await.map_err(store_error)?;
    insert_pin(&mut tx, model, dims).await?;
    let pinned = read_pin(&mut *tx)
        .await?
        .ok_or_else(|| PagewiseError::StoreRejected("collection row missing after insert".into()))?;
    tx.commit().await.map_err(store_error)?;
    debug!(model = %pinned.0, dims = pinned.1, "collection pinned");
    Ok(pinned)
}

async fn insert_pin(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    model: &str,
    dims: usize,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO collection (id, model, dims, created_at) VALUES (1, ?, ?, ?)")
        .bind(model)
        .bind(dims as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut **tx)
        .await
        .map_err(store_error)?;
    Ok(())
}

fn verify_pin(
    pinned_model: &str,
    pinned_dims: usize,
    model: &str,
    dims: Option<usize>,
) -> Result<()> {
    if pinned_model != model {
        return Err(PagewiseError::ModelMismatch {
            expected: pinned_model.to_string(),
            actual: model.to_string(),
        });
    }
    if let Some(actual) = dims.filter(|d| *d != pinned_dims) {
        return Err(PagewiseError::DimensionMismatch {
            expected: pinned_dims,
            actual,
        });
    }
    Ok(())
}

/// Map a sqlx error to the store taxonomy: connectivity problems are
/// retryable, everything else is a rejection.
fn store_error(e: sqlx::Error) -> PagewiseError {
    let unavailable = match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("locked") || msg.contains("busy")
        }
        _ => false,
    };
    if unavailable {
        PagewiseError::StoreUnavailable(e.to_string())
    } else {
        PagewiseError::StoreRejected(e.to_string())
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    fn dims(&self) -> Option<usize> {
        self.dims.get().copied()
    }

    async fn upsert(&self, records: &[EmbeddingRecord]) -> Result<()> {
        let pinned = self.dims.get().copied();
        let Some(batch_dims) = check_dimensions(pinned, records)? else {
            return Ok(());
        };
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(store_error)?;

        if !self.pinned_in_db.load(Ordering::Acquire) {
            // Another writer may have pinned the collection first
            insert_pin(&mut tx, &self.model, batch_dims).await?;
            let (model, dims) = read_pin(&mut *tx).await?.ok_or_else(|| {
                PagewiseError::StoreRejected("collection row missing after insert".into())
            })?;
            verify_pin(&model, dims, &self.model, Some(batch_dims))?;
        }

        let now = chrono::Utc::now().timestamp();
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, source_id, ordinal, content, hash, vector, ingested_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.chunk.source_id)
            .bind(record.chunk.ordinal as i64)
            .bind(&record.chunk.content)
            .bind(&record.chunk.hash)
            .bind(vec_to_blob(&record.vector))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        let _ = self.dims.set(batch_dims);
        self.pinned_in_db.store(true, Ordering::Release);
        debug!(records = records.len(), dims = batch_dims, "sqlite upsert committed");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        check_query_dimensions(self.dims(), vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT source_id, ordinal, content, vector FROM records ORDER BY seq")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("vector").map_err(store_error)?;
            let ordinal: i64 = row.try_get("ordinal").map_err(store_error)?;
            candidates.push(RetrievalResult {
                source_id: row.try_get("source_id").map_err(store_error)?,
                ordinal: ordinal as u32,
                content: row.try_get("content").map_err(store_error)?,
                score: cosine_similarity(vector, &blob_to_vec(&blob)),
            });
        }

        Ok(rank_candidates(candidates, k))
    }

    async fn count(&self, source_id: Option<&str>) -> Result<usize> {
        let count: i64 = match source_id {
            Some(id) => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM records WHERE source_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await,
            None => sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM records")
                .fetch_one(&self.pool)
                .await,
        }
        .map_err(store_error)?;
        Ok(count as usize)
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source_id, COUNT(*) FROM records GROUP BY source_id ORDER BY source_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|(source, count)| (source, count as usize))
            .collect())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
