//! End-to-end tests through the library API: configuration, services with
//! retries, the SQLite store, ingestion and context retrieval.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pagewise::config::{parse_config, Config};
use pagewise::ingest::{ingest_paths, FileOutcome};
use pagewise::services::Services;
use pagewise::store::sqlite::SqliteStore;
use pagewise_core::embedding::Embedder;
use pagewise_core::models::{EmbeddingRecord, RawDocument, RetrievalResult};
use pagewise_core::store::VectorStore;
use pagewise_core::{IngestStage, PagewiseError};
use tempfile::TempDir;

const AXES: [&str; 3] = ["rust", "python", "deploy"];

/// Deterministic embedder: one axis per keyword, counted case-insensitively.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }
    fn dims(&self) -> usize {
        AXES.len()
    }
    async fn embed_batch(&self, texts: &[String]) -> pagewise_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }
}

fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    AXES.iter()
        .map(|axis| lower.matches(axis).count() as f32 + 0.01)
        .collect()
}

/// Fails the first `failures` calls with a transient error.
struct FlakyEmbedder {
    failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn model_name(&self) -> &str {
        "keyword-test"
    }
    fn dims(&self) -> usize {
        AXES.len()
    }
    async fn embed_batch(&self, texts: &[String]) -> pagewise_core::Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(PagewiseError::TransientEmbedding("model overloaded".to_string()));
        }
        KeywordEmbedder.embed_batch(texts).await
    }
}

/// A store whose backend is never reachable.
struct DownStore {
    queries: AtomicUsize,
}

#[async_trait]
impl VectorStore for DownStore {
    fn backend_name(&self) -> &str {
        "down"
    }
    fn dims(&self) -> Option<usize> {
        None
    }
    async fn upsert(&self, _records: &[EmbeddingRecord]) -> pagewise_core::Result<()> {
        Err(PagewiseError::StoreUnavailable("connection refused".to_string()))
    }
    async fn query(&self, _vector: &[f32], _k: usize) -> pagewise_core::Result<Vec<RetrievalResult>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Err(PagewiseError::StoreUnavailable("connection refused".to_string()))
    }
    async fn count(&self, _source_id: Option<&str>) -> pagewise_core::Result<usize> {
        Err(PagewiseError::StoreUnavailable("connection refused".to_string()))
    }
    async fn source_counts(&self) -> pagewise_core::Result<Vec<(String, usize)>> {
        Err(PagewiseError::StoreUnavailable("connection refused".to_string()))
    }
}

fn test_config(root: &Path) -> Config {
    parse_config(&format!(
        r#"
[store]
backend = "sqlite"
path = "{}/pagewise.sqlite"

[embedding]
provider = "disabled"

[retry]
max_attempts = 3
base_delay_ms = 1
max_delay_ms = 2

[retrieval]
top_k = 3
"#,
        root.display()
    ))
    .unwrap()
}

async fn sqlite_services(root: &Path, embedder: Arc<dyn Embedder>) -> Services {
    let config = test_config(root);
    let store = SqliteStore::open(&config.store.path, embedder.model_name(), None)
        .await
        .unwrap();
    Services::from_parts(config, embedder, Arc::new(store))
}

#[tokio::test]
async fn ingest_normalizes_pages_into_ordered_chunks() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;

    let doc = RawDocument::new("doc1", ["Hello\nworld", "  Second   page  "]);
    let summary = services.ingest_pipeline().ingest(&doc).await.unwrap();

    assert_eq!(summary.source_id, "doc1");
    assert_eq!(summary.chunk_count, 2);
    assert_eq!(summary.first_chunk_content, "Hello world");
    assert_eq!(summary.first_chunk_vector.len(), 3);
    assert_eq!(services.store.count(Some("doc1")).await.unwrap(), 2);
    assert_eq!(services.store.dims(), Some(3));

    services.shutdown().await;
}

#[tokio::test]
async fn retrieval_ranks_across_documents() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;
    let pipeline = services.ingest_pipeline();

    pipeline
        .ingest(&RawDocument::new(
            "doc1",
            [
                "Rust ownership and rust borrowing",
                "Python notebooks",
                "How to deploy a service",
            ],
        ))
        .await
        .unwrap();
    pipeline
        .ingest(&RawDocument::new(
            "doc2",
            ["Rust async runtimes", "Python packaging"],
        ))
        .await
        .unwrap();
    assert_eq!(services.store.count(None).await.unwrap(), 5);

    let (context, results) = services
        .assembler()
        .retrieve_context("rust", 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    let top_sources: Vec<&str> = results[..2].iter().map(|r| r.source_id.as_str()).collect();
    assert!(top_sources.contains(&"doc1"));
    assert!(top_sources.contains(&"doc2"));
    assert!(context.as_str().starts_with(&results[0].content));
    assert!(context
        .as_str()
        .contains(pagewise_core::retrieve::CONTEXT_SEPARATOR));

    services.shutdown().await;
}

#[tokio::test]
async fn reingesting_appends_duplicate_records() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;
    let pipeline = services.ingest_pipeline();
    let doc = RawDocument::new("doc1", ["one", "two", "three"]);

    pipeline.ingest(&doc).await.unwrap();
    let before = services.store.count(None).await.unwrap();
    pipeline.ingest(&doc).await.unwrap();
    let after = services.store.count(None).await.unwrap();

    assert_eq!(before, 3);
    assert_eq!(after, before + 3);

    services.shutdown().await;
}

#[tokio::test]
async fn empty_store_yields_empty_context() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;

    let (context, results) = services
        .assembler()
        .retrieve_context("anything about rust", 3)
        .await
        .unwrap();
    assert!(context.is_empty());
    assert!(results.is_empty());

    services.shutdown().await;
}

#[tokio::test]
async fn non_positive_k_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;

    for k in [0, -2] {
        let err = services
            .assembler()
            .retrieve_context("rust", k)
            .await
            .unwrap_err();
        assert!(matches!(err, PagewiseError::InvalidArgument(_)));
    }

    services.shutdown().await;
}

#[tokio::test]
async fn transient_embedding_failures_are_retried() {
    let tmp = TempDir::new().unwrap();
    let flaky = Arc::new(FlakyEmbedder {
        failures: 2,
        calls: AtomicUsize::new(0),
    });
    let services = sqlite_services(tmp.path(), flaky.clone()).await;

    let summary = services
        .ingest_pipeline()
        .ingest(&RawDocument::new("doc1", ["rust"]))
        .await
        .unwrap();
    assert_eq!(summary.chunk_count, 1);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);

    services.shutdown().await;
}

#[tokio::test]
async fn exhausted_retries_report_embedding_stage() {
    let tmp = TempDir::new().unwrap();
    let flaky = Arc::new(FlakyEmbedder {
        failures: 10,
        calls: AtomicUsize::new(0),
    });
    let services = sqlite_services(tmp.path(), flaky.clone()).await;

    let err = services
        .ingest_pipeline()
        .ingest(&RawDocument::new("doc1", ["rust"]))
        .await
        .unwrap_err();
    assert_eq!(err.stage, IngestStage::Embedding);
    assert!(err.is_retryable());
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    assert_eq!(services.store.count(None).await.unwrap(), 0);

    services.shutdown().await;
}

#[tokio::test]
async fn unavailable_store_is_an_error_not_an_empty_context() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(DownStore {
        queries: AtomicUsize::new(0),
    });
    let services = Services::from_parts(test_config(tmp.path()), Arc::new(KeywordEmbedder), store.clone());

    for query in ["rust", "   "] {
        let err = services
            .assembler()
            .retrieve_context(query, 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PagewiseError::StoreUnavailable(_)), "query {:?}", query);
    }
    assert_eq!(store.queries.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn store_failure_reports_storing_stage() {
    let tmp = TempDir::new().unwrap();
    let store = Arc::new(DownStore {
        queries: AtomicUsize::new(0),
    });
    let services = Services::from_parts(test_config(tmp.path()), Arc::new(KeywordEmbedder), store);

    let err = services
        .ingest_pipeline()
        .ingest(&RawDocument::new("doc1", ["rust"]))
        .await
        .unwrap_err();
    assert_eq!(err.stage, IngestStage::Storing);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn directory_ingest_reports_each_file() {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("docs");
    std::fs::create_dir_all(&docs).unwrap();
    std::fs::write(docs.join("guide.md"), "Rust guide\x0CDeploy guide").unwrap();
    std::fs::write(docs.join("notes.txt"), "python notes").unwrap();
    std::fs::write(docs.join("blank.txt"), "   \n\n ").unwrap();
    std::fs::write(docs.join("image.png"), [0u8, 1, 2]).unwrap();

    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;
    let outcomes = ingest_paths(&services, &[docs], Some(2)).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    let mut ingested: Vec<(String, usize)> = outcomes
        .iter()
        .filter_map(|o| match o {
            FileOutcome::Ingested(s) => Some((s.source_id.clone(), s.chunk_count)),
            _ => None,
        })
        .collect();
    ingested.sort();
    assert_eq!(
        ingested,
        vec![("guide.md".to_string(), 2), ("notes.txt".to_string(), 1)]
    );

    let failed: Vec<&FileOutcome> = outcomes.iter().filter(|o| !o.is_success()).collect();
    assert_eq!(failed.len(), 1);
    match failed[0] {
        FileOutcome::Failed(e) => {
            assert_eq!(e.source_id, "blank.txt");
            assert_eq!(e.stage, IngestStage::Chunking);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    let counts = services.store.source_counts().await.unwrap();
    assert_eq!(
        counts,
        vec![("guide.md".to_string(), 2), ("notes.txt".to_string(), 1)]
    );

    services.shutdown().await;
}

#[tokio::test]
async fn reopening_with_another_model_is_refused() {
    let tmp = TempDir::new().unwrap();
    let services = sqlite_services(tmp.path(), Arc::new(KeywordEmbedder)).await;
    services
        .ingest_pipeline()
        .ingest(&RawDocument::new("doc1", ["rust"]))
        .await
        .unwrap();
    let path = services.config.store.path.clone();
    services.shutdown().await;

    let err = SqliteStore::open(&path, "another-model", None)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<PagewiseError>(),
        Some(PagewiseError::ModelMismatch { .. })
    ));
}

#[tokio::test]
async fn configured_store_rejects_another_model_after_restart() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.store.dims = Some(3);

    let store = pagewise::store::open_store(&config, "keyword-test").await.unwrap();
    let services = Services::from_parts(config.clone(), Arc::new(KeywordEmbedder), store);
    services
        .ingest_pipeline()
        .ingest(&RawDocument::new("doc1", ["rust"]))
        .await
        .unwrap();
    services.shutdown().await;

    let err = pagewise::store::open_store(&config, "another-model")
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<PagewiseError>(),
        Some(PagewiseError::ModelMismatch { .. })
    ));

    config.store.dims = Some(2);
    let err = pagewise::store::open_store(&config, "keyword-test")
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<PagewiseError>(),
        Some(PagewiseError::DimensionMismatch { expected: 3, actual: 2 })
    ));
}
