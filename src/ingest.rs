//! Ingestion commands.
//!
//! `ingest` resolves paths into files, extracts each one on the blocking
//! pool and pushes the resulting documents through the core pipeline with
//! bounded concurrency. One file failing never stops the others; the
//! command reports every outcome and fails at the end if any file did.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use pagewise_core::models::IngestSummary;
use pagewise_core::IngestError;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::connector_fs;
use crate::connector_github;
use crate::services::Services;

/// Outcome of ingesting one file.
#[derive(Debug)]
pub enum FileOutcome {
    Ingested(IngestSummary),
    /// Rejected by the pipeline at a known stage.
    Failed(IngestError),
    /// The file could not be read or extracted.
    Unreadable { path: PathBuf, reason: String },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Ingested(_))
    }
}

/// Ingest every supported file under `paths`.
///
/// `concurrency` overrides `ingest.concurrency` from the config.
pub async fn ingest_paths(
    services: &Services,
    paths: &[PathBuf],
    concurrency: Option<usize>,
) -> Result<Vec<FileOutcome>> {
    let files = connector_fs::collect_files(paths, &services.config.ingest.include_extensions)?;
    let limit = concurrency
        .unwrap_or(services.config.ingest.concurrency)
        .max(1);
    info!(files = files.len(), concurrency = limit, "starting ingest");

    let pipeline = services.ingest_pipeline();
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let pipeline = pipeline.clone();
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        index,
                        FileOutcome::Unreadable {
                            path,
                            reason: "ingest cancelled".to_string(),
                        },
                    )
                }
            };

            let load_path = path.clone();
            let loaded =
                tokio::task::spawn_blocking(move || connector_fs::load_document(&load_path)).await;
            let document = match loaded {
                Ok(Ok(document)) => document,
                Ok(Err(e)) => {
                    return (
                        index,
                        FileOutcome::Unreadable {
                            path,
                            reason: format!("{:#}", e),
                        },
                    )
                }
                Err(e) => {
                    return (
                        index,
                        FileOutcome::Unreadable {
                            path,
                            reason: e.to_string(),
                        },
                    )
                }
            };

            debug!(path = %path.display(), pages = document.segments.len(), "extracted");
            let outcome = match pipeline.ingest(&document).await {
                Ok(summary) => FileOutcome::Ingested(summary),
                Err(e) => FileOutcome::Failed(e),
            };
            (index, outcome)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(pair) => outcomes.push(pair),
            Err(e) => error!(error = %e, "ingest task panicked"),
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Run the `ingest` command and print a per-file report.
pub async fn run_ingest(
    services: &Services,
    paths: &[PathBuf],
    concurrency: Option<usize>,
) -> Result<()> {
    let outcomes = ingest_paths(services, paths, concurrency).await?;
    if outcomes.is_empty() {
        bail!("No supported files found");
    }

    let mut failed = 0;
    for outcome in &outcomes {
        report(outcome);
        if !outcome.is_success() {
            failed += 1;
        }
    }

    println!();
    println!(
        "ingested {} of {} files",
        outcomes.len() - failed,
        outcomes.len()
    );
    if failed > 0 {
        bail!("{} file(s) failed to ingest", failed);
    }
    println!("ok");
    Ok(())
}

/// Run the `ingest-readme` command for one GitHub repository.
pub async fn run_ingest_readme(services: &Services, repo: &str) -> Result<()> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("pagewise/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let document = connector_github::fetch_readme(&client, &services.config.github, repo).await?;
    let outcome = match services.ingest_pipeline().ingest(&document).await {
        Ok(summary) => FileOutcome::Ingested(summary),
        Err(e) => FileOutcome::Failed(e),
    };
    report(&outcome);
    match outcome {
        FileOutcome::Failed(e) => Err(e.into()),
        _ => {
            println!("ok");
            Ok(())
        }
    }
}

fn report(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Ingested(summary) => {
            println!("{}", summary.source_id);
            println!("  chunks: {}", summary.chunk_count);
            println!("  dims: {}", summary.first_chunk_vector.len());
            println!("  first chunk: {}", preview(&summary.first_chunk_content, 60));
        }
        FileOutcome::Failed(e) => {
            println!("{}", e.source_id);
            println!("  failed at {}: {}", e.stage, e.source);
            if e.is_retryable() {
                println!("  (transient; retrying later may succeed)");
            }
        }
        FileOutcome::Unreadable { path, reason } => {
            println!("{}", path.display());
            println!("  unreadable: {}", reason);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 2), "éé...");
    }
}
