//! The `query` command: retrieve a context block for a question.

use anyhow::Result;
use pagewise_core::models::{ContextBlock, RetrievalResult};
use serde::Serialize;

use crate::services::Services;

/// JSON shape printed by `query --json`.
#[derive(Debug, Serialize)]
pub struct QueryResponse<'a> {
    pub query: &'a str,
    pub k: i64,
    pub context: &'a ContextBlock,
    pub results: &'a [RetrievalResult],
}

/// Retrieve and print context for `text`.
///
/// `k` defaults to `retrieval.top_k`. Invalid `k` and backend failures
/// surface as errors; an empty store prints a "no context" notice.
pub async fn run_query(services: &Services, text: &str, k: Option<i64>, json: bool) -> Result<()> {
    let k = k.unwrap_or(services.config.retrieval.top_k);
    let (context, results) = services.assembler().retrieve_context(text, k).await?;

    if json {
        let response = QueryResponse {
            query: text,
            k,
            context: &context,
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if context.is_empty() {
        println!("No relevant context found.");
        return Ok(());
    }

    println!("{}", context);
    println!();
    println!("Sources:");
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} #{}",
            i + 1,
            result.score,
            result.source_id,
            result.ordinal
        );
    }
    Ok(())
}
