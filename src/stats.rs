//! The `stats` command: a summary of what the store holds.

use anyhow::Result;

use crate::services::Services;

/// Print backend, model, dimensionality and per-source record counts.
pub async fn run_stats(services: &Services) -> Result<()> {
    let store = &services.store;
    let total = store.count(None).await?;
    let sources = store.source_counts().await?;

    println!("Pagewise store");
    println!("==============");
    println!();
    println!("  Backend:     {}", store.backend_name());
    if services.config.store.backend == "sqlite" {
        println!("  Path:        {}", services.config.store.path.display());
    }
    println!("  Model:       {}", services.embedder.model_name());
    match store.dims() {
        Some(dims) => println!("  Dimensions:  {}", dims),
        None => println!("  Dimensions:  (not pinned yet)"),
    }
    println!("  Records:     {}", total);
    println!("  Sources:     {}", sources.len());

    if !sources.is_empty() {
        println!();
        println!("  {:<48} {:>8}", "SOURCE", "CHUNKS");
        for (source_id, count) in &sources {
            println!("  {:<48} {:>8}", source_id, count);
        }
    }
    Ok(())
}
