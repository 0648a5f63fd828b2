//! # Pagewise CLI (`pagewise`)
//!
//! ```bash
//! pagewise --config ./config/pagewise.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagewise init` | Create the store and check it against the configured model |
//! | `pagewise ingest <paths>...` | Ingest PDF, text and markdown files |
//! | `pagewise ingest-readme <owner/repo>` | Ingest a GitHub README by section |
//! | `pagewise query "<question>"` | Print the context block for a question |
//! | `pagewise stats` | Show record counts per source |

use clap::{Parser, Subcommand};
use pagewise::services::Services;
use pagewise::{config, ingest, logging, query, stats};
use std::path::PathBuf;
use tracing::debug;

/// Pagewise: page-level document ingestion and retrieval for RAG.
///
/// All commands read a TOML configuration file. See
/// `config/pagewise.example.toml` for every option.
#[derive(Parser)]
#[command(name = "pagewise", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pagewise.toml")]
    config: PathBuf,

    /// Log level for pagewise crates (`error`, `warn`, `info`, `debug`, `trace`).
    ///
    /// Overrides `RUST_LOG` when given.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector store and pin it to the configured model.
    ///
    /// Idempotent. The dimension is pinned too when `store.dims` or
    /// `embedding.dims` is set. Fails if the store belongs to a different
    /// model.
    Init,

    /// Ingest files or directories.
    ///
    /// Directories are walked recursively; only extensions listed in
    /// `ingest.include_extensions` are picked up. Re-ingesting a file
    /// appends a second copy of its chunks.
    Ingest {
        /// Files or directories to ingest.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum number of documents processed at once.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Ingest a GitHub repository's README, one chunk per section.
    IngestReadme {
        /// Repository as `owner/repo` or a github.com URL.
        repo: String,
    },

    /// Retrieve the context block for a question.
    Query {
        /// The question text.
        text: String,

        /// Number of chunks to retrieve. Defaults to `retrieval.top_k`.
        #[arg(long, short = 'k', allow_negative_numbers = true)]
        k: Option<i64>,

        /// Print the context and ranked results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show what the store holds.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref())?;

    let cfg = config::load_config(&cli.config)?;
    debug!(config = %cli.config.display(), "configuration loaded");
    let services = Services::start(cfg).await?;

    let result = match cli.command {
        Commands::Init => {
            println!("Store ready ({}).", services.store.backend_name());
            Ok(())
        }
        Commands::Ingest { paths, concurrency } => {
            ingest::run_ingest(&services, &paths, concurrency).await
        }
        Commands::IngestReadme { repo } => ingest::run_ingest_readme(&services, &repo).await,
        Commands::Query { text, k, json } => query::run_query(&services, &text, k, json).await,
        Commands::Stats => stats::run_stats(&services).await,
    };

    services.shutdown().await;
    result
}
