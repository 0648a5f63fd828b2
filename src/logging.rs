//! Tracing subscriber setup for the `pagewise` binary.
//!
//! Diagnostics go to stderr so command output on stdout stays pipeable.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// An explicit `level` wins over `RUST_LOG`; with neither, `info` is used
/// for this crate and `warn` for dependencies.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(format!(
            "warn,pagewise={level},pagewise_core={level}"
        ))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,pagewise=info,pagewise_core=info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}
