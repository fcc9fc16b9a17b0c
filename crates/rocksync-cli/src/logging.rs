//! Logging setup shared by both binaries

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Level picked from the command line flags, falling back to `configured`
pub fn log_level<'a>(debug: bool, verbose: bool, quiet: bool, configured: &'a str) -> &'a str {
    if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        configured
    }
}

/// Install the global subscriber; `RUST_LOG` overrides `level`
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", level, e))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
