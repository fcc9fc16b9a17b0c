//! rocksync - incremental music library sync for Rockbox devices
//!
//! Copies songs the device is missing, optionally transcoding FLAC/M4A to
//! MP3 and re-encoding embedded cover art the Rockbox firmware can display.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use console::style;
use rocksync_cli::display::{display_error, display_warning, print_plan, print_stats};
use rocksync_cli::{confirm_sync, init_logging, log_level, SyncProgress};
use rocksync_config::{Config, ConfigLoader};
use rocksync_sync::{build_plan, PlanOptions, SyncPipeline};
use rocksync_types::{Error, ThreadCount};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// rocksync - sync a music library onto a Rockbox device
#[derive(Parser)]
#[command(
    name = "rocksync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Sync songs with a device",
    long_about = "rocksync copies the songs a device is missing from a music library.\n\
                  A song counts as present when the device holds a file with the same\n\
                  name under any song extension, so transcoded copies are recognized."
)]
struct Cli {
    /// Directory to sync from
    source_directory: PathBuf,

    /// Directory to sync to
    destination_directory: PathBuf,

    /// Transcode flac/m4a to 320kbps mp3
    #[arg(long)]
    transcode: bool,

    /// Re-encode embedded album art without interlacing
    #[arg(long)]
    convert_art: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of concurrent workers per stage
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Additional file or directory name to skip (repeatable)
    #[arg(long, value_name = "NAME")]
    ignore: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) if error.downcast_ref::<Error>().is_some_and(Error::is_clean_exit) => {
            println!("Sync cancelled.");
            ExitCode::SUCCESS
        }
        Err(error) => {
            display_error(&format!("{:#}", error));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(jobs) = cli.jobs {
        config.performance.worker_count = ThreadCount::new(jobs).map_err(|e| anyhow!(e))?;
    }

    init_logging(log_level(
        cli.debug,
        cli.verbose,
        cli.quiet,
        &config.logging.level,
    ))?;
    info!("rocksync v{} starting", env!("CARGO_PKG_VERSION"));

    let options = PlanOptions::from_config(&config)
        .with_ignore_names(cli.ignore)
        .with_transcode(cli.transcode)
        .with_convert_art(cli.convert_art);
    let mut plan = build_plan(&cli.source_directory, &cli.destination_directory, &options)?;

    print_plan(&plan);
    if plan.is_empty() {
        return Ok(());
    }

    let approved = cli.yes || confirm_sync()?;

    let cancel = CancellationToken::new();
    let reporter = Arc::new(SyncProgress::new(&plan, cli.quiet));
    let mut pipeline = SyncPipeline::from_config(&config)
        .with_reporter(reporter)
        .with_cancellation(cancel.clone());
    pipeline.confirm(approved)?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for running workers");
            cancel.cancel();
        }
    });

    let stats = match pipeline.execute(&mut plan).await {
        Ok(stats) => stats,
        Err(Error::Cancelled) => {
            display_warning(&format!(
                "Interrupted after {} of {} files",
                plan.files_completed(),
                plan.files_planned()
            ));
            return Err(Error::Cancelled.into());
        }
        Err(error) => return Err(error.into()),
    };

    if !cli.quiet {
        print_stats(&stats);
        println!("{} Sync completed", style("✓").green());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => ConfigLoader::load_default().context("Failed to load configuration"),
    }
}
