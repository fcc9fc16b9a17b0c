//! rocksync-art - re-encode embedded album art so Rockbox can draw it
//!
//! Rockbox on the iPod cannot display interlaced JPEG covers. This walks a
//! file or directory and rewrites every embedded front cover (and every
//! loose `.jpg`) as baseline JPEG.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rocksync_cli::display::display_error;
use rocksync_cli::{init_logging, log_level};
use rocksync_config::ConfigLoader;
use rocksync_media::{ArtEvent, ArtTreeFormatter, CoverArtConverter, JpegNormalizer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Convert embedded album art to not use interlacing
#[derive(Parser)]
#[command(name = "rocksync-art", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Either a directory to recursively change songs in, or a song/jpg itself
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

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
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            display_error(&format!("{:#}", error));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load_default(),
    }
    .context("Failed to load configuration")?;

    init_logging(log_level(
        cli.debug,
        cli.verbose,
        cli.quiet,
        &config.logging.level,
    ))?;

    if !cli.path.exists() {
        bail!("Could not find file/directory {}", cli.path.display());
    }

    let converter = CoverArtConverter::with_normalizer(JpegNormalizer::with_quality(
        config.art.jpeg_quality,
    ));
    let formatter = ArtTreeFormatter::with_converter(Arc::new(converter))
        .with_ignore_names(config.sync.ignore_names.iter().cloned());

    let report = formatter
        .format(&cli.path, |event| match event {
            ArtEvent::Directory(directory) => println!("FORMATTING IN: {}", directory.display()),
            ArtEvent::File(file) => println!(
                "    {}",
                file.file_name().unwrap_or_default().to_string_lossy()
            ),
        })
        .await
        .with_context(|| format!("Failed to format art in {}", cli.path.display()))?;

    println!(
        "FINISHED: {} files processed in {} directories in {} seconds.",
        report.files_processed,
        report.directories.len(),
        report.duration.as_secs()
    );
    Ok(())
}
