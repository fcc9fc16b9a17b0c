//! Incremental library-to-device synchronization for rocksync
//!
//! This crate computes what a device is missing and brings it over:
//!
//! - **Planning**: diff a library against a device, treating `01.flac` and
//!   `01.mp3` in the same directory as the same song
//! - **Transform stage**: optional transcode and cover art conversion into
//!   temporary files
//! - **Copy stage**: place files in their device directory and reclaim temp files
//! - **Pipeline**: per-directory orchestration with a bounded worker pool,
//!   fail-fast errors and cooperative cancellation
//!
//! # Examples
//!
//! ```rust,no_run
//! use rocksync_config::Config;
//! use rocksync_sync::{build_plan, PlanOptions, SyncPipeline};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let options = PlanOptions::from_config(&config).with_transcode(true);
//! let mut plan = build_plan(Path::new("/music"), Path::new("/media/ipod/Music"), &options)?;
//!
//! let mut pipeline = SyncPipeline::from_config(&config);
//! pipeline.confirm(true)?;
//! let stats = pipeline.execute(&mut plan).await?;
//! println!("Synced {} files", stats.files_copied);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod copy;
pub mod pipeline;
pub mod plan;
pub mod transform;

pub use copy::{copy, CopyJob};
pub use pipeline::{default_workers, SyncPipeline, SyncState};
pub use plan::{already_synced, build_plan, PendingDirectory, PendingFile, PlanOptions, SyncPlan};
pub use transform::{final_name, TransformJob, TransformedFile, Transformer};
