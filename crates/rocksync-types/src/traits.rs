//! Core traits for rocksync operations

use crate::{Error, Stage, SyncStats};
use std::path::Path;

/// Trait for reporting progress while a plan executes
///
/// Every method is called from the controlling task only, never from a
/// worker, so implementations do not need to synchronize between calls.
pub trait ProgressReporter: Send + Sync {
    /// A stage is about to run for one pending directory
    fn stage_started(&self, stage: Stage, relative_directory: &Path, files: usize);

    /// One file finished its transform
    fn transform_completed(&self, file: &Path);

    /// One file reached the destination, `bytes` being its planned size
    fn copy_completed(&self, file: &Path, bytes: u64);

    /// Report an error that aborted the run
    fn report_error(&self, error: &Error);

    /// Report completion of the run
    fn report_completion(&self, stats: &SyncStats);
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn stage_started(&self, _stage: Stage, _relative_directory: &Path, _files: usize) {}

    fn transform_completed(&self, _file: &Path) {}

    fn copy_completed(&self, _file: &Path, _bytes: u64) {}

    fn report_error(&self, _error: &Error) {}

    fn report_completion(&self, _stats: &SyncStats) {}
}
