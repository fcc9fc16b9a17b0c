//! Core data types for rocksync
//!
//! Statistics, pipeline stages and the media naming rules shared by the
//! planner, the pipeline and the command line front end.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File size in bytes
pub type FileSize = u64;

/// Audio containers recognized as songs, without the leading dot
pub const SONG_EXTENSIONS: &[&str] = &["flac", "mp3", "m4a"];

/// Containers the transcoder accepts
pub const TRANSCODABLE_EXTENSIONS: &[&str] = &["flac", "m4a"];

/// Container produced by the transcoder
pub const TRANSCODE_OUTPUT_EXTENSION: &str = "mp3";

/// Fixed transcode bitrate in kbit/s
pub const TRANSCODE_BITRATE_KBPS: u32 = 320;

/// Names skipped while walking a library by default
pub const DEFAULT_IGNORE_NAMES: &[&str] = &[".stfolder", ".stignore", ".stversions"];

/// Bytes per displayed megabyte
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Pipeline stage of a pending directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stage {
    /// Transcoding or art conversion into temporary files
    Transform,
    /// Copying into the destination tree
    Copy,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transform => write!(f, "Transcoding/Art"),
            Self::Copy => write!(f, "Currently Syncing"),
        }
    }
}

/// Statistics of a finished (or aborted) sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Number of files in the plan
    pub files_planned: u64,
    /// Planned bytes, measured on the source files
    pub bytes_planned: u64,
    /// Number of files copied into the destination
    pub files_copied: u64,
    /// Bytes written into the destination
    pub bytes_copied: u64,
    /// Number of files that went through a transform
    pub files_transformed: u64,
    /// Number of destination directories created
    pub directories_created: u64,
    /// Total duration of the run
    pub duration: Duration,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate the overall transfer rate in bytes per second
    pub fn transfer_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_copied as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Whether every planned file reached the destination
    pub fn is_complete(&self) -> bool {
        self.files_copied == self.files_planned
    }
}

/// Lower-cased extension of `path` without the dot
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Normalize a configured extension (`".FLAC"` becomes `"flac"`)
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Whole megabytes, rounded down, as shown in plan summaries
pub fn whole_megabytes(bytes: FileSize) -> u64 {
    bytes / BYTES_PER_MB
}

/// Format a byte count as a human-readable string
pub fn format_bytes(bytes: FileSize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
