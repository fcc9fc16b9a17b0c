//! Configuration management system for rocksync
//!
//! Configuration is layered: built-in defaults, then an optional YAML, TOML
//! or JSON file, then `ROCKSYNC`-prefixed environment variables.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rocksync_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_source_file("rocksync.yaml")
//!     .add_env_prefix("ROCKSYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Workers: {}", config.performance.worker_count.get());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use rocksync_types::{
    normalize_extension, JpegQuality, ThreadCount, DEFAULT_IGNORE_NAMES, SONG_EXTENSIONS,
    TRANSCODABLE_EXTENSIONS, TRANSCODE_BITRATE_KBPS,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for rocksync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Planning and naming rules
    pub sync: SyncConfig,
    /// Worker pool sizing
    pub performance: PerformanceConfig,
    /// Audio transcoding
    pub transcode: TranscodeConfig,
    /// Cover art conversion
    pub art: ArtConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Lower-case every configured extension and strip leading dots
    pub fn normalize(&mut self) {
        for list in [
            &mut self.sync.song_extensions,
            &mut self.sync.transcodable_extensions,
        ] {
            for ext in list.iter_mut() {
                *ext = normalize_extension(ext);
            }
            list.sort();
            list.dedup();
        }
    }

    /// Directory used for temporary transform output
    pub fn temp_dir(&self) -> PathBuf {
        self.sync
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Planning and naming rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// File and directory names skipped while walking the source
    pub ignore_names: Vec<String>,
    /// Extensions treated as songs and as equivalent at the destination
    pub song_extensions: Vec<String>,
    /// Extensions handed to the transcoder when transcoding is on
    pub transcodable_extensions: Vec<String>,
    /// Where temporary transform output goes; system temp dir when unset
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            song_extensions: SONG_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            transcodable_extensions: TRANSCODABLE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temp_dir: None,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Concurrent workers per stage
    pub worker_count: ThreadCount,
}

/// Audio transcoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,
    /// Target bitrate in kbit/s
    pub bitrate_kbps: u32,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            bitrate_kbps: TRANSCODE_BITRATE_KBPS,
        }
    }
}

/// Cover art conversion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtConfig {
    /// Quality of re-encoded covers
    pub jpeg_quality: JpegQuality,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor a verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.song_extensions, vec!["flac", "mp3", "m4a"]);
        assert_eq!(config.sync.transcodable_extensions, vec!["flac", "m4a"]);
        assert!(config.sync.ignore_names.contains(&".stignore".to_string()));
        assert_eq!(config.transcode.bitrate_kbps, 320);
        assert_eq!(config.art.jpeg_quality.get(), 90);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_normalize_extensions() {
        let mut config = Config::default();
        config.sync.song_extensions = vec![".FLAC".into(), "mp3".into(), "flac".into()];
        config.normalize();
        assert_eq!(config.sync.song_extensions, vec!["flac", "mp3"]);
    }

    #[test]
    fn test_temp_dir_fallback() {
        let mut config = Config::default();
        assert_eq!(config.temp_dir(), std::env::temp_dir());

        config.sync.temp_dir = Some(PathBuf::from("/var/tmp/rocksync"));
        assert_eq!(config.temp_dir(), PathBuf::from("/var/tmp/rocksync"));
    }
}
