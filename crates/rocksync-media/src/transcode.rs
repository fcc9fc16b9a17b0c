//! Audio transcoding through an external ffmpeg process

use crate::error::{MediaError, MediaResult};
use async_trait::async_trait;
use rocksync_types::{
    extension_of, normalize_extension, TRANSCODABLE_EXTENSIONS, TRANSCODE_BITRATE_KBPS,
    TRANSCODE_OUTPUT_EXTENSION,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Converts one audio file into another container
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Extension (without dot) of the files this transcoder writes
    fn output_extension(&self) -> &str;

    /// Whether `path` has an extension this transcoder accepts
    fn can_transcode(&self, path: &Path) -> bool;

    /// Transcode `input` into `output`
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()>;
}

/// MP3 transcoder backed by the `ffmpeg` executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    bitrate_kbps: u32,
    transcodable: Vec<String>,
}

impl FfmpegTranscoder {
    /// Create a transcoder that runs `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    /// Create a transcoder that runs the given ffmpeg binary
    pub fn with_binary<P: Into<PathBuf>>(ffmpeg_path: P) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            bitrate_kbps: TRANSCODE_BITRATE_KBPS,
            transcodable: TRANSCODABLE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Replace the accepted input extensions
    pub fn with_transcodable<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.transcodable = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    /// Audio bitrate passed to the encoder
    pub fn bitrate_kbps(&self) -> u32 {
        self.bitrate_kbps
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-loglevel", "quiet", "-nostats", "-y", "-i"])
            .arg(input)
            .arg("-b:a")
            .arg(format!("{}k", self.bitrate_kbps))
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    fn output_extension(&self) -> &str {
        TRANSCODE_OUTPUT_EXTENSION
    }

    fn can_transcode(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.transcodable.contains(&ext))
    }

    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        if !self.can_transcode(input) {
            return Err(MediaError::UnsupportedExtension {
                path: input.to_path_buf(),
            });
        }

        debug!(
            "Transcoding {} -> {} at {}k",
            input.display(),
            output.display(),
            self.bitrate_kbps
        );

        let result = self
            .command(input, output)
            .output()
            .await
            .map_err(|e| MediaError::Transcode {
                path: input.to_path_buf(),
                message: format!(
                    "failed to run '{}': {}",
                    self.ffmpeg_path.display(),
                    e
                ),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(MediaError::Transcode {
                path: input.to_path_buf(),
                message: format!("ffmpeg exited with {}: {}", result.status, stderr.trim()),
            });
        }

        Ok(())
    }
}
