use async_trait::async_trait;
use rocksync_media::{ArtConverter, ArtOutcome, AudioTranscoder, MediaError, MediaResult};
use rocksync_types::{extension_of, TRANSCODABLE_EXTENSIONS, TRANSCODE_OUTPUT_EXTENSION};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bytes a [`FakeTranscoder`] writes before the source content
pub const TRANSCODED_PREFIX: &[u8] = b"MP3:";

/// Bytes a [`FakeArtConverter`] appends to every file it touches
pub const ART_MARKER: &[u8] = b":ART";

/// Transcoder that "encodes" by prefixing the source bytes
///
/// Files whose stem is listed in `failing` fail with a transcode error.
#[derive(Debug, Default)]
pub struct FakeTranscoder {
    calls: AtomicUsize,
    outputs: Mutex<Vec<PathBuf>>,
    failing: Vec<String>,
}

impl FakeTranscoder {
    /// Transcoder that succeeds for every input
    pub fn new() -> Self {
        Self::default()
    }

    /// Make inputs with this file stem fail
    pub fn failing_on(mut self, stem: &str) -> Self {
        self.failing.push(stem.to_string());
        self
    }

    /// Number of transcodes attempted
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Temp files written so far
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AudioTranscoder for FakeTranscoder {
    fn output_extension(&self) -> &str {
        TRANSCODE_OUTPUT_EXTENSION
    }

    fn can_transcode(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| TRANSCODABLE_EXTENSIONS.contains(&ext.as_str()))
    }

    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        if self.failing.iter().any(|failing| stem == failing.as_str()) {
            return Err(MediaError::Transcode {
                path: input.to_path_buf(),
                message: "ffmpeg exited with status 1".to_string(),
            });
        }

        let mut content = TRANSCODED_PREFIX.to_vec();
        content.extend(
            tokio::fs::read(input)
                .await
                .map_err(|e| MediaError::io(input, e))?,
        );
        tokio::fs::write(output, content)
            .await
            .map_err(|e| MediaError::io(output, e))?;

        if let Ok(mut outputs) = self.outputs.lock() {
            outputs.push(output.to_path_buf());
        }
        Ok(())
    }
}

/// Art converter that appends [`ART_MARKER`] and records what it saw
#[derive(Debug, Default)]
pub struct FakeArtConverter {
    seen: Mutex<Vec<PathBuf>>,
}

impl FakeArtConverter {
    /// Converter with an empty call log
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths handed to the converter, in call order
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of conversions
    pub fn calls(&self) -> usize {
        self.seen().len()
    }
}

#[async_trait]
impl ArtConverter for FakeArtConverter {
    fn supports(&self, _path: &Path) -> bool {
        true
    }

    async fn convert_art(&self, path: &Path) -> MediaResult<ArtOutcome> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(path.to_path_buf());
        }

        let mut content = tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::io(path, e))?;
        content.extend_from_slice(ART_MARKER);
        tokio::fs::write(path, content)
            .await
            .map_err(|e| MediaError::io(path, e))?;
        Ok(ArtOutcome::Converted)
    }
}
