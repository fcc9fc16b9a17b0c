//! Transform stage: transcode or re-tag a song into a temporary file

use rocksync_config::Config;
use rocksync_media::{
    ArtConverter, AudioTranscoder, CoverArtConverter, FfmpegTranscoder, JpegNormalizer,
};
use rocksync_types::{Error, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Input of one transform, handed to a worker by value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformJob {
    /// Position of the file inside its pending directory
    pub index: usize,
    /// File in the source library
    pub source: PathBuf,
}

/// Output of one transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedFile {
    /// Position of the file inside its pending directory
    pub index: usize,
    /// Temporary file to copy from, `None` when the source is copied as is
    pub temp_source: Option<PathBuf>,
    /// Name the file gets on the device
    pub final_name: OsString,
}

/// Runs the transform policy for single files
#[derive(Clone)]
pub struct Transformer {
    transcoder: Arc<dyn AudioTranscoder>,
    art: Arc<dyn ArtConverter>,
    temp_dir: PathBuf,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Transformer {
    /// Create a transformer from its collaborators
    pub fn new<P: Into<PathBuf>>(
        transcoder: Arc<dyn AudioTranscoder>,
        art: Arc<dyn ArtConverter>,
        temp_dir: P,
    ) -> Self {
        Self {
            transcoder,
            art,
            temp_dir: temp_dir.into(),
        }
    }

    /// Create a transformer backed by ffmpeg and lofty
    pub fn from_config(config: &Config) -> Self {
        let transcoder = FfmpegTranscoder::with_binary(&config.transcode.ffmpeg_path)
            .with_transcodable(&config.sync.transcodable_extensions);
        let art = CoverArtConverter::with_normalizer(JpegNormalizer::with_quality(
            config.art.jpeg_quality,
        ));
        Self::new(Arc::new(transcoder), Arc::new(art), config.temp_dir())
    }

    /// Directory holding temporary files
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Create the temp directory if needed
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| {
                Error::io(format!(
                    "Failed to create temp directory '{}': {}",
                    self.temp_dir.display(),
                    e
                ))
            })
    }

    /// Fresh temporary path `<uuid>.<extension>`
    pub fn temp_path(&self, extension: &OsStr) -> PathBuf {
        let mut name = OsString::from(Uuid::new_v4().to_string());
        if !extension.is_empty() {
            name.push(".");
            name.push(extension);
        }
        self.temp_dir.join(name)
    }

    /// Transform one file
    ///
    /// 1. Transcodable source with transcoding on: transcode into a temp
    ///    file (then convert its art too, if enabled).
    /// 2. Art conversion on: copy to a temp file and convert its art.
    /// 3. Otherwise nothing happens and the source is copied as is.
    ///
    /// A failing transform removes its own temp file before returning.
    pub async fn transform(
        &self,
        job: TransformJob,
        transcode_enabled: bool,
        art_enabled: bool,
    ) -> Result<TransformedFile> {
        let source = job.source.as_path();

        if transcode_enabled && self.transcoder.can_transcode(source) {
            let output_extension = self.transcoder.output_extension().to_string();
            let temp = self.temp_path(output_extension.as_ref());
            debug!("Transcoding {} into {}", source.display(), temp.display());

            let result: Result<()> = async {
                self.transcoder
                    .transcode(source, &temp)
                    .await
                    .map_err(|e| Error::transform(source, e.to_string()))?;
                if art_enabled {
                    self.convert_art(source, &temp).await?;
                }
                Ok(())
            }
            .await;

            return match result {
                Ok(()) => Ok(TransformedFile {
                    index: job.index,
                    temp_source: Some(temp),
                    final_name: final_name(source, Some(&output_extension)),
                }),
                Err(error) => {
                    remove_temp(&temp).await;
                    Err(error)
                }
            };
        }

        if art_enabled {
            let temp = self.temp_path(source.extension().unwrap_or_default());
            debug!("Converting art of {} in {}", source.display(), temp.display());

            let result: Result<()> = async {
                tokio::fs::copy(source, &temp).await.map_err(|e| {
                    Error::transform(source, format!("Failed to create temp file: {}", e))
                })?;
                self.convert_art(source, &temp).await
            }
            .await;

            return match result {
                Ok(()) => Ok(TransformedFile {
                    index: job.index,
                    temp_source: Some(temp),
                    final_name: final_name(source, None),
                }),
                Err(error) => {
                    remove_temp(&temp).await;
                    Err(error)
                }
            };
        }

        Ok(TransformedFile {
            index: job.index,
            temp_source: None,
            final_name: final_name(source, None),
        })
    }

    async fn convert_art(&self, source: &Path, temp: &Path) -> Result<()> {
        let outcome = self
            .art
            .convert_art(temp)
            .await
            .map_err(|e| Error::transform(source, e.to_string()))?;
        debug!("Art of {}: {:?}", source.display(), outcome);
        Ok(())
    }
}

/// Device file name: the source stem with `extension`, or the source name unchanged
pub fn final_name(source: &Path, extension: Option<&str>) -> OsString {
    match extension {
        Some(extension) => {
            let mut name = source.file_stem().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(extension);
            name
        }
        None => source.file_name().unwrap_or_default().to_os_string(),
    }
}

pub(crate) async fn remove_temp(temp: &Path) {
    match tokio::fs::remove_file(temp).await {
        Ok(()) => debug!("Removed temp file {}", temp.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp file {}: {}", temp.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rocksync_media::{ArtOutcome, MediaError, MediaResult};
    use rstest::rstest;
    use tempfile::TempDir;

    /// Writes the input bytes prefixed with `MP3:`; fails on inputs named `bad.*`
    struct FakeTranscoder;

    #[async_trait]
    impl AudioTranscoder for FakeTranscoder {
        fn output_extension(&self) -> &str {
            "mp3"
        }

        fn can_transcode(&self, path: &Path) -> bool {
            matches!(
                rocksync_types::extension_of(path).as_deref(),
                Some("flac" | "m4a")
            )
        }

        async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
            let mut data = b"MP3:".to_vec();
            data.extend(std::fs::read(input).map_err(|e| MediaError::io(input, e))?);
            std::fs::write(output, data).map_err(|e| MediaError::io(output, e))?;
            if input.file_stem().is_some_and(|stem| stem == "bad") {
                return Err(MediaError::Transcode {
                    path: input.to_path_buf(),
                    message: "encoder crashed".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Appends `+ART` to the file
    struct FakeArt {
        fail: bool,
    }

    #[async_trait]
    impl ArtConverter for FakeArt {
        fn supports(&self, _path: &Path) -> bool {
            true
        }

        async fn convert_art(&self, path: &Path) -> MediaResult<ArtOutcome> {
            if self.fail {
                return Err(MediaError::image("unrecognized image"));
            }
            let mut data = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
            data.extend_from_slice(b"+ART");
            std::fs::write(path, data).map_err(|e| MediaError::io(path, e))?;
            Ok(ArtOutcome::Converted)
        }
    }

    fn setup(fail_art: bool) -> (TempDir, Transformer) {
        let temp_dir = TempDir::new().unwrap();
        let scratch = temp_dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        let transformer = Transformer::new(
            Arc::new(FakeTranscoder),
            Arc::new(FakeArt { fail: fail_art }),
            scratch,
        );
        (temp_dir, transformer)
    }

    fn source(temp_dir: &TempDir, name: &str) -> PathBuf {
        let path = temp_dir.path().join(name);
        std::fs::write(&path, b"audio").unwrap();
        path
    }

    fn scratch_entries(transformer: &Transformer) -> usize {
        std::fs::read_dir(transformer.temp_dir()).unwrap().count()
    }

    #[rstest]
    #[case("01.flac", false, "01.flac")]
    #[case("01.flac", true, "01.mp3")]
    #[case("01.m4a", true, "01.mp3")]
    #[case("01.mp3", true, "01.mp3")]
    #[case("01.FLAC", false, "01.FLAC")]
    #[tokio::test]
    async fn test_final_extension(
        #[case] name: &str,
        #[case] transcode: bool,
        #[case] expected: &str,
    ) {
        let (temp_dir, transformer) = setup(false);
        let job = TransformJob {
            index: 3,
            source: source(&temp_dir, name),
        };

        let result = transformer.transform(job, transcode, false).await.unwrap();

        assert_eq!(result.index, 3);
        assert_eq!(result.final_name, OsString::from(expected));
    }

    #[tokio::test]
    async fn test_transcode_writes_temp_file() {
        let (temp_dir, transformer) = setup(false);
        let job = TransformJob {
            index: 0,
            source: source(&temp_dir, "01.flac"),
        };

        let result = transformer.transform(job, true, false).await.unwrap();

        let temp = result.temp_source.unwrap();
        assert_eq!(temp.parent().unwrap(), transformer.temp_dir());
        assert_eq!(temp.extension().unwrap(), "mp3");
        assert_eq!(std::fs::read(&temp).unwrap(), b"MP3:audio");
    }

    #[tokio::test]
    async fn test_transcode_then_art() {
        let (temp_dir, transformer) = setup(false);
        let job = TransformJob {
            index: 0,
            source: source(&temp_dir, "01.m4a"),
        };

        let result = transformer.transform(job, true, true).await.unwrap();

        let temp = result.temp_source.unwrap();
        assert_eq!(std::fs::read(&temp).unwrap(), b"MP3:audio+ART");
    }

    #[tokio::test]
    async fn test_art_only_keeps_extension() {
        let (temp_dir, transformer) = setup(false);
        let original = source(&temp_dir, "01.flac");
        let job = TransformJob {
            index: 0,
            source: original.clone(),
        };

        let result = transformer.transform(job, false, true).await.unwrap();

        let temp = result.temp_source.unwrap();
        assert_eq!(temp.extension().unwrap(), "flac");
        assert_eq!(std::fs::read(&temp).unwrap(), b"audio+ART");
        assert_eq!(std::fs::read(&original).unwrap(), b"audio");
        assert_eq!(result.final_name, OsString::from("01.flac"));
    }

    #[tokio::test]
    async fn test_no_transform_creates_nothing() {
        let (temp_dir, transformer) = setup(false);
        let job = TransformJob {
            index: 0,
            source: source(&temp_dir, "01.mp3"),
        };

        let result = transformer.transform(job, true, false).await.unwrap();

        assert!(result.temp_source.is_none());
        assert_eq!(scratch_entries(&transformer), 0);
    }

    #[tokio::test]
    async fn test_failed_transcode_removes_temp() {
        let (temp_dir, transformer) = setup(false);
        let job = TransformJob {
            index: 0,
            source: source(&temp_dir, "bad.flac"),
        };

        let result = transformer.transform(job, true, false).await;

        match result {
            Err(Error::Transform { path, message }) => {
                assert!(path.ends_with("bad.flac"));
                assert!(message.contains("encoder crashed"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(scratch_entries(&transformer), 0);
    }

    #[tokio::test]
    async fn test_failed_art_removes_temp() {
        let (temp_dir, transformer) = setup(true);
        let job = TransformJob {
            index: 0,
            source: source(&temp_dir, "01.mp3"),
        };

        let result = transformer.transform(job, false, true).await;

        assert!(matches!(result, Err(Error::Transform { .. })));
        assert_eq!(scratch_entries(&transformer), 0);
    }

    #[test]
    fn test_temp_names_are_unique() {
        let (_temp_dir, transformer) = setup(false);
        let a = transformer.temp_path("mp3".as_ref());
        let b = transformer.temp_path("mp3".as_ref());
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "mp3");
        assert_eq!(a.file_stem().unwrap().len(), 36);
    }
}
