//! Embedded front-cover conversion for FLAC, MP3 and MP4 files

use crate::artwork::{ImageNormalizer, JpegNormalizer};
use crate::error::{MediaError, MediaResult};
use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Tag, TagExt};
use rocksync_types::extension_of;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Audio containers whose embedded cover can be converted
pub const TAGGED_EXTENSIONS: &[&str] = &["flac", "mp3", "m4a"];

/// Plain image files that are re-encoded directly
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// What happened to a file's cover art
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtOutcome {
    /// The cover was re-encoded and written back
    Converted,
    /// The file has no tag or no picture; nothing to do
    NoCover,
}

/// Normalizes the cover art of a file in place
#[async_trait]
pub trait ArtConverter: Send + Sync {
    /// Whether this converter knows how to handle `path`
    fn supports(&self, path: &Path) -> bool;

    /// Convert the cover art of `path` in place
    async fn convert_art(&self, path: &Path) -> MediaResult<ArtOutcome>;
}

/// [`ArtConverter`] reading and writing tags with `lofty`
#[derive(Clone)]
pub struct CoverArtConverter {
    normalizer: Arc<dyn ImageNormalizer>,
}

impl std::fmt::Debug for CoverArtConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverArtConverter").finish_non_exhaustive()
    }
}

impl CoverArtConverter {
    /// Create a converter using the default JPEG normalizer
    pub fn new() -> Self {
        Self::with_normalizer(JpegNormalizer::new())
    }

    /// Create a converter using the given normalizer
    pub fn with_normalizer<N: ImageNormalizer + 'static>(normalizer: N) -> Self {
        Self {
            normalizer: Arc::new(normalizer),
        }
    }

    /// Blocking conversion; runs on the blocking pool from [`ArtConverter::convert_art`]
    pub fn convert_blocking(&self, path: &Path) -> MediaResult<ArtOutcome> {
        let ext = extension_of(path).unwrap_or_default();

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            self.normalizer.normalize_file(path)?;
            return Ok(ArtOutcome::Converted);
        }

        if !TAGGED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(MediaError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }

        let mut tagged_file = Probe::open(path)
            .and_then(|probe| probe.read())
            .map_err(|e| MediaError::tag(path, e.to_string()))?;

        let Some(tag) = tagged_file.primary_tag_mut() else {
            debug!("No tag in {}", path.display());
            return Ok(ArtOutcome::NoCover);
        };

        if !replace_front_cover(tag, self.normalizer.as_ref())? {
            debug!("No picture in {}", path.display());
            return Ok(ArtOutcome::NoCover);
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| MediaError::tag(path, e.to_string()))?;

        debug!("Converted cover art of {}", path.display());
        Ok(ArtOutcome::Converted)
    }
}

impl Default for CoverArtConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArtConverter for CoverArtConverter {
    fn supports(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| {
            TAGGED_EXTENSIONS.contains(&ext.as_str()) || IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
    }

    async fn convert_art(&self, path: &Path) -> MediaResult<ArtOutcome> {
        let converter = self.clone();
        let owned: PathBuf = path.to_path_buf();

        tokio::task::spawn_blocking(move || converter.convert_blocking(&owned))
            .await
            .map_err(|e| MediaError::tag(path, format!("conversion task failed: {}", e)))?
    }
}

/// Index of the picture treated as the front cover
///
/// The first `CoverFront` picture wins; files that only carry untyped
/// pictures (MP4 `covr` atoms) fall back to their first picture.
pub fn front_cover_index(tag: &Tag) -> Option<usize> {
    let pictures = tag.pictures();
    pictures
        .iter()
        .position(|picture| picture.pic_type() == PictureType::CoverFront)
        .or(if pictures.is_empty() { None } else { Some(0) })
}

/// Re-encode the front cover of `tag`; `false` when there is no picture
pub fn replace_front_cover(tag: &mut Tag, normalizer: &dyn ImageNormalizer) -> MediaResult<bool> {
    let Some(index) = front_cover_index(tag) else {
        return Ok(false);
    };

    let normalized = normalizer.normalize(tag.pictures()[index].data())?;
    let cover = Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        None,
        normalized,
    );
    tag.set_picture(index, cover);
    Ok(true)
}
