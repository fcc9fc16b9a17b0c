//! Image normalization: any supported image in, baseline JPEG out
//!
//! Rockbox cannot draw progressive (interlaced) JPEG album art. The encoder
//! used here only ever writes baseline sequential JPEG, so re-encoding a cover
//! is enough to make it displayable.

use crate::error::{MediaError, MediaResult};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use rocksync_types::JpegQuality;
use std::path::Path;
use tracing::debug;

/// Turns arbitrary image bytes into non-interlaced JPEG bytes
pub trait ImageNormalizer: Send + Sync {
    /// Decode `data` and re-encode it as baseline JPEG
    fn normalize(&self, data: &[u8]) -> MediaResult<Vec<u8>>;

    /// Re-encode the image file at `path` in place
    fn normalize_file(&self, path: &Path) -> MediaResult<()> {
        let data = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
        let normalized = self.normalize(&data)?;
        std::fs::write(path, normalized).map_err(|e| MediaError::io(path, e))
    }
}

/// [`ImageNormalizer`] backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegNormalizer {
    quality: JpegQuality,
}

impl JpegNormalizer {
    /// Create a normalizer with the default quality
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer with the given quality
    pub fn with_quality(quality: JpegQuality) -> Self {
        Self { quality }
    }
}

impl ImageNormalizer for JpegNormalizer {
    fn normalize(&self, data: &[u8]) -> MediaResult<Vec<u8>> {
        let decoded = image::load_from_memory(data)
            .map_err(|e| MediaError::image(format!("Failed to load image: {}", e)))?;

        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let mut buffer = Vec::with_capacity(data.len());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality.get());
        rgb.write_with_encoder(encoder)
            .map_err(|e| MediaError::image(format!("Failed to encode image: {}", e)))?;

        debug!(
            "Normalized {}x{} image ({} -> {} bytes)",
            rgb.width(),
            rgb.height(),
            data.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}

/// Whether `data` is a progressive JPEG (contains an SOF2 marker)
pub fn is_progressive_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8]) && data.windows(2).any(|w| w == [0xFF, 0xC2])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    pub(crate) fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([200, 30, 30, 128])));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_png_becomes_baseline_jpeg() {
        let normalized = JpegNormalizer::new().normalize(&png_bytes()).unwrap();

        assert!(normalized.starts_with(&[0xFF, 0xD8]));
        assert!(!is_progressive_jpeg(&normalized));
        assert_eq!(
            image::guess_format(&normalized).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_unrecognized_bytes_fail() {
        let result = JpegNormalizer::new().normalize(b"definitely not an image");
        assert!(matches!(result, Err(MediaError::Image { .. })));
    }

    #[test]
    fn test_normalize_file_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cover.jpg");
        std::fs::write(&path, png_bytes()).unwrap();

        JpegNormalizer::with_quality(JpegQuality::new(70).unwrap())
            .normalize_file(&path)
            .unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_progressive_marker_detection() {
        assert!(is_progressive_jpeg(&[0xFF, 0xD8, 0xFF, 0xC2, 0x00]));
        assert!(!is_progressive_jpeg(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00]));
        assert!(!is_progressive_jpeg(&[0x89, 0x50, 0xFF, 0xC2]));
    }
}
