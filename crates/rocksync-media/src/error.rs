//! Error types for the media collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Media collaborator error type
#[derive(Error, Debug)]
pub enum MediaError {
    /// The file's container is not handled by this collaborator
    #[error("Unsupported file type: {path}")]
    UnsupportedExtension {
        /// Offending file
        path: PathBuf,
    },

    /// The encoder could not be started or exited unsuccessfully
    #[error("Transcoding '{path}' failed: {message}")]
    Transcode {
        /// Input file
        path: PathBuf,
        /// Encoder failure description
        message: String,
    },

    /// Image bytes could not be decoded or re-encoded
    #[error("Image processing failed: {message}")]
    Image {
        /// Error message
        message: String,
    },

    /// The audio tag could not be read or written
    #[error("Tag access failed for '{path}': {message}")]
    Tag {
        /// Audio file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// I/O error on a media file
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl MediaError {
    /// Create a new image error
    pub fn image<S: Into<String>>(message: S) -> Self {
        Self::Image {
            message: message.into(),
        }
    }

    /// Create a new tag error
    pub fn tag<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Tag {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error for `path`
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<image::ImageError> for MediaError {
    fn from(error: image::ImageError) -> Self {
        Self::image(error.to_string())
    }
}

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;
