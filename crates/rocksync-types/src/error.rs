//! Error types and handling for rocksync
//!
//! Every failure in the workspace is reported through [`Error`]. The variants
//! follow the life cycle of a sync run: planning failures happen before any
//! I/O, transform and copy failures abort a run at the next join barrier, and
//! a declined confirmation is a clean [`Error::UserAbort`].

use std::path::PathBuf;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - the run ended on request
    Low,
    /// Medium severity - a single file failed and the run was aborted
    Medium,
    /// High severity - the run could not start
    High,
}

/// Main error type for rocksync operations
#[derive(thiserror::Error, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// The source or destination root is unusable
    #[error("Could not find directory {path}: {message}")]
    Planning {
        /// Offending root path
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// An external collaborator failed while transforming a file
    #[error("Failed to transform {path}: {message}")]
    Transform {
        /// File being transformed
        path: PathBuf,
        /// Collaborator failure description
        message: String,
    },

    /// Copying a file into the destination failed
    #[error("Failed to copy {path}: {message}")]
    Copy {
        /// File being copied
        path: PathBuf,
        /// I/O failure description
        message: String,
    },

    /// The user declined the confirmation prompt
    #[error("Sync declined by user")]
    UserAbort,

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O operation failed outside of a single file transfer
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Planning errors
    Planning,
    /// Transform errors
    Transform,
    /// Copy errors
    Copy,
    /// Declined confirmation
    UserAbort,
    /// Cancellation
    Cancelled,
    /// I/O related errors
    Io,
    /// Configuration errors
    Config,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Planning { .. } => ErrorKind::Planning,
            Self::Transform { .. } => ErrorKind::Transform,
            Self::Copy { .. } => ErrorKind::Copy,
            Self::UserAbort => ErrorKind::UserAbort,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Planning { .. } | Self::Config { .. } => ErrorSeverity::High,
            Self::Transform { .. } | Self::Copy { .. } | Self::Io { .. } => ErrorSeverity::Medium,
            Self::UserAbort | Self::Cancelled => ErrorSeverity::Low,
        }
    }

    /// Whether the run ended without touching the destination by choice
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Self::UserAbort)
    }

    /// Create a new planning error
    pub fn planning<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Planning {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new transform error
    pub fn transform<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Transform {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new copy error
    pub fn copy<P: Into<PathBuf>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Copy {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
