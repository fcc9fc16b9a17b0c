//! Error types for configuration management

use rocksync_types::Error as RocksyncError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("I/O error reading config file '{path}': {source}")]
    Io {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },


    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// Validation error message
        message: String,
    },

    /// Missing required configuration
    #[error("Missing required configuration: {key}")]
    MissingRequired {
        /// Configuration key that is missing
        key: String,
    },

    /// Invalid configuration value
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Generic configuration error
    #[error("Configuration error: {message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::Other {
            message: error.to_string(),
        }
    }
}

impl From<ConfigError> for RocksyncError {
    fn from(error: ConfigError) -> Self {
        RocksyncError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new missing required error
    pub fn missing_required<S: Into<String>>(key: S) -> Self {
        Self::MissingRequired { key: key.into() }
    }

    /// Create a new invalid value error
    pub fn invalid_value<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a new other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts_to_workspace_error() {
        let error: RocksyncError = ConfigError::validation("bad worker count").into();
        assert_eq!(error.kind(), rocksync_types::ErrorKind::Config);
        assert!(error.to_string().contains("bad worker count"));
    }

    #[test]
    fn test_invalid_value_message() {
        let error = ConfigError::invalid_value("art.jpeg_quality", "must be at most 100");
        assert_eq!(
            error.to_string(),
            "Invalid value for 'art.jpeg_quality': must be at most 100"
        );
    }
}
