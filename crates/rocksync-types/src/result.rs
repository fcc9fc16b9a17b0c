//! Result type alias for rocksync operations

use crate::Error;

/// Result type alias for rocksync operations
pub type Result<T> = std::result::Result<T, Error>;
