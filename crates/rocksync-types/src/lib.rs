//! Core type system and error handling for rocksync
//!
//! This crate provides the foundational types, error handling, and shared data structures
//! used throughout the rocksync workspace. It includes:
//!
//! - **Error handling**: One error enum covering planning, transform, copy and abort paths
//! - **Core types**: Sync statistics, pipeline stages and media naming rules
//! - **Traits**: Progress reporting hooks for the pipeline
//! - **Configuration**: Validated configuration value types
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use rocksync_types::{Error, Result, SyncStats};
//!
//! fn example_operation() -> Result<SyncStats> {
//!     let mut stats = SyncStats::new();
//!     stats.files_copied = 10;
//!     stats.bytes_copied = 1024 * 1024; // 1MB
//!     Ok(stats)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{JpegQuality, ThreadCount};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use traits::*;
pub use types::*;
