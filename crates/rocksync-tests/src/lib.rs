//! rocksync Testing Suite
//!
//! Shared fixtures for the integration tests and benchmarks: on-disk
//! library/device layouts and in-process stand-ins for ffmpeg and the
//! cover art converter, so whole syncs run without external tools.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// In-process transcode and art collaborators
pub mod fakes;

/// Library and device fixtures
///
/// Common helpers used across the integration tests and benchmarks.
pub mod test_utils;

pub use fakes::{FakeArtConverter, FakeTranscoder, ART_MARKER, TRANSCODED_PREFIX};
pub use test_utils::{LibraryFixture, MB};
