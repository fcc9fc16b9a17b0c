//! Media collaborators for rocksync
//!
//! The sync pipeline never touches audio or image bytes itself. It talks to
//! the traits in this crate instead:
//!
//! - [`AudioTranscoder`]: turn a FLAC/M4A file into a 320 kbps MP3 ([`FfmpegTranscoder`])
//! - [`ImageNormalizer`]: re-encode any image as baseline JPEG ([`JpegNormalizer`])
//! - [`ArtConverter`]: normalize the front cover embedded in a tag ([`CoverArtConverter`])
//!
//! [`ArtTreeFormatter`] applies an [`ArtConverter`] to a whole library and
//! backs the `rocksync-art` command.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rocksync_media::{ArtConverter, ArtOutcome, CoverArtConverter};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = CoverArtConverter::new();
//! if converter.convert_art(Path::new("01 - Intro.flac")).await? == ArtOutcome::NoCover {
//!     println!("no embedded cover");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod artwork;
pub mod cover;
pub mod error;
pub mod formatter;
pub mod transcode;

pub use artwork::{is_progressive_jpeg, ImageNormalizer, JpegNormalizer};
pub use cover::{ArtConverter, ArtOutcome, CoverArtConverter};
pub use error::{MediaError, MediaResult};
pub use formatter::{ArtEvent, ArtReport, ArtTreeFormatter};
pub use transcode::{AudioTranscoder, FfmpegTranscoder};
