//! Terminal front end for rocksync
//!
//! Shared pieces of the `rocksync` and `rocksync-art` binaries: plan
//! summaries, the confirmation prompt, progress bars and logging setup.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod confirm;
pub mod display;
pub mod logging;
pub mod progress;

pub use confirm::{confirm_sync, parse_confirmation};
pub use display::{plan_summary, print_plan, print_stats};
pub use logging::{init_logging, log_level};
pub use progress::SyncProgress;
