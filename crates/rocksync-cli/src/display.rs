//! Plan summaries and run statistics for the terminal

use console::style;
use rocksync_sync::{PendingDirectory, PendingFile, SyncPlan};
use rocksync_types::{format_bytes, whole_megabytes, SyncStats};
use std::path::Path;
use std::time::Duration;

/// Shown instead of a summary when the device is up to date
pub const NOTHING_TO_SYNC: &str = "Nothing to sync.";

/// Tag of a directory that already exists on the device
pub const EXISTING_DIRECTORY_TAG: &str = "(NEW SONG in EXISTING)";

/// Tag of a directory the sync will create
pub const NEW_DIRECTORY_TAG: &str = "(NEW DIRECTORY)";

/// Directory as shown to the user; the library root itself is `.`
pub fn display_relative(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

/// Header line of one pending directory
pub fn directory_line(directory: &PendingDirectory) -> String {
    let tag = if directory.destination_exists {
        EXISTING_DIRECTORY_TAG
    } else {
        NEW_DIRECTORY_TAG
    };
    format!(
        "DIR: {} SIZE: {}MB {}",
        display_relative(&directory.relative_path),
        whole_megabytes(directory.size),
        tag
    )
}

/// Line of one pending file, indented under its directory
pub fn file_line(file: &PendingFile) -> String {
    format!(
        "    FILE: {} SIZE: {}MB",
        file.name().to_string_lossy(),
        whole_megabytes(file.size)
    )
}

/// Totals line closing a summary
pub fn totals_line(plan: &SyncPlan) -> String {
    format!(
        "{}MB across {} songs in {} directories to sync",
        whole_megabytes(plan.bytes_planned()),
        plan.files_planned(),
        plan.directories().len()
    )
}

/// Unstyled summary lines of a plan
pub fn plan_summary(plan: &SyncPlan) -> Vec<String> {
    if plan.is_empty() {
        return vec![NOTHING_TO_SYNC.to_string()];
    }

    let mut lines = Vec::new();
    for directory in plan.directories() {
        lines.push(directory_line(directory));
        lines.extend(directory.files.iter().map(file_line));
    }
    lines.push(totals_line(plan));
    lines
}

/// Summary lines with terminal styling; same text as [`plan_summary`]
pub fn styled_plan(plan: &SyncPlan) -> Vec<String> {
    if plan.is_empty() {
        return vec![style(NOTHING_TO_SYNC).green().to_string()];
    }

    let mut lines = Vec::new();
    for directory in plan.directories() {
        let line = style(directory_line(directory)).cyan();
        lines.push(if directory.destination_exists {
            line.to_string()
        } else {
            line.bold().to_string()
        });
        lines.extend(
            directory
                .files
                .iter()
                .map(|file| style(file_line(file)).dim().to_string()),
        );
    }
    lines.push(style(totals_line(plan)).bold().to_string());
    lines
}

/// Print the plan for review
pub fn print_plan(plan: &SyncPlan) {
    for line in styled_plan(plan) {
        println!("{}", line);
    }
}

/// Print statistics of a finished run
pub fn print_stats(stats: &SyncStats) {
    println!();
    println!("{}", style("Sync Statistics:").bold().underlined());
    println!("  Files copied: {}", style(stats.files_copied).green());
    println!(
        "  Files transformed: {}",
        style(stats.files_transformed).green()
    );
    println!(
        "  Directories created: {}",
        style(stats.directories_created).green()
    );
    println!(
        "  Bytes written: {}",
        style(format_bytes(stats.bytes_copied)).green()
    );
    println!(
        "  Duration: {}",
        style(format_duration(stats.duration)).blue()
    );
    println!(
        "  Transfer rate: {}",
        style(format!(
            "{:.2} MB/s",
            stats.transfer_rate() / 1024.0 / 1024.0
        ))
        .blue()
    );
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a warning message with proper formatting
pub fn display_warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}
