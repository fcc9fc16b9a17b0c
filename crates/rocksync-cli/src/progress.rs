//! Terminal progress bars for a running sync

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use rocksync_sync::SyncPlan;
use rocksync_types::{Error, ProgressReporter, Stage, SyncStats};
use std::path::Path;
use std::time::Duration;

use crate::display::display_relative;

/// [`ProgressReporter`] drawing indicatif bars
///
/// Transforms advance a bar counted in files, copies one counted in
/// planned bytes.
pub struct SyncProgress {
    _multi: MultiProgress,
    transforms: Option<ProgressBar>,
    bytes: ProgressBar,
}

impl SyncProgress {
    /// Create bars sized for `plan`; hidden when `quiet`
    pub fn new(plan: &SyncPlan, quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let transforms = plan.transforms_enabled().then(|| {
            let bar = multi.add(ProgressBar::new(plan.files_planned()));
            bar.set_style(bar_style(
                "{msg} [{wide_bar:.cyan/blue}] {pos}/{len} files [{elapsed}]",
            ));
            bar
        });

        let bytes = multi.add(ProgressBar::new(plan.bytes_planned()));
        bytes.set_style(bar_style(
            "{msg} [{wide_bar:.green/blue}] {bytes}/{total_bytes} ({eta})",
        ));
        bytes.enable_steady_tick(Duration::from_millis(100));

        Self {
            _multi: multi,
            transforms,
            bytes,
        }
    }
}

/// Stage description, padded so both stages line up
pub fn stage_message(stage: Stage, relative_directory: &Path) -> String {
    format!(
        "{:<17}: {}",
        stage.to_string(),
        display_relative(relative_directory)
    )
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

impl ProgressReporter for SyncProgress {
    fn stage_started(&self, stage: Stage, relative_directory: &Path, _files: usize) {
        let message = stage_message(stage, relative_directory);
        match (stage, &self.transforms) {
            (Stage::Transform, Some(bar)) => bar.set_message(message),
            _ => self.bytes.set_message(message),
        }
    }

    fn transform_completed(&self, _file: &Path) {
        if let Some(bar) = &self.transforms {
            bar.inc(1);
        }
    }

    fn copy_completed(&self, _file: &Path, bytes: u64) {
        self.bytes.inc(bytes);
    }

    fn report_error(&self, error: &Error) {
        if let Some(bar) = &self.transforms {
            bar.abandon();
        }
        self.bytes
            .abandon_with_message(style(format!("Aborted: {}", error)).red().to_string());
    }

    fn report_completion(&self, stats: &SyncStats) {
        if let Some(bar) = &self.transforms {
            bar.finish_with_message("Transcoding/Art  : done");
        }
        self.bytes.finish_with_message(format!(
            "{} {} files synced",
            style("✓").green(),
            stats.files_copied
        ));
    }
}
