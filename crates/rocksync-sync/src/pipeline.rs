//! Pipeline orchestrator: transform then copy, one directory at a time
//!
//! The controlling task walks the plan in order. For every pending
//! directory it creates the device directory, runs all transforms on a
//! bounded worker pool, waits for them, then runs all copies the same way.
//! Workers get owned jobs and hand back owned results; only the controlling
//! task writes into the plan.
//!
//! The first worker failure stops the stage: queued workers never start,
//! running ones finish, and the error is returned once the pool drained.
//! Temp files of the failed directory are removed before returning.

use crate::copy::{copy, CopyJob};
use crate::plan::{PendingDirectory, SyncPlan};
use crate::transform::{remove_temp, TransformJob, TransformedFile, Transformer};
use futures::future::{BoxFuture, FutureExt};
use rocksync_config::Config;
use rocksync_types::{Error, NoopReporter, ProgressReporter, Result, Stage, SyncStats, ThreadCount};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Plan built, waiting for confirmation
    Planned,
    /// User agreed to the plan
    Confirmed,
    /// Transform stage of a directory is running
    Transforming,
    /// Copy stage of a directory is running
    Copying,
    /// Every directory was synced
    Done,
    /// Declined, empty, cancelled or failed
    Aborted,
}

/// Executes a [`SyncPlan`]
pub struct SyncPipeline {
    transformer: Arc<Transformer>,
    workers: usize,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
    state: SyncState,
}

impl std::fmt::Debug for SyncPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("transformer", &self.transformer)
            .field("workers", &self.workers)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SyncPipeline {
    /// Create a pipeline with two workers per CPU and no progress output
    pub fn new(transformer: Transformer) -> Self {
        Self {
            transformer: Arc::new(transformer),
            workers: default_workers(),
            reporter: Arc::new(NoopReporter),
            cancel: CancellationToken::new(),
            state: SyncState::Planned,
        }
    }

    /// Create a pipeline with ffmpeg, lofty and the configured pool size
    pub fn from_config(config: &Config) -> Self {
        Self::new(Transformer::from_config(config))
            .with_workers(config.performance.worker_count.get())
    }

    /// Set the worker pool size used by each stage
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(ThreadCount::MIN, ThreadCount::MAX);
        self
    }

    /// Set the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this pipeline
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Worker pool size
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Current state
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Record the user's answer to the confirmation prompt
    pub fn confirm(&mut self, approved: bool) -> Result<()> {
        if approved {
            self.state = SyncState::Confirmed;
            Ok(())
        } else {
            self.state = SyncState::Aborted;
            Err(Error::UserAbort)
        }
    }

    /// Run the plan
    ///
    /// An empty plan does nothing and succeeds. A plan that was not
    /// confirmed fails with [`Error::UserAbort`] before touching the disk.
    pub async fn execute(&mut self, plan: &mut SyncPlan) -> Result<SyncStats> {
        let start = Instant::now();
        let mut stats = SyncStats {
            files_planned: plan.files_planned(),
            bytes_planned: plan.bytes_planned(),
            ..SyncStats::new()
        };

        if plan.is_empty() {
            info!("Nothing to sync");
            self.state = SyncState::Aborted;
            return Ok(stats);
        }

        if self.state != SyncState::Confirmed {
            self.state = SyncState::Aborted;
            return Err(Error::UserAbort);
        }

        let outcome = self.run(plan, &mut stats).await;
        stats.duration = start.elapsed();

        match outcome {
            Ok(()) => {
                self.state = SyncState::Done;
                info!(
                    "Synced {} files ({} bytes) in {:?}",
                    stats.files_copied, stats.bytes_copied, stats.duration
                );
                self.reporter.report_completion(&stats);
                Ok(stats)
            }
            Err(error) => {
                self.state = SyncState::Aborted;
                warn!("Sync aborted: {}", error);
                self.reporter.report_error(&error);
                Err(error)
            }
        }
    }

    async fn run(&mut self, plan: &mut SyncPlan, stats: &mut SyncStats) -> Result<()> {
        if plan.transforms_enabled() {
            self.transformer.prepare().await?;
        }

        for slot in 0..plan.directories().len() {
            self.check_cancelled()?;

            if let Err(error) = self.sync_directory(plan, slot, stats).await {
                discard_temps(plan.directory_mut(slot)).await;
                return Err(error);
            }
        }

        Ok(())
    }

    async fn sync_directory(
        &mut self,
        plan: &mut SyncPlan,
        slot: usize,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let directory = &plan.directories()[slot];
        let relative: PathBuf = directory.relative_path.clone();
        let destination = directory.destination.clone();
        let file_count = directory.files.len();

        if !destination.is_dir() {
            tokio::fs::create_dir_all(&destination).await.map_err(|e| {
                Error::copy(&destination, format!("Failed to create directory: {}", e))
            })?;
            stats.directories_created += 1;
        }

        info!("Syncing {} ({} files)", relative.display(), file_count);

        if plan.transforms_enabled() {
            self.state = SyncState::Transforming;
            self.reporter
                .stage_started(Stage::Transform, &relative, file_count);
            self.transform_directory(plan, slot, stats).await?;
            self.check_cancelled()?;
        }

        self.state = SyncState::Copying;
        self.reporter.stage_started(Stage::Copy, &relative, file_count);
        self.copy_directory(plan, slot, stats).await
    }

    async fn transform_directory(
        &self,
        plan: &mut SyncPlan,
        slot: usize,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let jobs: Vec<TransformJob> = plan.directories()[slot]
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| TransformJob {
                index,
                source: file.source.clone(),
            })
            .collect();

        let transformer = Arc::clone(&self.transformer);
        let (transcode, convert_art) = (plan.transcode(), plan.convert_art());
        let reporter = Arc::clone(&self.reporter);

        self.run_stage(
            jobs,
            move |job: TransformJob| {
                let transformer = Arc::clone(&transformer);
                async move { transformer.transform(job, transcode, convert_art).await }.boxed()
            },
            |done: TransformedFile| {
                let file = &mut plan.directory_mut(slot).files[done.index];
                if done.temp_source.is_some() {
                    stats.files_transformed += 1;
                }
                file.temp_source = done.temp_source;
                file.final_name = Some(done.final_name);
                reporter.transform_completed(&file.source);
            },
        )
        .await
    }

    async fn copy_directory(
        &self,
        plan: &mut SyncPlan,
        slot: usize,
        stats: &mut SyncStats,
    ) -> Result<()> {
        let jobs: Vec<CopyJob> = plan.directories()[slot]
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| CopyJob {
                index,
                source: file.source.clone(),
                temp_source: file.temp_source.clone(),
                destination: file.destination_path(),
            })
            .collect();

        let reporter = Arc::clone(&self.reporter);

        self.run_stage(
            jobs,
            |job: CopyJob| {
                let index = job.index;
                async move { copy(job).await.map(|bytes| (index, bytes)) }.boxed()
            },
            |(index, bytes): (usize, u64)| {
                let file = &mut plan.directory_mut(slot).files[index];
                file.temp_source = None;
                let planned = file.size;
                reporter.copy_completed(&file.source, planned);
                plan.record_copy(planned);
                stats.files_copied += 1;
                stats.bytes_copied += bytes;
            },
        )
        .await
    }

    /// Run `work` for every job on the bounded pool, feeding results to `on_done`
    async fn run_stage<J, T, F>(
        &self,
        jobs: Vec<J>,
        work: F,
        mut on_done: impl FnMut(T),
    ) -> Result<()>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let stop = self.cancel.child_token();
        let work = Arc::new(work);
        let mut workers = JoinSet::new();

        for job in jobs {
            let semaphore = Arc::clone(&semaphore);
            let stop = stop.clone();
            let work = Arc::clone(&work);
            workers.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    () = stop.cancelled() => return None,
                    permit = semaphore.acquire_owned() => permit.ok()?,
                };
                if stop.is_cancelled() {
                    return None;
                }
                Some(work(job).await)
            });
        }

        let mut failure: Option<Error> = None;
        while let Some(joined) = workers.join_next().await {
            let outcome = match joined {
                Ok(Some(outcome)) => outcome,
                Ok(None) => continue,
                Err(e) => Err(Error::io(format!("Worker task failed: {}", e))),
            };

            match outcome {
                Ok(value) => on_done(value),
                Err(error) if failure.is_none() => {
                    debug!("Stopping stage after failure: {}", error);
                    semaphore.close();
                    stop.cancel();
                    failure = Some(error);
                }
                Err(error) => debug!("Further failure after abort: {}", error),
            }
        }

        match failure {
            Some(error) => Err(error),
            None if self.cancel.is_cancelled() => Err(Error::Cancelled),
            None => Ok(()),
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Default pool size: two workers per logical CPU
pub fn default_workers() -> usize {
    ThreadCount::default().get()
}

async fn discard_temps(directory: &mut PendingDirectory) {
    for file in &mut directory.files {
        if let Some(temp) = file.temp_source.take() {
            remove_temp(&temp).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{build_plan, PlanOptions};
    use async_trait::async_trait;
    use rocksync_media::{
        ArtConverter, ArtOutcome, AudioTranscoder, MediaError, MediaResult,
    };
    use rocksync_types::extension_of;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Copies input to output; `bad.*` fails at once, other files take a moment
    #[derive(Default)]
    struct SlowTranscoder {
        started: AtomicUsize,
    }

    #[async_trait]
    impl AudioTranscoder for SlowTranscoder {
        fn output_extension(&self) -> &str {
            "mp3"
        }

        fn can_transcode(&self, path: &Path) -> bool {
            extension_of(path).as_deref() == Some("flac")
        }

        async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if input.file_stem().is_some_and(|stem| stem == "bad") {
                return Err(MediaError::Transcode {
                    path: input.to_path_buf(),
                    message: "encoder crashed".to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::copy(input, output)
                .await
                .map_err(|e| MediaError::io(input, e))?;
            Ok(())
        }
    }

    struct NoArt;

    #[async_trait]
    impl ArtConverter for NoArt {
        fn supports(&self, _path: &Path) -> bool {
            true
        }

        async fn convert_art(&self, _path: &Path) -> MediaResult<ArtOutcome> {
            Ok(ArtOutcome::NoCover)
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn stage_started(&self, stage: Stage, relative_directory: &Path, files: usize) {
            self.events.lock().unwrap().push(format!(
                "{}: {} ({})",
                stage,
                relative_directory.display(),
                files
            ));
        }

        fn transform_completed(&self, _file: &Path) {
            self.events.lock().unwrap().push("transformed".to_string());
        }

        fn copy_completed(&self, _file: &Path, bytes: u64) {
            self.events.lock().unwrap().push(format!("copied {}", bytes));
        }

        fn report_error(&self, error: &Error) {
            self.events.lock().unwrap().push(format!("error {}", error));
        }

        fn report_completion(&self, stats: &SyncStats) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {}", stats.files_copied));
        }
    }

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        destination: PathBuf,
        scratch: PathBuf,
        transcoder: Arc<SlowTranscoder>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("library");
            let destination = temp.path().join("ipod");
            let scratch = temp.path().join("scratch");
            std::fs::create_dir_all(&source).unwrap();
            std::fs::create_dir_all(&destination).unwrap();
            Self {
                _temp: temp,
                source,
                destination,
                scratch,
                transcoder: Arc::new(SlowTranscoder::default()),
            }
        }

        fn song(&self, relative: &str, bytes: &[u8]) {
            let path = self.source.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, bytes).unwrap();
        }

        fn pipeline(&self) -> SyncPipeline {
            let transformer =
                Transformer::new(self.transcoder.clone(), Arc::new(NoArt), &self.scratch);
            SyncPipeline::new(transformer)
        }

        fn plan(&self, transcode: bool) -> SyncPlan {
            let options = PlanOptions::new().with_transcode(transcode);
            build_plan(&self.source, &self.destination, &options).unwrap()
        }

        fn scratch_entries(&self) -> usize {
            std::fs::read_dir(&self.scratch)
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    #[tokio::test]
    async fn test_plain_copy_updates_counters() {
        let fixture = Fixture::new();
        fixture.song("A/01.mp3", b"one");
        fixture.song("A/02.mp3", b"two!");
        fixture.song("B/01.mp3", b"x");

        let reporter = Arc::new(RecordingReporter::default());
        let mut pipeline = fixture.pipeline().with_reporter(reporter.clone());
        let mut plan = fixture.plan(false);
        pipeline.confirm(true).unwrap();

        let stats = pipeline.execute(&mut plan).await.unwrap();

        assert_eq!(pipeline.state(), SyncState::Done);
        assert_eq!(stats.files_copied, 3);
        assert_eq!(stats.bytes_copied, 8);
        assert_eq!(stats.directories_created, 2);
        assert!(stats.is_complete());
        assert_eq!(plan.files_completed(), 3);
        assert_eq!(plan.bytes_completed(), plan.bytes_planned());
        assert_eq!(
            std::fs::read(fixture.destination.join("A/02.mp3")).unwrap(),
            b"two!"
        );

        let events = reporter.events.lock().unwrap();
        assert_eq!(events[0], "Currently Syncing: A (2)");
        assert_eq!(events[3], "Currently Syncing: B (1)");
        assert_eq!(events.last().unwrap(), "done 3");
        assert!(!events.iter().any(|e| e == "transformed"));
    }

    #[tokio::test]
    async fn test_transcode_resolves_names_and_cleans_temps() {
        let fixture = Fixture::new();
        fixture.song("A/01.flac", b"lossless");
        fixture.song("A/02.mp3", b"lossy");

        let mut pipeline = fixture.pipeline().with_workers(2);
        let mut plan = fixture.plan(true);
        pipeline.confirm(true).unwrap();

        let stats = pipeline.execute(&mut plan).await.unwrap();

        assert_eq!(stats.files_transformed, 1);
        assert!(fixture.destination.join("A/01.mp3").exists());
        assert!(!fixture.destination.join("A/01.flac").exists());
        assert!(fixture.destination.join("A/02.mp3").exists());
        assert_eq!(fixture.scratch_entries(), 0);
        assert!(plan.directories()[0]
            .files
            .iter()
            .all(|file| file.temp_source.is_none()));
    }

    #[tokio::test]
    async fn test_stages_and_directories_never_overlap() {
        let fixture = Fixture::new();
        for name in ["A/01.flac", "A/02.flac", "A/03.flac", "B/01.flac", "B/02.flac"] {
            fixture.song(name, b"flac");
        }

        let reporter = Arc::new(RecordingReporter::default());
        let mut pipeline = fixture
            .pipeline()
            .with_workers(4)
            .with_reporter(reporter.clone());
        let mut plan = fixture.plan(true);
        pipeline.confirm(true).unwrap();

        pipeline.execute(&mut plan).await.unwrap();

        let events = reporter.events.lock().unwrap();
        let mut expected = vec!["Transcoding/Art: A (3)".to_string()];
        expected.extend(std::iter::repeat("transformed".to_string()).take(3));
        expected.push("Currently Syncing: A (3)".to_string());
        expected.extend(std::iter::repeat("copied 4".to_string()).take(3));
        expected.push("Transcoding/Art: B (2)".to_string());
        expected.extend(std::iter::repeat("transformed".to_string()).take(2));
        expected.push("Currently Syncing: B (2)".to_string());
        expected.extend(std::iter::repeat("copied 4".to_string()).take(2));
        expected.push("done 5".to_string());
        assert_eq!(*events, expected);
    }

    #[tokio::test]
    async fn test_failure_stops_queued_workers_and_cleans_up() {
        let fixture = Fixture::new();
        fixture.song("A/bad.flac", b"broken");
        for i in 0..8 {
            fixture.song(&format!("A/{:02}.flac", i + 10), b"fine");
        }
        fixture.song("B/01.mp3", b"later");

        let reporter = Arc::new(RecordingReporter::default());
        let mut pipeline = fixture
            .pipeline()
            .with_workers(1)
            .with_reporter(reporter.clone());
        let mut plan = fixture.plan(true);
        // bad.flac sorts after the numbered files; move it to the front of the queue
        plan.directory_mut(0).files.rotate_right(1);
        pipeline.confirm(true).unwrap();

        let result = pipeline.execute(&mut plan).await;

        match result {
            Err(Error::Transform { path, .. }) => assert!(path.ends_with("bad.flac")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(pipeline.state(), SyncState::Aborted);
        assert!(fixture.transcoder.started.load(Ordering::SeqCst) <= 2);
        assert_eq!(fixture.scratch_entries(), 0);
        assert_eq!(std::fs::read_dir(fixture.destination.join("A")).unwrap().count(), 0);
        assert!(!fixture.destination.join("B").exists());
        assert_eq!(plan.files_completed(), 0);
        assert!(reporter
            .events
            .lock()
            .unwrap()
            .last()
            .unwrap()
            .starts_with("error "));
    }

    #[tokio::test]
    async fn test_unconfirmed_plan_is_not_executed() {
        let fixture = Fixture::new();
        fixture.song("A/01.mp3", b"one");

        let mut pipeline = fixture.pipeline();
        let mut plan = fixture.plan(false);

        assert!(matches!(pipeline.confirm(false), Err(Error::UserAbort)));
        let result = pipeline.execute(&mut plan).await;

        assert!(matches!(result, Err(Error::UserAbort)));
        assert_eq!(pipeline.state(), SyncState::Aborted);
        assert!(!fixture.destination.join("A").exists());
    }

    #[tokio::test]
    async fn test_empty_plan_does_nothing() {
        let fixture = Fixture::new();

        let mut pipeline = fixture.pipeline();
        let mut plan = fixture.plan(true);

        let stats = pipeline.execute(&mut plan).await.unwrap();

        assert_eq!(stats, SyncStats::new());
        assert_eq!(pipeline.state(), SyncState::Aborted);
        assert!(!fixture.scratch.exists());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fixture = Fixture::new();
        fixture.song("A/01.mp3", b"one");

        let token = CancellationToken::new();
        let mut pipeline = fixture.pipeline().with_cancellation(token.clone());
        let mut plan = fixture.plan(false);
        pipeline.confirm(true).unwrap();
        token.cancel();

        let result = pipeline.execute(&mut plan).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!fixture.destination.join("A").exists());
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let fixture = Fixture::new();
        assert_eq!(fixture.pipeline().with_workers(0).workers(), 1);
        assert_eq!(fixture.pipeline().with_workers(10_000).workers(), 256);
        assert!(default_workers() >= 2);
        assert_eq!(default_workers(), ThreadCount::default().get());
        assert_eq!(fixture.pipeline().workers(), default_workers());
    }
}
