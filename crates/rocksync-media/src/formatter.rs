//! Recursive cover art normalization over a library tree

use crate::cover::{ArtConverter, ArtOutcome, CoverArtConverter};
use crate::error::{MediaError, MediaResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Event emitted while a tree is being formatted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtEvent<'a> {
    /// First supported file found in this directory
    Directory(&'a Path),
    /// A supported file is about to be converted
    File(&'a Path),
}

/// Summary of a formatting run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtReport {
    /// Files whose art was actually re-encoded
    pub files_processed: u64,
    /// Directories that contained at least one supported file, in visit order
    pub directories: Vec<PathBuf>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

/// Walks a file or directory and normalizes every cover it finds
pub struct ArtTreeFormatter {
    converter: Arc<dyn ArtConverter>,
    ignore_names: HashSet<String>,
}

impl ArtTreeFormatter {
    /// Create a formatter using [`CoverArtConverter`]
    pub fn new() -> Self {
        Self::with_converter(Arc::new(CoverArtConverter::new()))
    }

    /// Create a formatter using the given converter
    pub fn with_converter(converter: Arc<dyn ArtConverter>) -> Self {
        Self {
            converter,
            ignore_names: HashSet::new(),
        }
    }

    /// Skip files and directories with these names
    pub fn with_ignore_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Format `path`, calling `on_event` before each directory and file
    pub async fn format<F>(&self, path: &Path, mut on_event: F) -> MediaResult<ArtReport>
    where
        F: FnMut(ArtEvent<'_>),
    {
        if !path.exists() {
            return Err(MediaError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not find file/directory",
                ),
            ));
        }

        let start = Instant::now();
        let mut report = ArtReport::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for file in self.collect_files(path)? {
            let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();
            if seen.insert(parent.clone()) {
                on_event(ArtEvent::Directory(&parent));
                report.directories.push(parent);
            }

            on_event(ArtEvent::File(&file));
            match self.converter.convert_art(&file).await? {
                ArtOutcome::Converted => report.files_processed += 1,
                ArtOutcome::NoCover => debug!("Skipped {} (no cover)", file.display()),
            }
        }

        report.duration = start.elapsed();
        info!(
            "Formatted {} files in {} directories",
            report.files_processed,
            report.directories.len()
        );
        Ok(report)
    }

    fn collect_files(&self, root: &Path) -> MediaResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_ignored(entry.path()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                MediaError::io(path, e.into())
            })?;

            if entry.file_type().is_file() && self.converter.supports(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.ignore_names.contains(name))
    }
}

impl Default for ArtTreeFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rocksync_types::extension_of;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Reports a cover for mp3 files only and records what it saw
    #[derive(Default)]
    struct RecordingConverter {
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ArtConverter for RecordingConverter {
        fn supports(&self, path: &Path) -> bool {
            matches!(extension_of(path).as_deref(), Some("mp3" | "flac" | "jpg"))
        }

        async fn convert_art(&self, path: &Path) -> MediaResult<ArtOutcome> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            if extension_of(path).as_deref() == Some("mp3") {
                Ok(ArtOutcome::Converted)
            } else {
                Ok(ArtOutcome::NoCover)
            }
        }
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn test_tree_walk_and_counts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("A/Album/01.mp3"));
        touch(&root.join("A/Album/02.flac"));
        touch(&root.join("A/Album/notes.txt"));
        touch(&root.join("B/Other/01.mp3"));
        touch(&root.join(".stversions/Old/01.mp3"));

        let converter = Arc::new(RecordingConverter::default());
        let formatter = ArtTreeFormatter::with_converter(converter.clone())
            .with_ignore_names([".stversions"]);

        let mut events = Vec::new();
        let report = formatter
            .format(root, |event| {
                events.push(match event {
                    ArtEvent::Directory(dir) => format!("dir {}", dir.display()),
                    ArtEvent::File(file) => format!("file {}", file.display()),
                })
            })
            .await
            .unwrap();

        assert_eq!(report.files_processed, 2);
        assert_eq!(
            report.directories,
            vec![root.join("A/Album"), root.join("B/Other")]
        );
        assert_eq!(converter.seen.lock().unwrap().len(), 3);
        assert_eq!(events.len(), 5);
        assert!(events[0].starts_with("dir "));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_entries_are_formatted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        let store = temp_dir.path().join("store");
        touch(&store.join("Album/01.mp3"));
        touch(&store.join("02.mp3"));
        std::fs::create_dir_all(root.join("Singles")).unwrap();
        std::os::unix::fs::symlink(store.join("Album"), root.join("AlbumLink")).unwrap();
        std::os::unix::fs::symlink(store.join("02.mp3"), root.join("Singles/02.mp3")).unwrap();

        let converter = Arc::new(RecordingConverter::default());
        let report = ArtTreeFormatter::with_converter(converter.clone())
            .format(&root, |_| {})
            .await
            .unwrap();

        assert_eq!(report.files_processed, 2);
        assert_eq!(
            *converter.seen.lock().unwrap(),
            vec![root.join("AlbumLink/01.mp3"), root.join("Singles/02.mp3")]
        );
    }

    #[tokio::test]
    async fn test_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("cover.jpg");
        touch(&file);

        let formatter =
            ArtTreeFormatter::with_converter(Arc::new(RecordingConverter::default()));
        let report = formatter.format(&file, |_| {}).await.unwrap();

        assert_eq!(report.files_processed, 0);
        assert_eq!(report.directories, vec![temp_dir.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn test_missing_path() {
        let result = ArtTreeFormatter::new()
            .format(Path::new("/no/such/library"), |_| {})
            .await;

        match result {
            Err(MediaError::Io { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
                assert!(source.to_string().contains("Could not find file/directory"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
