//! Library and device fixtures for rocksync tests and benchmarks

use rocksync_sync::{SyncPipeline, Transformer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use crate::fakes::{FakeArtConverter, FakeTranscoder};

/// One mebibyte
pub const MB: usize = 1024 * 1024;

/// A library, a device and a scratch directory under one temp root
pub struct LibraryFixture {
    _root: TempDir,
    /// Music library to sync from
    pub source: PathBuf,
    /// Device to sync to
    pub destination: PathBuf,
    /// Directory for temporary transform output
    pub scratch: PathBuf,
    /// Transcoder used by [`LibraryFixture::pipeline`]
    pub transcoder: Arc<FakeTranscoder>,
    /// Art converter used by [`LibraryFixture::pipeline`]
    pub art: Arc<FakeArtConverter>,
}

impl LibraryFixture {
    /// Empty library and empty device
    pub fn new() -> std::io::Result<Self> {
        Self::with_transcoder(FakeTranscoder::new())
    }

    /// Empty fixture whose pipeline uses `transcoder`
    pub fn with_transcoder(transcoder: FakeTranscoder) -> std::io::Result<Self> {
        let root = TempDir::new()?;
        let source = root.path().join("src");
        let destination = root.path().join("dst");
        let scratch = root.path().join("scratch");
        fs::create_dir_all(&source)?;
        fs::create_dir_all(&destination)?;

        Ok(Self {
            _root: root,
            source,
            destination,
            scratch,
            transcoder: Arc::new(transcoder),
            art: Arc::new(FakeArtConverter::new()),
        })
    }

    /// Write a library song of `size` bytes with deterministic content
    pub fn add_song(&self, relative: &str, size: usize) -> std::io::Result<PathBuf> {
        let path = self.source.join(relative);
        write_file(&path, &song_content(size))?;
        Ok(path)
    }

    /// Write a file that is already on the device
    pub fn add_device_file(&self, relative: &str, size: usize) -> std::io::Result<PathBuf> {
        let path = self.destination.join(relative);
        write_file(&path, &song_content(size))?;
        Ok(path)
    }

    /// Create an empty directory on the device
    pub fn add_device_directory(&self, relative: &str) -> std::io::Result<PathBuf> {
        let path = self.destination.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Path of `relative` on the device
    pub fn device_path(&self, relative: &str) -> PathBuf {
        self.destination.join(relative)
    }

    /// Pipeline wired to the fixture's fakes and scratch directory
    pub fn pipeline(&self) -> SyncPipeline {
        let transformer = Transformer::new(
            self.transcoder.clone(),
            self.art.clone(),
            self.scratch.clone(),
        );
        SyncPipeline::new(transformer)
    }

    /// Files left in the scratch directory
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        list_files(&self.scratch)
    }
}

/// Deterministic, non-constant song bytes
pub fn song_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Write `content`, creating parent directories
pub fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Regular files directly inside `directory`, sorted; empty if it is missing
pub fn list_files(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// Build a synthetic library of `albums` directories with `songs` each
pub fn create_library(root: &Path, albums: usize, songs: usize, size: usize) -> std::io::Result<()> {
    let content = song_content(size);
    for album in 0..albums {
        let directory = root.join(format!("Artist {:02}/Album {:02}", album % 7, album));
        fs::create_dir_all(&directory)?;
        for song in 0..songs {
            let extension = ["flac", "mp3", "m4a"][song % 3];
            fs::write(directory.join(format!("{:02} Track.{}", song + 1, extension)), &content)?;
        }
    }
    Ok(())
}
