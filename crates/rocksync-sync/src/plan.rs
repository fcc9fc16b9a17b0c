//! Sync planning: what is missing on the device, grouped by directory
//!
//! A song counts as present on the device when a file with the same
//! directory-relative stem exists there under *any* recognized song
//! extension. `Album/01.flac` is therefore already synced when the device
//! holds `Album/01.mp3`, which is what a previous transcoding run produces.

use rocksync_config::Config;
use rocksync_types::{
    extension_of, normalize_extension, Error, Result, DEFAULT_IGNORE_NAMES, SONG_EXTENSIONS,
};
use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Options controlling how a plan is built
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Names skipped during traversal, together with their subtree
    pub ignore_names: HashSet<String>,
    /// Recognized song extensions, lower case and without the dot
    pub song_extensions: Vec<String>,
    /// Transcode transcodable songs during execution
    pub transcode: bool,
    /// Normalize cover art during execution
    pub convert_art: bool,
}

impl PlanOptions {
    /// Default ignore set and song extensions, no transforms
    pub fn new() -> Self {
        Self {
            ignore_names: DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect(),
            song_extensions: SONG_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            transcode: false,
            convert_art: false,
        }
    }

    /// Take the ignore set and extensions from configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            ignore_names: config.sync.ignore_names.iter().cloned().collect(),
            song_extensions: config
                .sync
                .song_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            transcode: false,
            convert_art: false,
        }
    }

    /// Add names to the ignore set
    pub fn with_ignore_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Enable or disable transcoding
    pub fn with_transcode(mut self, transcode: bool) -> Self {
        self.transcode = transcode;
        self
    }

    /// Enable or disable cover art conversion
    pub fn with_convert_art(mut self, convert_art: bool) -> Self {
        self.convert_art = convert_art;
        self
    }

    fn is_ignored(&self, name: &OsStr) -> bool {
        name.to_str()
            .is_some_and(|name| self.ignore_names.contains(name))
    }

    fn is_song(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.song_extensions.contains(&ext))
    }
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One file to bring onto the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// File in the source library
    pub source: PathBuf,
    /// Destination directory the file lands in
    pub target_directory: PathBuf,
    /// Size of the source file in bytes
    pub size: u64,
    /// Transformed copy waiting in the temp directory
    pub temp_source: Option<PathBuf>,
    /// File name on the device, known once the transform ran
    pub final_name: Option<OsString>,
}

impl PendingFile {
    /// File name of the source
    pub fn name(&self) -> &OsStr {
        self.source.file_name().unwrap_or_default()
    }

    /// Where the file will be written
    ///
    /// Before a transform resolved the final name this is the source name.
    pub fn destination_path(&self) -> PathBuf {
        let name = self.final_name.as_deref().unwrap_or_else(|| self.name());
        self.target_directory.join(name)
    }
}

/// One destination directory receiving at least one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDirectory {
    /// Path relative to the source root, used for display
    pub relative_path: PathBuf,
    /// Directory on the device
    pub destination: PathBuf,
    /// Whether `destination` already existed when the plan was built
    pub destination_exists: bool,
    /// Sum of the planned file sizes
    pub size: u64,
    /// Files to bring over, in discovery order
    pub files: Vec<PendingFile>,
}

/// Everything a sync run will do, grouped by destination directory
#[derive(Debug, Clone)]
pub struct SyncPlan {
    source_root: PathBuf,
    destination_root: PathBuf,
    transcode: bool,
    convert_art: bool,
    directories: Vec<PendingDirectory>,
    index: HashMap<PathBuf, usize>,
    files_planned: u64,
    bytes_planned: u64,
    files_completed: u64,
    bytes_completed: u64,
}

impl SyncPlan {
    fn new(source_root: &Path, destination_root: &Path, options: &PlanOptions) -> Self {
        Self {
            source_root: source_root.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            transcode: options.transcode,
            convert_art: options.convert_art,
            directories: Vec::new(),
            index: HashMap::new(),
            files_planned: 0,
            bytes_planned: 0,
            files_completed: 0,
            bytes_completed: 0,
        }
    }

    fn add_file(&mut self, source: PathBuf, target_directory: PathBuf, size: u64) {
        let slot = match self.index.get(&target_directory) {
            Some(&slot) => slot,
            None => {
                let relative_path = source
                    .parent()
                    .and_then(|parent| parent.strip_prefix(&self.source_root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                self.directories.push(PendingDirectory {
                    relative_path,
                    destination: target_directory.clone(),
                    destination_exists: target_directory.is_dir(),
                    size: 0,
                    files: Vec::new(),
                });
                self.index
                    .insert(target_directory.clone(), self.directories.len() - 1);
                self.directories.len() - 1
            }
        };

        let directory = &mut self.directories[slot];
        directory.size += size;
        directory.files.push(PendingFile {
            source,
            target_directory,
            size,
            temp_source: None,
            final_name: None,
        });

        self.files_planned += 1;
        self.bytes_planned += size;
    }

    /// Source library root
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Device root
    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Whether transcoding was requested
    pub fn transcode(&self) -> bool {
        self.transcode
    }

    /// Whether cover art conversion was requested
    pub fn convert_art(&self) -> bool {
        self.convert_art
    }

    /// Whether any file goes through the transform stage
    pub fn transforms_enabled(&self) -> bool {
        self.transcode || self.convert_art
    }

    /// Pending directories in discovery order
    pub fn directories(&self) -> &[PendingDirectory] {
        &self.directories
    }

    pub(crate) fn directory_mut(&mut self, slot: usize) -> &mut PendingDirectory {
        &mut self.directories[slot]
    }

    /// Pending directory for a destination directory
    pub fn directory(&self, destination: &Path) -> Option<&PendingDirectory> {
        self.index
            .get(destination)
            .map(|&slot| &self.directories[slot])
    }

    /// Whether there is nothing to sync
    pub fn is_empty(&self) -> bool {
        self.files_planned == 0
    }

    /// Number of planned files
    pub fn files_planned(&self) -> u64 {
        self.files_planned
    }

    /// Total planned bytes, measured on the source files
    pub fn bytes_planned(&self) -> u64 {
        self.bytes_planned
    }

    /// Files copied so far
    pub fn files_completed(&self) -> u64 {
        self.files_completed
    }

    /// Planned bytes of the files copied so far
    pub fn bytes_completed(&self) -> u64 {
        self.bytes_completed
    }

    pub(crate) fn record_copy(&mut self, planned_size: u64) {
        self.files_completed += 1;
        self.bytes_completed += planned_size;
    }
}

/// Diff `source_root` against `destination_root`
///
/// Fails with [`Error::Planning`] if either root is not an existing
/// directory; no partial plan is returned.
pub fn build_plan(
    source_root: &Path,
    destination_root: &Path,
    options: &PlanOptions,
) -> Result<SyncPlan> {
    ensure_directory(source_root)?;
    ensure_directory(destination_root)?;

    info!(
        "Planning sync {} -> {}",
        source_root.display(),
        destination_root.display()
    );

    let mut plan = SyncPlan::new(source_root, destination_root, options);
    let walker = WalkDir::new(source_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !options.is_ignored(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source_root).to_path_buf();
            Error::planning(path, e.to_string())
        })?;

        if !entry.file_type().is_file() || !options.is_song(entry.path()) {
            continue;
        }

        let relative_directory = entry
            .path()
            .parent()
            .and_then(|parent| parent.strip_prefix(source_root).ok())
            .unwrap_or_else(|| Path::new(""));
        let target_directory = if relative_directory.as_os_str().is_empty() {
            destination_root.to_path_buf()
        } else {
            destination_root.join(relative_directory)
        };

        if already_synced(&target_directory, entry.path(), &options.song_extensions) {
            debug!("Already on device: {}", entry.path().display());
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| Error::planning(entry.path(), e.to_string()))?
            .len();
        debug!("Planned {} ({} bytes)", entry.path().display(), size);
        plan.add_file(entry.into_path(), target_directory, size);
    }

    info!(
        "Planned {} files ({} bytes) in {} directories",
        plan.files_planned(),
        plan.bytes_planned(),
        plan.directories().len()
    );
    Ok(plan)
}

/// Whether a file with `source`'s stem exists in `target_directory` under any song extension
pub fn already_synced(target_directory: &Path, source: &Path, song_extensions: &[String]) -> bool {
    let Some(name) = source.file_name() else {
        return false;
    };
    let candidate = target_directory.join(name);

    if candidate.exists() {
        return true;
    }

    song_extensions
        .iter()
        .any(|ext| candidate.with_extension(ext).exists())
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::planning(path, "does not exist"));
    }
    if !path.is_dir() {
        return Err(Error::planning(path, "not a directory"));
    }
    Ok(())
}
