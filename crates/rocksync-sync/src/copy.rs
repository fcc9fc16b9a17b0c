//! Copy stage: put a (possibly transformed) file into its device directory

use crate::transform::remove_temp;
use rocksync_types::{Error, Result};
use std::path::PathBuf;
use tracing::debug;

/// Input of one copy, handed to a worker by value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    /// Position of the file inside its pending directory
    pub index: usize,
    /// File in the source library
    pub source: PathBuf,
    /// Transformed temp file to copy instead of `source`
    pub temp_source: Option<PathBuf>,
    /// Final path on the device
    pub destination: PathBuf,
}

impl CopyJob {
    /// The file actually read
    pub fn effective_source(&self) -> &std::path::Path {
        self.temp_source.as_deref().unwrap_or(&self.source)
    }
}

/// Copy one file and return the number of bytes written
///
/// The destination directory must exist. A temp source is deleted after a
/// successful copy; on failure it is left for the caller to clean up.
pub async fn copy(job: CopyJob) -> Result<u64> {
    let from = job.effective_source();

    let bytes = tokio::fs::copy(from, &job.destination)
        .await
        .map_err(|e| {
            Error::copy(
                &job.source,
                format!(
                    "Failed to copy '{}' to '{}': {}",
                    from.display(),
                    job.destination.display(),
                    e
                ),
            )
        })?;

    debug!(
        "Copied {} -> {} ({} bytes)",
        from.display(),
        job.destination.display(),
        bytes
    );

    if let Some(temp) = &job.temp_source {
        remove_temp(temp).await;
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_original() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("01.mp3");
        std::fs::write(&source, b"song bytes").unwrap();
        let destination = temp_dir.path().join("out.mp3");

        let bytes = copy(CopyJob {
            index: 0,
            source: source.clone(),
            temp_source: None,
            destination: destination.clone(),
        })
        .await
        .unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(std::fs::read(&destination).unwrap(), b"song bytes");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_copy_temp_and_delete_it() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("01.flac");
        std::fs::write(&source, b"flac").unwrap();
        let temp = temp_dir.path().join("5c1e.mp3");
        std::fs::write(&temp, b"transcoded").unwrap();
        let destination = temp_dir.path().join("01.mp3");

        let bytes = copy(CopyJob {
            index: 0,
            source: source.clone(),
            temp_source: Some(temp.clone()),
            destination: destination.clone(),
        })
        .await
        .unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(std::fs::read(&destination).unwrap(), b"transcoded");
        assert!(!temp.exists());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_missing_destination_directory() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("01.mp3");
        std::fs::write(&source, b"x").unwrap();
        let temp = temp_dir.path().join("t.mp3");
        std::fs::write(&temp, b"x").unwrap();

        let result = copy(CopyJob {
            index: 0,
            source: source.clone(),
            temp_source: Some(temp.clone()),
            destination: temp_dir.path().join("missing/01.mp3"),
        })
        .await;

        match result {
            Err(Error::Copy { path, .. }) => assert_eq!(path, source),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(temp.exists());
    }
}
