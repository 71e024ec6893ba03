//! Spool Directory
//!
//! One JSON file per prompt queued while the state database was held by
//! another invocation. Files are written to a temporary name, synced and
//! renamed, so a reader never sees a partial prompt.

use super::QueuedMessage;
use crate::error::StorageError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const SPOOL_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "partial";

pub struct Spool {
    dir: PathBuf,
}

impl Spool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unique per prompt across processes; sorts by enqueue time.
    fn file_name(message: &QueuedMessage) -> String {
        format!(
            "{:020}-{}-{}.{}",
            message.enqueued_at.timestamp_nanos_opt().unwrap_or_default(),
            std::process::id(),
            message.id,
            SPOOL_EXTENSION
        )
    }

    pub fn write(&self, message: &QueuedMessage) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(Self::file_name(message));
        let partial = path.with_extension(PARTIAL_EXTENSION);

        let encoded =
            serde_json::to_vec(message).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut file = fs::File::create(&partial)?;
        file.write_all(&encoded)?;
        file.sync_all()?;
        fs::rename(&partial, &path)?;
        Ok(path)
    }

    /// Drop the file of a prompt whose upload was confirmed.
    pub fn release(&self, message: &QueuedMessage) -> Result<(), StorageError> {
        self.discard(&self.dir.join(Self::file_name(message)))
    }

    /// Remove a spool file; already gone is fine.
    pub fn discard(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Spooled prompts oldest first. Unreadable files are skipped and kept.
    pub fn entries(&self) -> Result<Vec<(PathBuf, QueuedMessage)>, StorageError> {
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in listing {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SPOOL_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let decoded = fs::read(&path)
                .map_err(StorageError::from)
                .and_then(|raw| {
                    serde_json::from_slice::<QueuedMessage>(&raw)
                        .map_err(|e| StorageError::Serialization(e.to_string()))
                });
            match decoded {
                Ok(message) => entries.push((path, message)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable spool file"),
            }
        }
        Ok(entries)
    }
}
