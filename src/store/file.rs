//! JSON flat-file snapshot store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::error::PersistenceError;
use super::SnapshotStore;
use crate::types::EngineSnapshot;

/// File name used inside the data directory.
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Stores the snapshot as a single JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    fallback: EngineSnapshot,
}

impl JsonFileStore {
    /// Creates a store at `path` that falls back to `EngineSnapshot::default()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: EngineSnapshot::default(),
        }
    }

    /// Sets the snapshot returned on first launch or when the file is corrupt.
    #[must_use]
    pub fn with_fallback(mut self, fallback: EngineSnapshot) -> Self {
        self.fallback = fallback;
        self
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the snapshot, distinguishing "absent" from "broken".
    ///
    /// # Errors
    ///
    /// Returns `Unreadable` or `Corrupt` if a file exists but cannot be used.
    pub fn try_load(&self) -> Result<Option<EngineSnapshot>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Unreadable {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut snapshot: EngineSnapshot =
            serde_json::from_str(&contents).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        snapshot.sanitize();
        Ok(Some(snapshot))
    }

    fn write_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> EngineSnapshot {
        match self.try_load() {
            Ok(Some(snapshot)) => {
                debug!(path = %self.path.display(), "スナップショットを読み込みました");
                snapshot
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "スナップショットがないため既定値で起動します");
                self.fallback.clone()
            }
            Err(e) => {
                warn!("{}。既定値で起動します", e);
                self.fallback.clone()
            }
        }
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), PersistenceError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.write_error(e))?;

        let json = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::Encode)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(&json).map_err(|e| self.write_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_error(e.error))?;

        Ok(())
    }
}
