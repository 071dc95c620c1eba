//! Durable storage for the engine snapshot.
//!
//! - `file`: JSON flat file with atomic temp-file + rename writes
//! - [`MemoryStore`]: in-memory store for tests, with injectable write failures
//!
//! `load` never fails: a missing or unusable snapshot yields the store's
//! default state. `save` reports failures to the caller but never panics.

pub mod error;
pub mod file;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub use error::PersistenceError;
pub use file::{JsonFileStore, SNAPSHOT_FILE_NAME};

use crate::types::EngineSnapshot;

/// Durable key-value snapshot storage.
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, or defaults if none is usable.
    fn load(&self) -> EngineSnapshot;

    /// Writes the snapshot synchronously.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the snapshot could not be made durable.
    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), PersistenceError>;
}

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Mutex<Option<EngineSnapshot>>,
    fail_writes: AtomicBool,
    save_count: AtomicUsize,
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: EngineSnapshot) -> Self {
        let store = Self::new();
        *store.lock() = Some(snapshot);
        store
    }

    /// Makes subsequent saves fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the last successfully saved snapshot.
    #[must_use]
    pub fn stored(&self) -> Option<EngineSnapshot> {
        self.lock().clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.inner.save_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<EngineSnapshot>> {
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> EngineSnapshot {
        let mut snapshot = self.stored().unwrap_or_default();
        snapshot.sanitize();
        snapshot
    }

    fn save(&self, snapshot: &EngineSnapshot) -> Result<(), PersistenceError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "書き込みが無効化されています".to_string(),
            ));
        }
        *self.lock() = Some(snapshot.clone());
        self.inner.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
