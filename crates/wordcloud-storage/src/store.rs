//! The persistent state store.
//!
//! [`StateStore`] owns the live snapshot. All writes go through
//! [`StateStore::mutate`], which holds a single lock for the whole
//! apply-stamp-persist sequence, so concurrent callers (the stdio dispatcher
//! and HTTP handlers) can never interleave partial snapshot writes.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};
use wordcloud_core::types::timestamp;
use wordcloud_core::{Result, Snapshot};

use crate::backend::SnapshotBackend;

/// In-memory snapshot with write-through persistence.
pub struct StateStore {
    snapshot: Mutex<Snapshot>,
    backend: Box<dyn SnapshotBackend>,
}

impl StateStore {
    /// Create a store over `backend` and load whatever it holds.
    pub fn open(backend: impl SnapshotBackend + 'static) -> Result<Self> {
        let store = Self {
            snapshot: Mutex::new(Snapshot::new()),
            backend: Box::new(backend),
        };
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory snapshot with the persisted one.
    ///
    /// An empty backend yields an empty snapshot.
    pub fn load(&self) -> Result<()> {
        let mut current = self.lock();
        match self.backend.load()? {
            Some(snapshot) => {
                info!(
                    location = %self.backend.describe(),
                    words = snapshot.words.len(),
                    connections = snapshot.connections.len(),
                    "Loaded word cloud"
                );
                *current = snapshot;
            }
            None => {
                info!(location = %self.backend.describe(), "Starting with an empty word cloud");
                *current = Snapshot::new();
            }
        }
        Ok(())
    }

    /// Apply `f` to the snapshot and persist the result.
    ///
    /// `f` works on a copy. If it fails, or the write to the backend fails,
    /// the committed snapshot is left exactly as it was. On success
    /// `last_update` is stamped and the new snapshot is durable before this
    /// returns.
    pub fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        self.mutate_tracked(f).map(|(value, _)| value)
    }

    /// Like [`StateStore::mutate`], also reporting whether anything changed.
    ///
    /// A closure that leaves the snapshot as it found it commits nothing:
    /// `last_update` is not stamped and the backend is not written.
    pub fn mutate_tracked<T, F>(&self, f: F) -> Result<(T, bool)>
    where
        F: FnOnce(&mut Snapshot) -> Result<T>,
    {
        let mut current = self.lock();
        let mut next = current.clone();

        let value = f(&mut next)?;
        if next == *current {
            debug!("Word cloud unchanged");
            return Ok((value, false));
        }
        next.last_update = Some(timestamp());

        if let Err(e) = self.backend.save(&next) {
            warn!(location = %self.backend.describe(), error = %e, "Failed to persist word cloud");
            return Err(e);
        }

        debug!(
            words = next.words.len(),
            connections = next.connections.len(),
            "Word cloud updated"
        );
        *current = next;
        Ok((value, true))
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().clone()
    }

    // A panic inside a mutation closure only ever touches the working copy,
    // so the committed snapshot behind a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
