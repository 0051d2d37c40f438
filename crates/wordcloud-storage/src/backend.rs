//! Snapshot persistence backends.
//!
//! The store is agnostic of where snapshots live. The JSON file backend is
//! what the server uses; the in-memory backend exists for tests and for
//! running without a data directory.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};
use wordcloud_core::{Error, Result, Snapshot};

/// Snapshot persistence trait.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotBackend: Send + Sync {
    /// Read the persisted snapshot.
    ///
    /// Returns `Ok(None)` if nothing has been persisted yet.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Human-readable location, used in log messages.
    fn describe(&self) -> String;
}

// =============================================================================
// JsonFileBackend - pretty-printed JSON file
// =============================================================================

/// Backend that stores the snapshot as a pretty-printed JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Snapshot>> {
        if !self.path.exists() {
            debug!(path = ?self.path, "Snapshot file does not exist");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Storage(format!(
                "Failed to read snapshot '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        let snapshot: Snapshot = serde_json::from_str(&contents).map_err(|e| {
            Error::Storage(format!(
                "Failed to parse snapshot '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(
            path = ?self.path,
            words = snapshot.words.len(),
            connections = snapshot.connections.len(),
            "Snapshot loaded"
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!(
                        "Failed to create data directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let contents = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();

        std::fs::write(&temp, contents).map_err(|e| {
            Error::Storage(format!("Failed to write '{}': {}", temp.display(), e))
        })?;

        if let Err(e) = std::fs::rename(&temp, &self.path) {
            warn!(path = ?self.path, error = %e, "Failed to replace snapshot file");
            let _ = std::fs::remove_file(&temp);
            return Err(Error::Storage(format!(
                "Failed to replace snapshot '{}': {}",
                self.path.display(),
                e
            )));
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// =============================================================================
// MemoryBackend - In-memory implementation
// =============================================================================

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    snapshot: RwLock<Option<Snapshot>>,
}

impl MemoryBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-populated with a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    /// The last saved snapshot.
    pub fn stored(&self) -> Option<Snapshot> {
        self.snapshot
            .read()
            .map(|s| (*s).clone())
            .unwrap_or_else(|e| (*e.into_inner()).clone())
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Snapshot>> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        Ok((*snapshot).clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut stored = self
            .snapshot
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?;
        *stored = Some(snapshot.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
