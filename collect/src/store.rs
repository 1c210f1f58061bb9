//! Snapshot stores.
//!
//! A store holds the latest [`Snapshot`] for a consumer. Snapshots are
//! replaced wholesale: `put` swaps the whole value, so readers see either the
//! previous snapshot or the new one, never a mix.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use portscope_core::Snapshot;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// Holder of the current snapshot.
pub trait SnapshotStore: Send + Sync {
    /// Returns the stored snapshot, if any.
    fn get(&self) -> Option<Arc<Snapshot>>;

    /// Replaces the stored snapshot.
    fn put(&self, snapshot: Arc<Snapshot>) -> Result<()>;

    /// Drops the stored snapshot.
    fn invalidate(&self) -> Result<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self) -> Option<Arc<Snapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn put(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(snapshot);
        Ok(())
    }

    fn invalidate(&self) -> Result<()> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
        Ok(())
    }
}

/// JSON file store shared between invocations of the CLI.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    cache_dir: PathBuf,
}

const SNAPSHOT_FILE: &str = "snapshot.json";

impl FileSnapshotStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Default cache directory (`$XDG_CACHE_HOME/portscope` or
    /// `~/.cache/portscope`).
    pub fn default_dir() -> PathBuf {
        dirs_cache_dir().join("portscope")
    }

    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(SNAPSHOT_FILE)
    }
}

impl SnapshotStore for FileSnapshotStore {
    /// Unreadable or corrupt files read as a miss.
    fn get(&self) -> Option<Arc<Snapshot>> {
        let raw = fs::read_to_string(self.path()).ok()?;
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => Some(Arc::new(snapshot)),
            Err(e) => {
                debug!(path = %self.path().display(), error = %e, "Ignoring corrupt snapshot cache");
                None
            }
        }
    }

    fn put(&self, snapshot: Arc<Snapshot>) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let json = serde_json::to_string_pretty(snapshot.as_ref())?;
        // Write then rename so readers never see a half-written file.
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.path()).map_err(|e| e.error)?;
        Ok(())
    }

    fn invalidate(&self) -> Result<()> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn dirs_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache");
    }
    std::env::temp_dir()
}
