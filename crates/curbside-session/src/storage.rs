//! Durable string key-value storage for the activity timestamp.
//!
//! The monitor only needs `get_item` / `set_item`, the same contract as a
//! browser's local storage. Writes are last-writer-wins across every
//! monitor sharing the store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Error, Result};

/// Default file name for [`FileStore`] within a data directory.
pub const STATE_FILE: &str = "session-state.json";

/// String-keyed store that outlives the monitor.
pub trait ActivityStore: Send + Sync + std::fmt::Debug {
    /// Read a value. Unreadable storage reads as absent.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Shared store handle.
pub type SharedActivityStore = Arc<dyn ActivityStore>;

// ============================================================================
// MemoryStore
// ============================================================================

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// FileStore
// ============================================================================

/// JSON file store, shared by every process pointing at the same path.
///
/// The file is re-read on every access so writes from other processes are
/// observed. A missing or corrupt file reads as empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Store at `data_dir/session-state.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self::with_path(data_dir.join(STATE_FILE))
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> HashMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session state file");
                return HashMap::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session state file");
            HashMap::new()
        })
    }
}

impl ActivityStore for FileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.read_map().remove(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage(key, e))?;
        }

        let json = serde_json::to_string_pretty(&map)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        // Write-then-rename so concurrent readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| Error::storage(key, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| Error::storage(key, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set_item("lastActivity", "42").unwrap();
        assert_eq!(other.get_item("lastActivity").as_deref(), Some("42"));
        assert_eq!(other.get_item("missing"), None);
    }

    #[test]
    fn test_file_store_round_trip_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get_item("lastActivity"), None);

        store.set_item("lastActivity", "1700000000000").unwrap();
        store.set_item("theme", "dark").unwrap();

        let reopened = FileStore::new(dir.path());
        assert_eq!(reopened.get_item("lastActivity").as_deref(), Some("1700000000000"));
        assert_eq!(reopened.get_item("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::with_path(path);
        assert_eq!(store.get_item("lastActivity"), None);
        store.set_item("lastActivity", "1").unwrap();
        assert_eq!(store.get_item("lastActivity").as_deref(), Some("1"));
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(&dir.path().join("nested").join("state"));
        store.set_item("k", "v").unwrap();
        assert!(store.path().exists());
    }
}
