//! Key-value store backends.
//!
//! The container only needs get/set/delete/enumerate-by-prefix over string
//! keys and JSON values. The store is shared by every role; isolation comes
//! from the key-naming discipline in [`super::namespace`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Store Trait
// ─────────────────────────────────────────────────────────────────

/// Persistent key-value store consumed by the container.
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs (e.g. "memory", "file")
    fn name(&self) -> &'static str;

    /// Read a value
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or replace a value
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a value, returning whether it existed
    fn delete(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, in lexical order
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove every key starting with `prefix` in one step, returning how many went
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;
}

// ─────────────────────────────────────────────────────────────────
// Backend Selection
// ─────────────────────────────────────────────────────────────────

/// Which store backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map, lost on exit
    Memory,
    /// Single JSON document under the data directory
    File,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Memory
    }
}

/// File name of the JSON store inside the data directory.
pub const STORE_FILE: &str = "role-state.json";

/// Open the configured backend.
pub fn open_store(backend: StoreBackend, data_dir: &Path) -> Result<Arc<dyn KeyValueStore>> {
    match backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(JsonFileStore::open(data_dir.join(STORE_FILE))?)),
    }
}

fn prefixed_keys(map: &BTreeMap<String, Value>, prefix: &str) -> Vec<String> {
    map.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, _)| k.clone())
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(prefixed_keys(&self.entries.read(), prefix))
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }
}

// ─────────────────────────────────────────────────────────────────
// JSON File Store
// ─────────────────────────────────────────────────────────────────

/// Store persisted as one JSON object, rewritten on every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            BTreeMap::new()
        };

        info!(path = %path.display(), entries = entries.len(), "File store opened");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the entries and swap it in once it is on disk.
    ///
    /// `change` returns `None` when it left the map untouched; nothing is written then.
    fn commit<T>(&self, change: impl FnOnce(&mut BTreeMap<String, Value>) -> Option<T>) -> Result<Option<T>> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        let Some(outcome) = change(&mut next) else {
            return Ok(None);
        };
        self.persist(&next)?;
        *entries = next;
        Ok(Some(outcome))
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| Error::storage_write(format!("{}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), entries = entries.len(), "File store persisted");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value);
            Some(())
        })
        .map(|_| ())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.commit(|entries| entries.remove(key).map(|_| ()))?;
        Ok(removed.is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(prefixed_keys(&self.entries.read(), prefix))
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let removed = self.commit(|entries| {
            let before = entries.len();
            entries.retain(|k, _| !k.starts_with(prefix));
            let removed = before - entries.len();
            (removed > 0).then_some(removed)
        })?;
        Ok(removed.unwrap_or(0))
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
