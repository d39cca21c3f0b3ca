//! Key-value storage seam
//!
//! The extension keeps configuration in a synced storage area and temporary
//! overrides in a local one. Each area is a [`KeyValueStore`]; the two are
//! never assumed to be the same physical store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use sb_core::overrides::is_override_key;

/// Capacity of the change notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Lists, settings and challenge configuration.
    Sync,
    /// Temporary overrides.
    Local,
}

/// Keys changed in one write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub area: StorageArea,
    pub keys: Vec<String>,
}

impl StorageChange {
    pub fn touches(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn touches_overrides(&self) -> bool {
        self.keys.iter().any(|k| is_override_key(k))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
}

/// One storage area.
///
/// Reads return only the keys that exist. Writes and removals notify
/// subscribers with the keys they touched.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn area(&self) -> StorageArea;

    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>, StoreError>;

    async fn get_all(&self) -> Result<Map<String, Value>, StoreError>;

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[String]) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// Process-local store, used by the CLI and by tests.
///
/// Reads and writes can be made to fail to exercise recovery paths.
pub struct MemoryStore {
    area: StorageArea,
    entries: Mutex<Map<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new(area: StorageArea) -> Self {
        Self::with_entries(area, Map::new())
    }

    pub fn with_entries(area: StorageArea, entries: Map<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            area,
            entries: Mutex::new(entries),
            changes,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Copy of everything stored.
    pub fn contents(&self) -> Map<String, Value> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{:?} area read failed", self.area)));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected(format!("{:?} area write failed", self.area)));
        }
        Ok(())
    }

    fn notify(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        // no subscribers is fine
        let _ = self.changes.send(StorageChange { area: self.area, keys });
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn area(&self) -> StorageArea {
        self.area
    }

    async fn get(&self, keys: &[String]) -> Result<Map<String, Value>, StoreError> {
        self.check_read()?;
        let entries = self.lock();
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn get_all(&self) -> Result<Map<String, Value>, StoreError> {
        self.check_read()?;
        Ok(self.contents())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<(), StoreError> {
        self.check_write()?;
        let keys: Vec<String> = entries.keys().cloned().collect();
        self.lock().extend(entries);
        self.notify(keys);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StoreError> {
        self.check_write()?;
        let removed: Vec<String> = {
            let mut entries = self.lock();
            keys.iter().filter(|key| entries.remove(*key).is_some()).cloned().collect()
        };
        self.notify(removed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
