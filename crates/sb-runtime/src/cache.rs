//! Read-through cache of the synced configuration.
//!
//! The cache is never the source of truth. It is dropped on every change
//! notification from the synced area and rebuilt on the next read. When the
//! store cannot be read the last snapshot that could be is served instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use sb_core::config::{PolicySnapshot, BLOCK_LISTS_KEY, CHALLENGE_SETTINGS_KEY, SETTINGS_KEY};

use crate::store::{KeyValueStore, StoreError};

#[derive(Default)]
struct CacheState {
    current: Option<Arc<PolicySnapshot>>,
    last_known: Option<Arc<PolicySnapshot>>,
}

pub struct PolicyCache {
    sync: Arc<dyn KeyValueStore>,
    state: Mutex<CacheState>,
    generation: AtomicU64,
}

impl PolicyCache {
    pub fn new(sync: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sync,
            state: Mutex::new(CacheState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// The current configuration, or the last known one if the store is
    /// unreadable. Errors only when nothing was ever read.
    pub async fn load(&self) -> Result<Arc<PolicySnapshot>, StoreError> {
        if let Some(current) = self.lock().current.clone() {
            return Ok(current);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let keys = [BLOCK_LISTS_KEY, SETTINGS_KEY, CHALLENGE_SETTINGS_KEY].map(String::from);

        match self.sync.get(&keys).await {
            Ok(area) => {
                let snapshot = Arc::new(PolicySnapshot::from_sync_area(&area));
                let mut state = self.lock();
                // an invalidation during the read makes this snapshot stale
                if self.generation.load(Ordering::SeqCst) == generation {
                    state.current = Some(snapshot.clone());
                }
                state.last_known = Some(snapshot.clone());
                debug!("Loaded {} block lists", snapshot.lists.len());
                Ok(snapshot)
            }
            Err(e) => match self.lock().last_known.clone() {
                Some(last_known) => {
                    warn!("Configuration read failed ({e}), using last known");
                    Ok(last_known)
                }
                None => Err(e),
            },
        }
    }

    /// Like [`load`](Self::load), but with defaults (blocking on, no lists)
    /// when nothing can be read.
    pub async fn current(&self) -> Arc<PolicySnapshot> {
        self.load().await.unwrap_or_else(|e| {
            warn!("Configuration read failed ({e}), using defaults");
            Arc::new(PolicySnapshot::default())
        })
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.lock().current = None;
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StorageArea};
    use serde_json::{json, Map, Value};

    fn area(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_cached_until_invalidated() {
        let sync = Arc::new(MemoryStore::with_entries(
            StorageArea::Sync,
            area(json!({ "blockLists": [{ "id": "a", "enabled": true, "websites": ["a.com"] }] })),
        ));
        let cache = PolicyCache::new(sync.clone());
        assert_eq!(cache.current().await.lists.len(), 1);

        sync.set(area(json!({ "blockLists": [] }))).await.unwrap();
        assert_eq!(cache.current().await.lists.len(), 1);

        cache.invalidate();
        assert!(cache.current().await.lists.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_serves_last_known() {
        let sync = Arc::new(MemoryStore::with_entries(
            StorageArea::Sync,
            area(json!({ "settings": { "blockingEnabled": false } })),
        ));
        let cache = PolicyCache::new(sync.clone());
        assert!(!cache.current().await.settings.blocking_enabled);

        cache.invalidate();
        sync.set_fail_reads(true);
        assert!(!cache.load().await.unwrap().settings.blocking_enabled);
    }

    #[tokio::test]
    async fn test_read_failure_without_history() {
        let sync = Arc::new(MemoryStore::new(StorageArea::Sync));
        sync.set_fail_reads(true);
        let cache = PolicyCache::new(sync);
        assert!(cache.load().await.is_err());
        let fallback = cache.current().await;
        assert!(fallback.settings.blocking_enabled);
        assert!(fallback.lists.is_empty());
    }
}
