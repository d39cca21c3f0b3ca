//! Temporary override store
//!
//! Stores override expiries in the local storage area and answers whether a
//! host is currently unblocked. Checks clean up expired keys as they find
//! them; the periodic sweep removes the rest. A failed primary read falls
//! back to the optional secondary store, and failing that to "not
//! overridden".

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{Map, Value};

use sb_core::overrides::{
    fallback_key, grant_entries, grant_expiry, override_key, override_keys, parse_expiry, OverrideCheck,
    OverrideSnapshot,
};
use sb_core::url::strip_www;

use crate::clock::Clock;
use crate::store::{KeyValueStore, StoreError};

pub struct TemporaryOverrideStore {
    local: Arc<dyn KeyValueStore>,
    fallback: Option<Arc<dyn KeyValueStore>>,
    clock: Arc<dyn Clock>,
}

impl TemporaryOverrideStore {
    pub fn new(local: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            local,
            fallback: None,
            clock,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn KeyValueStore>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.local
    }

    pub async fn is_overridden(&self, host: &str) -> bool {
        self.lookup(host).await.active
    }

    /// Check `host` and delete any of its keys that have expired.
    pub async fn lookup(&self, host: &str) -> OverrideCheck {
        self.snapshot_for(host).await.check(host, self.clock.now_ms())
    }

    /// The override entries relevant to `host`, expired ones already
    /// removed from storage.
    pub async fn snapshot_for(&self, host: &str) -> OverrideSnapshot {
        let now = self.clock.now_ms();
        let keys = override_keys(host);

        let entries = match self.local.get(&keys).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Override read for {host} failed: {e}");
                return self.fallback_snapshot(host).await;
            }
        };

        let mut snapshot = OverrideSnapshot::from_entries(&entries);
        let expired = snapshot.check(host, now).expired_keys;
        if !expired.is_empty() {
            match self.local.remove(&expired).await {
                Ok(()) => debug!("Removed expired overrides {expired:?}"),
                Err(e) => warn!("Could not remove expired overrides {expired:?}: {e}"),
            }
            snapshot.forget(&expired);
        }
        snapshot
    }

    /// Unblock `domain` for `duration_minutes` from now. Returns the expiry.
    pub async fn grant(&self, domain: &str, duration_minutes: u32) -> Result<i64, StoreError> {
        let until = grant_expiry(duration_minutes, self.clock.now_ms());
        self.set_until(domain, until).await?;
        Ok(until)
    }

    /// Unblock `domain` and its `www.` form until `until_ms`.
    pub async fn set_until(&self, domain: &str, until_ms: i64) -> Result<(), StoreError> {
        let entries: Map<String, Value> = grant_entries(domain, until_ms)
            .into_iter()
            .map(|(key, expiry)| (key, Value::from(expiry)))
            .collect();
        self.local.set(entries).await?;
        info!("Temporarily unblocked {} until {until_ms}", strip_www(domain));

        if let Some(fallback) = &self.fallback {
            let mut entry = Map::new();
            entry.insert(fallback_key(domain), Value::from(until_ms));
            if let Err(e) = fallback.set(entry).await {
                debug!("Fallback override write failed: {e}");
            }
        }
        Ok(())
    }

    /// Every override entry in the local area.
    pub async fn snapshot_all(&self) -> Result<OverrideSnapshot, StoreError> {
        let all = self.local.get_all().await?;
        Ok(OverrideSnapshot::from_entries(&all))
    }

    /// Delete every override whose expiry has passed. Values that are not
    /// numbers are left alone. Returns how many keys were removed.
    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let expired = self.snapshot_all().await?.expired_keys(self.clock.now_ms());
        if expired.is_empty() {
            return Ok(0);
        }
        self.local.remove(&expired).await?;
        info!("Swept {} expired overrides", expired.len());
        Ok(expired.len())
    }

    async fn fallback_snapshot(&self, host: &str) -> OverrideSnapshot {
        let mut snapshot = OverrideSnapshot::new();
        let Some(fallback) = &self.fallback else {
            return snapshot;
        };

        let key = fallback_key(host);
        match fallback.get(std::slice::from_ref(&key)).await {
            Ok(entries) => {
                if let Some(expiry) = entries.get(&key).and_then(parse_expiry) {
                    snapshot.insert(override_key(strip_www(host)), expiry);
                }
            }
            Err(e) => debug!("Fallback override read failed: {e}"),
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, StorageArea};
    use serde_json::json;
    use std::time::Duration;

    const NOW: i64 = 1_718_798_400_000;

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, TemporaryOverrideStore) {
        let local = Arc::new(MemoryStore::new(StorageArea::Local));
        let clock = Arc::new(ManualClock::new(NOW));
        let store = TemporaryOverrideStore::new(local.clone(), clock.clone());
        (local, clock, store)
    }

    #[tokio::test]
    async fn test_grant_writes_both_forms() {
        let (local, clock, store) = setup();
        let until = store.grant("www.example.com", 10).await.unwrap();
        assert_eq!(until, NOW + 600_000);

        let contents = local.contents();
        assert_eq!(contents.get("temp_unblock_example.com"), Some(&json!(until)));
        assert_eq!(contents.get("temp_unblock_www.example.com"), Some(&json!(until)));

        assert!(store.is_overridden("example.com").await);
        assert!(store.is_overridden("www.example.com").await);

        clock.advance(Duration::from_secs(600));
        assert!(!store.is_overridden("example.com").await);
    }

    #[tokio::test]
    async fn test_lookup_removes_expired_keys() {
        let (local, _clock, store) = setup();
        local
            .set(
                json!({
                    "temp_unblock_example.com": NOW - 1,
                    "temp_unblock_www.example.com": NOW + 1_000,
                    "temp_unblock_other.com": NOW - 1
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let check = store.lookup("www.example.com").await;
        assert!(check.active);
        assert_eq!(check.expired_keys, Vec::<String>::new());

        let contents = local.contents();
        assert!(!contents.contains_key("temp_unblock_example.com"));
        assert!(contents.contains_key("temp_unblock_www.example.com"));
        // only keys for the checked host are touched
        assert!(contents.contains_key("temp_unblock_other.com"));
    }

    #[tokio::test]
    async fn test_sweep_keeps_unexpired_and_malformed() {
        let (local, _clock, store) = setup();
        local
            .set(
                json!({
                    "temp_unblock_a.com": NOW,
                    "temp_unblock_b.com": NOW + 1,
                    "temp_unblock_c.com": "tomorrow",
                    "settings_cache": 1
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(store.sweep_expired().await, Ok(1));
        let contents = local.contents();
        assert!(!contents.contains_key("temp_unblock_a.com"));
        assert!(contents.contains_key("temp_unblock_b.com"));
        assert!(contents.contains_key("temp_unblock_c.com"));
        assert!(contents.contains_key("settings_cache"));

        assert_eq!(store.sweep_expired().await, Ok(0));
    }

    #[tokio::test]
    async fn test_read_failure_means_not_overridden() {
        let (local, _clock, store) = setup();
        store.grant("example.com", 10).await.unwrap();
        local.set_fail_reads(true);
        assert!(!store.is_overridden("example.com").await);
        assert!(store.sweep_expired().await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_consulted_on_read_failure() {
        let local = Arc::new(MemoryStore::new(StorageArea::Local));
        let fallback = Arc::new(MemoryStore::new(StorageArea::Local));
        let clock = Arc::new(ManualClock::new(NOW));
        let store = TemporaryOverrideStore::new(local.clone(), clock.clone()).with_fallback(fallback.clone());

        store.grant("www.example.com", 5).await.unwrap();
        assert!(fallback.contents().contains_key("site_blocker_temp_unblock_example.com"));

        local.set_fail_reads(true);
        assert!(store.is_overridden("www.example.com").await);
        assert!(store.is_overridden("example.com").await);

        clock.advance(Duration::from_secs(5 * 60));
        assert!(!store.is_overridden("example.com").await);
    }

    #[tokio::test]
    async fn test_grant_fails_when_store_rejects_write() {
        let (local, _clock, store) = setup();
        local.set_fail_writes(true);
        assert!(store.grant("example.com", 10).await.is_err());
    }
}
