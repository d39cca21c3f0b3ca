//! Temporary override keys and expiry checks
//!
//! A passed challenge stores `temp_unblock_<domain>` -> expiry (epoch ms) in
//! the local storage area, once for the bare domain and once for its `www.`
//! form. The two keys are written independently and may briefly disagree,
//! so every check looks at all the forms a host can appear under.
//!
//! This module is pure: it works on a snapshot of stored entries and
//! reports expired keys for the caller to delete.

use std::collections::HashMap;

use serde_json::Value;

use crate::url::strip_www;

/// Namespace of override keys in the local storage area.
pub const OVERRIDE_KEY_PREFIX: &str = "temp_unblock_";
/// Namespace of the best-effort page-local backup copies.
pub const FALLBACK_KEY_PREFIX: &str = "site_blocker_temp_unblock_";

pub const MS_PER_MINUTE: i64 = 60_000;

pub fn override_key(domain: &str) -> String {
    format!("{OVERRIDE_KEY_PREFIX}{domain}")
}

pub fn fallback_key(domain: &str) -> String {
    format!("{FALLBACK_KEY_PREFIX}{}", strip_www(domain))
}

pub fn is_override_key(key: &str) -> bool {
    key.starts_with(OVERRIDE_KEY_PREFIX)
}

/// Keys consulted for a host as seen in the URL: the normalized domain, the
/// host itself, and the `www.` form when the two differ. No duplicates.
pub fn override_keys(host: &str) -> Vec<String> {
    let normalized = strip_www(host);
    let mut keys = vec![override_key(normalized)];
    if host != normalized {
        keys.push(override_key(host));
        let www = override_key(&format!("www.{normalized}"));
        if !keys.contains(&www) {
            keys.push(www);
        }
    }
    keys
}

/// Expiry for a grant of `duration_minutes` starting at `now_ms`.
pub fn grant_expiry(duration_minutes: u32, now_ms: i64) -> i64 {
    now_ms.saturating_add(i64::from(duration_minutes).saturating_mul(MS_PER_MINUTE))
}

/// Entries to write for an override of `domain` until `until_ms`: the bare
/// domain and its `www.` form.
pub fn grant_entries(domain: &str, until_ms: i64) -> [(String, i64); 2] {
    let normalized = strip_www(domain);
    [
        (override_key(normalized), until_ms),
        (override_key(&format!("www.{normalized}")), until_ms),
    ]
}

/// Read a stored expiry. Numbers only; anything else is malformed.
pub fn parse_expiry(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

/// Outcome of checking one host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverrideCheck {
    pub active: bool,
    /// Keys seen with `now >= expiry`, to be deleted by the caller.
    pub expired_keys: Vec<String>,
}

/// Override entries read from storage at one point.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OverrideSnapshot {
    expiries: HashMap<String, i64>,
}

impl OverrideSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect override entries from a storage mapping. Keys outside the
    /// namespace and values that are not numbers are ignored.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let expiries = entries
            .into_iter()
            .filter(|(key, _)| is_override_key(key))
            .filter_map(|(key, value)| parse_expiry(value).map(|expiry| (key.clone(), expiry)))
            .collect();
        Self { expiries }
    }

    pub fn insert(&mut self, key: impl Into<String>, expiry_ms: i64) {
        self.expiries.insert(key.into(), expiry_ms);
    }

    /// Record a grant for `domain` in both its forms.
    pub fn grant(&mut self, domain: &str, until_ms: i64) {
        for (key, expiry) in grant_entries(domain, until_ms) {
            self.expiries.insert(key, expiry);
        }
    }

    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    pub fn expiry(&self, key: &str) -> Option<i64> {
        self.expiries.get(key).copied()
    }

    /// Check `host` at `now_ms`. Active iff some key's expiry is strictly
    /// later than now; every key already past is reported for cleanup
    /// regardless of the outcome.
    pub fn check(&self, host: &str, now_ms: i64) -> OverrideCheck {
        let mut check = OverrideCheck::default();
        for key in override_keys(host) {
            if let Some(expiry) = self.expiry(&key) {
                if now_ms < expiry {
                    check.active = true;
                } else {
                    check.expired_keys.push(key);
                }
            }
        }
        check
    }

    pub fn is_active(&self, host: &str, now_ms: i64) -> bool {
        override_keys(host)
            .iter()
            .filter_map(|key| self.expiry(key))
            .any(|expiry| now_ms < expiry)
    }

    /// Every key whose expiry has passed, sorted.
    pub fn expired_keys(&self, now_ms: i64) -> Vec<String> {
        let mut keys: Vec<String> = self
            .expiries
            .iter()
            .filter(|(_, expiry)| now_ms >= **expiry)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Drop keys, e.g. after they were deleted from storage.
    pub fn forget(&mut self, keys: &[String]) {
        for key in keys {
            self.expiries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_override_keys() {
        assert_eq!(override_keys("example.com"), vec!["temp_unblock_example.com"]);
        assert_eq!(
            override_keys("www.example.com"),
            vec!["temp_unblock_example.com", "temp_unblock_www.example.com"]
        );
        assert_eq!(
            override_keys("m.example.com"),
            vec!["temp_unblock_m.example.com"]
        );
    }

    #[test]
    fn test_grant_entries_cover_both_forms() {
        let entries = grant_entries("www.example.com", 42);
        assert_eq!(entries[0], ("temp_unblock_example.com".to_string(), 42));
        assert_eq!(entries[1], ("temp_unblock_www.example.com".to_string(), 42));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let granted_at = 1_700_000_000_000;
        let until = grant_expiry(10, granted_at);
        assert_eq!(until, granted_at + 600_000);

        let mut snapshot = OverrideSnapshot::new();
        snapshot.grant("example.com", until);

        assert!(snapshot.is_active("example.com", granted_at));
        assert!(snapshot.is_active("www.example.com", until - 1));
        assert!(!snapshot.is_active("example.com", until));
        assert!(!snapshot.is_active("example.com", until + 1));
    }

    #[test]
    fn test_check_reports_expired_keys() {
        let mut snapshot = OverrideSnapshot::new();
        snapshot.insert("temp_unblock_example.com", 100);
        snapshot.insert("temp_unblock_www.example.com", 500);

        let check = snapshot.check("www.example.com", 200);
        assert!(check.active);
        assert_eq!(check.expired_keys, vec!["temp_unblock_example.com"]);

        let check = snapshot.check("www.example.com", 500);
        assert!(!check.active);
        assert_eq!(check.expired_keys.len(), 2);
    }

    #[test]
    fn test_only_www_key_present() {
        let mut snapshot = OverrideSnapshot::new();
        snapshot.insert("temp_unblock_www.example.com", 1_000);
        assert!(snapshot.is_active("www.example.com", 10));
        // the bare host never consults the www key
        assert!(!snapshot.is_active("example.com", 10));
    }

    #[test]
    fn test_from_entries_skips_malformed() {
        let area = json!({
            "temp_unblock_a.com": 1000,
            "temp_unblock_b.com": "soon",
            "temp_unblock_c.com": 2.5e3,
            "unrelated": 5
        });
        let snapshot = OverrideSnapshot::from_entries(area.as_object().unwrap());
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.expiry("temp_unblock_c.com"), Some(2500));
        assert_eq!(snapshot.expired_keys(1500), vec!["temp_unblock_a.com"]);
        assert_eq!(snapshot.expired_keys(3000), vec!["temp_unblock_a.com", "temp_unblock_c.com"]);
    }
}
