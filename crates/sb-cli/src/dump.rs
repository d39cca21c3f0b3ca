//! Storage dumps
//!
//! A dump is the extension's storage exported as one JSON file:
//! `{ "sync": { ... }, "local": { ... } }`. Either area may be missing.

use std::fs;
use std::path::Path;

use chrono::DateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sb_core::types::Moment;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageDump {
    pub sync: Map<String, Value>,
    pub local: Map<String, Value>,
}

pub fn read_dump(path: &Path) -> Result<StorageDump, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let dump: StorageDump =
        serde_json::from_str(&text).map_err(|e| format!("Invalid storage dump '{}': {}", path.display(), e))?;
    debug!(
        "Loaded '{}': {} sync keys, {} local keys",
        path.display(),
        dump.sync.len(),
        dump.local.len()
    );
    Ok(dump)
}

pub fn write_dump(path: &Path, dump: &StorageDump) -> Result<(), String> {
    let text = serde_json::to_string_pretty(dump).map_err(|e| format!("Failed to encode dump: {e}"))?;
    fs::write(path, text).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

/// Evaluation time: RFC 3339 (`2024-06-19T12:00:00+02:00`), keeping the
/// given offset for weekday and time of day, or local now.
pub fn parse_moment(at: Option<&str>) -> Result<Moment, String> {
    match at {
        None => Ok(Moment::now()),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Moment::from_datetime(&dt))
            .map_err(|e| format!("Invalid time '{raw}': {e}")),
    }
}
