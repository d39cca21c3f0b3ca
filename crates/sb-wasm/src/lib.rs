//! WebAssembly bindings for Site Blocker
//!
//! The extension's service worker reads both storage areas itself and hands
//! them over as JSON strings; these bindings decode them at the same read
//! boundary the native runtime uses and answer with plain JS objects.

use std::sync::OnceLock;

use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;

use sb_compiler::{CompileOutput, RuleCompiler, MAX_RULES};
use sb_core::{
    config::PolicySnapshot,
    decision::DecisionEngine,
    overrides::OverrideSnapshot,
    types::{BlockDecision, BlockPages, Moment},
    url::extract_host,
};

// =============================================================================
// Logging
// =============================================================================

struct ConsoleLogger {
    level: LevelFilter,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[site-blocker] {}: {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<ConsoleLogger> = OnceLock::new();

/// Route library logs to the browser console. `debug` lowers the level
/// from info to debug. Only the first call takes effect.
#[wasm_bindgen]
pub fn init_logging(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Info };
    let logger = LOGGER.get_or_init(|| ConsoleLogger { level });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(logger.level);
    }
}

// =============================================================================
// Decisions and rules
// =============================================================================

/// Decide a navigation. `sync_json` / `local_json` are the contents of the
/// synced and local storage areas; `now_ms` is `Date.now()`.
#[wasm_bindgen]
pub fn decide(
    sync_json: &str,
    local_json: &str,
    url: &str,
    now_ms: f64,
    base_url: Option<String>,
) -> Result<JsValue, JsValue> {
    let decision = decide_json(sync_json, local_json, url, now_ms as i64, base_url.as_deref())
        .map_err(|e| JsValue::from_str(&e))?;
    Ok(decision_to_js(&decision))
}

/// Compile the declarative rule set. Returns `{ rules, ruleCount,
/// truncated, skippedKeyword, skippedOverridden, skippedCustomRedirect,
/// skippedInvalid }`
/// where `rules` is ready for `updateDynamicRules`.
#[wasm_bindgen]
pub fn compile_rules(
    sync_json: &str,
    local_json: &str,
    now_ms: f64,
    base_url: Option<String>,
) -> Result<JsValue, JsValue> {
    let output = compile_json(sync_json, local_json, now_ms as i64, base_url.as_deref())
        .map_err(|e| JsValue::from_str(&e))?;

    let rules_json = serde_json::to_string(&output.rules)
        .map_err(|e| JsValue::from_str(&format!("Failed to encode rules: {e}")))?;
    let rules = js_sys::JSON::parse(&rules_json)?;

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"rules".into(), &rules);
    let _ = js_sys::Reflect::set(&result, &"ruleCount".into(), &JsValue::from(output.rules.len() as u32));
    let _ = js_sys::Reflect::set(&result, &"truncated".into(), &JsValue::from(output.stats.truncated));
    let _ = js_sys::Reflect::set(
        &result,
        &"skippedKeyword".into(),
        &JsValue::from(output.stats.skipped_keyword as u32),
    );
    let _ = js_sys::Reflect::set(
        &result,
        &"skippedOverridden".into(),
        &JsValue::from(output.stats.skipped_overridden as u32),
    );
    let _ = js_sys::Reflect::set(
        &result,
        &"skippedCustomRedirect".into(),
        &JsValue::from(output.stats.skipped_custom_redirect as u32),
    );
    let _ = js_sys::Reflect::set(
        &result,
        &"skippedInvalid".into(),
        &JsValue::from(output.stats.skipped_invalid as u32),
    );
    Ok(result.into())
}

#[wasm_bindgen]
pub fn extract_host_js(url: &str) -> Option<String> {
    extract_host(url).map(|h| h.to_string())
}

fn decision_to_js(decision: &BlockDecision) -> JsValue {
    let result = js_sys::Object::new();
    match decision {
        BlockDecision::Allow => {
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"allow".into());
        }
        BlockDecision::Block { via, redirect_target } => {
            let via = match via {
                sb_core::Enforcement::Strict => "strict",
                sb_core::Enforcement::Challenge => "challenge",
            };
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"block".into());
            let _ = js_sys::Reflect::set(&result, &"via".into(), &via.into());
            let _ = js_sys::Reflect::set(&result, &"redirectTarget".into(), &redirect_target.as_str().into());
        }
        BlockDecision::CustomRedirect { url } => {
            let _ = js_sys::Reflect::set(&result, &"kind".into(), &"customRedirect".into());
            let _ = js_sys::Reflect::set(&result, &"url".into(), &url.as_str().into());
        }
    }
    result.into()
}

// =============================================================================
// JSON boundary
// =============================================================================

/// Parse a storage area dump. Empty input is an empty area.
fn parse_area(json: &str, name: &str) -> Result<Map<String, Value>, String> {
    if json.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(format!("{name} storage must be a JSON object")),
        Err(e) => Err(format!("Invalid {name} storage JSON: {e}")),
    }
}

fn pages_for(base_url: Option<&str>) -> BlockPages {
    base_url.map(BlockPages::new).unwrap_or_default()
}

fn decide_json(
    sync_json: &str,
    local_json: &str,
    url: &str,
    now_ms: i64,
    base_url: Option<&str>,
) -> Result<BlockDecision, String> {
    let policy = PolicySnapshot::from_sync_area(&parse_area(sync_json, "sync")?);
    let overrides = OverrideSnapshot::from_entries(&parse_area(local_json, "local")?);
    let at = Moment::from_epoch_ms(now_ms).ok_or_else(|| format!("Invalid timestamp: {now_ms}"))?;
    let pages = pages_for(base_url);
    Ok(DecisionEngine::new(&policy, &overrides, &pages).decide_url(url, &at))
}

fn compile_json(
    sync_json: &str,
    local_json: &str,
    now_ms: i64,
    base_url: Option<&str>,
) -> Result<CompileOutput, String> {
    let policy = PolicySnapshot::from_sync_area(&parse_area(sync_json, "sync")?);
    let overrides = OverrideSnapshot::from_entries(&parse_area(local_json, "local")?);
    let pages = pages_for(base_url);
    Ok(RuleCompiler::new(&pages)
        .with_max_rules(MAX_RULES)
        .compile(&policy, &overrides, now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_718_798_400_000;

    const SYNC: &str = r#"{
        "blockLists": [{
            "id": "a", "name": "A", "enabled": true,
            "blockPolicy": "difficult",
            "websites": ["example.com", "*casino*"],
            "schedule": { "enabled": false }
        }]
    }"#;

    #[test]
    fn test_decide_json() {
        let decision = decide_json(SYNC, "", "https://example.com/", NOW, Some("chrome-extension://id")).unwrap();
        assert_eq!(
            decision.redirect_target(),
            Some("chrome-extension://id/blocked-challenge.html?url=https%3A%2F%2Fexample.com%2F")
        );

        let local = format!(r#"{{ "temp_unblock_example.com": {} }}"#, NOW + 1);
        let decision = decide_json(SYNC, &local, "https://example.com/", NOW, None).unwrap();
        assert!(decision.is_allow());
    }

    #[test]
    fn test_compile_json() {
        let output = compile_json(SYNC, "{}", NOW, None).unwrap();
        assert_eq!(output.rules.len(), 2);
        assert_eq!(output.stats.skipped_keyword, 1);
        assert!(output.rules[0].redirect_target.starts_with("chrome-extension://site-blocker/"));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(decide_json("[1, 2]", "", "https://a.com", NOW, None).is_err());
        assert!(compile_json(SYNC, "{", NOW, None).is_err());
    }
}
