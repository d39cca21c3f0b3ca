//! Browser-side checks, run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const SYNC: &str = r#"{
    "blockLists": [{
        "id": "a", "name": "A", "enabled": true,
        "websites": ["example.com"],
        "customRedirect": "https://focus.example.org/"
    }]
}"#;

fn field(value: &JsValue, name: &str) -> JsValue {
    js_sys::Reflect::get(value, &name.into()).unwrap()
}

#[wasm_bindgen_test]
fn decide_returns_custom_redirect() {
    let decision = sb_wasm::decide(SYNC, "", "https://www.example.com/", js_sys::Date::now(), None).unwrap();
    assert_eq!(field(&decision, "kind").as_string().as_deref(), Some("customRedirect"));
    assert_eq!(field(&decision, "url").as_string().as_deref(), Some("https://focus.example.org/"));
}

#[wasm_bindgen_test]
fn compile_skips_custom_redirect_lists() {
    let result = sb_wasm::compile_rules(SYNC, "", js_sys::Date::now(), None).unwrap();
    assert_eq!(field(&result, "ruleCount").as_f64(), Some(0.0));
    assert_eq!(field(&result, "skippedCustomRedirect").as_f64(), Some(1.0));
}

#[wasm_bindgen_test]
fn extract_host() {
    assert_eq!(
        sb_wasm::extract_host_js("https://mail.example.com/inbox").as_deref(),
        Some("mail.example.com")
    );
}
