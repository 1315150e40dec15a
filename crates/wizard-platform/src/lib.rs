//! Browser adapters for the wizard chat engine.
//!
//! - [`transport`]: streaming chat and fallback endpoints over `fetch`
//! - [`storage`]: `localStorage` with an in-memory fallback
//! - [`assets`]: image metadata lookups

pub mod transport;
pub mod storage;
pub mod assets;

use wasm_bindgen::JsValue;

/// Best-effort text for a thrown JS value.
pub(crate) fn js_error_text(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
