//! Small helpers shared by the browser integrations.

use wasm_bindgen::JsValue;

/// Best-effort readable message for a rejected promise or thrown value.
pub fn js_error_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// `name` property of a `DOMException`-like value, e.g. `NotAllowedError`.
pub fn js_error_name(value: &JsValue) -> Option<String> {
    js_sys::Reflect::get(value, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
}
