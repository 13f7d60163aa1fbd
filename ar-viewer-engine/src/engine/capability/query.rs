use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::CapabilityError;

/// `Ok(true)` when immersive AR sessions are supported.
pub type QueryResult = Result<bool, CapabilityError>;

/// Platform question "can this device run an immersive AR session?".
pub trait CapabilityQuery: Send + Sync + 'static {
    fn immersive_supported(&self) -> AsyncSlot<QueryResult>;
}

/// Asks `navigator.xr.isSessionSupported`. The WebXR bindings in `web-sys`
/// are unstable, so the call goes through `Reflect`.
#[cfg(target_arch = "wasm32")]
pub struct WebCapabilityQuery;

#[cfg(target_arch = "wasm32")]
impl CapabilityQuery for WebCapabilityQuery {
    fn immersive_supported(&self) -> AsyncSlot<QueryResult> {
        use crate::engine::core::web::js_error_message;
        use constants::tracking::IMMERSIVE_SESSION_MODE;
        use js_sys::{Function, Promise, Reflect};
        use wasm_bindgen::{JsCast, JsValue};
        use wasm_bindgen_futures::JsFuture;

        let Some(window) = web_sys::window() else {
            return AsyncSlot::ready(Err(CapabilityError::ApiUnavailable));
        };
        let xr = match Reflect::get(&window.navigator(), &JsValue::from_str("xr")) {
            Ok(xr) if !xr.is_undefined() && !xr.is_null() => xr,
            _ => return AsyncSlot::ready(Err(CapabilityError::ApiUnavailable)),
        };
        let Some(is_supported) = Reflect::get(&xr, &JsValue::from_str("isSessionSupported"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
        else {
            return AsyncSlot::ready(Err(CapabilityError::ApiUnavailable));
        };

        let promise = match is_supported.call1(&xr, &JsValue::from_str(IMMERSIVE_SESSION_MODE)) {
            Ok(value) => match value.dyn_into::<Promise>() {
                Ok(promise) => promise,
                Err(_) => {
                    return AsyncSlot::ready(Err(CapabilityError::QueryFailed(
                        "isSessionSupported did not return a promise".to_string(),
                    )));
                }
            },
            Err(e) => {
                return AsyncSlot::ready(Err(CapabilityError::QueryFailed(js_error_message(&e))));
            }
        };

        let slot = AsyncSlot::new();
        let producer = slot.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = match JsFuture::from(promise).await {
                Ok(value) => Ok(value.as_bool().unwrap_or(false)),
                Err(e) => Err(CapabilityError::QueryFailed(js_error_message(&e))),
            };
            producer.fill(result);
        });
        slot
    }
}

/// Native builds have no environment tracking.
pub struct NativeCapabilityQuery;

impl CapabilityQuery for NativeCapabilityQuery {
    fn immersive_supported(&self) -> AsyncSlot<QueryResult> {
        AsyncSlot::ready(Err(CapabilityError::ApiUnavailable))
    }
}

pub fn platform_query() -> Box<dyn CapabilityQuery> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(WebCapabilityQuery)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(NativeCapabilityQuery)
    }
}
