use url::Url;

use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::AssetError;

pub type FetchResult = Result<Vec<u8>, AssetError>;

/// Byte source for model files. Implementations must not block: the result
/// is delivered through the returned slot and polled by the frame loop.
pub trait AssetFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> AsyncSlot<FetchResult>;
}

/// Browser `fetch` into an `ArrayBuffer`.
#[cfg(target_arch = "wasm32")]
pub struct WebFetcher;

#[cfg(target_arch = "wasm32")]
impl AssetFetcher for WebFetcher {
    fn fetch(&self, url: &Url) -> AsyncSlot<FetchResult> {
        let slot = AsyncSlot::new();
        let producer = slot.clone();
        let url = url.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            producer.fill(fetch_bytes(&url).await);
        });
        slot
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_bytes(url: &str) -> FetchResult {
    use crate::engine::core::web::js_error_message;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| AssetError::network(url, "no window"))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| AssetError::network(url, js_error_message(&e)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| AssetError::network(url, "fetch did not return a Response"))?;

    if !response.ok() {
        return Err(AssetError::network(
            url,
            format!("HTTP {} {}", response.status(), response.status_text()),
        ));
    }

    let buffer = response
        .array_buffer()
        .map_err(|e| AssetError::network(url, js_error_message(&e)))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| AssetError::network(url, js_error_message(&e)))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Reads `file://` URLs from disk. Used by native builds and tooling.
pub struct FileFetcher;

impl AssetFetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> AsyncSlot<FetchResult> {
        AsyncSlot::ready(read_file(url))
    }
}

fn read_file(url: &Url) -> FetchResult {
    if url.scheme() != "file" {
        return Err(AssetError::network(
            url.as_str(),
            format!("'{}' URLs are only fetched by the web build", url.scheme()),
        ));
    }
    let path = url
        .to_file_path()
        .map_err(|_| AssetError::network(url.as_str(), "not a local file path"))?;
    std::fs::read(&path).map_err(|e| AssetError::network(url.as_str(), e.to_string()))
}

/// Fetcher for the current platform.
pub fn platform_fetcher() -> Box<dyn AssetFetcher> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(WebFetcher)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(FileFetcher)
    }
}
