use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::CameraError;

/// Opaque id of an acquired camera stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

pub type FeedResult = Result<StreamHandle, CameraError>;

/// Seam to the platform camera.
pub trait CameraFeed: Send + Sync + 'static {
    /// Ask for a live video stream; the answer arrives in the slot.
    fn acquire(&mut self, prefer_rear: bool) -> AsyncSlot<FeedResult>;

    /// Present the stream full-bleed behind the rendered scene.
    fn show(&mut self, stream: StreamHandle);

    /// Stop every track of the stream and remove its presentation.
    fn release(&mut self, stream: StreamHandle);
}

/// Camera feed for platforms without camera capture.
#[derive(Debug, Default)]
pub struct UnavailableCameraFeed;

impl CameraFeed for UnavailableCameraFeed {
    fn acquire(&mut self, _prefer_rear: bool) -> AsyncSlot<FeedResult> {
        AsyncSlot::ready(Err(CameraError::Unsupported))
    }

    fn show(&mut self, _stream: StreamHandle) {}

    fn release(&mut self, _stream: StreamHandle) {}
}

#[cfg(target_arch = "wasm32")]
pub use web::WebCameraFeed;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use bevy::prelude::*;
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{HtmlVideoElement, MediaStream, MediaStreamConstraints, MediaStreamTrack};

    use super::{CameraFeed, FeedResult, StreamHandle};
    use crate::engine::core::async_slot::AsyncSlot;
    use crate::engine::core::web::{js_error_message, js_error_name};
    use crate::engine::error::CameraError;

    const VIDEO_ELEMENT_ID: &str = "ar-camera-feed";

    struct LiveStream {
        stream: MediaStream,
        video: Option<HtmlVideoElement>,
    }

    thread_local! {
        // JS handles are not Send; the feed resource only keeps their ids.
        static STREAMS: RefCell<HashMap<u64, LiveStream>> = RefCell::new(HashMap::new());
        static NEXT_STREAM: RefCell<u64> = const { RefCell::new(0) };
    }

    /// `getUserMedia` camera rendered in a `<video>` element behind the
    /// transparent canvas.
    #[derive(Debug, Default)]
    pub struct WebCameraFeed;

    fn camera_error(value: &JsValue) -> CameraError {
        match js_error_name(value).as_deref() {
            Some("NotAllowedError" | "SecurityError" | "PermissionDeniedError") => {
                CameraError::PermissionDenied
            }
            Some("NotFoundError" | "OverconstrainedError" | "DevicesNotFoundError") => {
                CameraError::NotFound
            }
            Some("NotSupportedError" | "TypeError") => CameraError::Unsupported,
            _ => CameraError::Other(js_error_message(value)),
        }
    }

    fn constraints(prefer_rear: bool) -> Result<MediaStreamConstraints, JsValue> {
        let video = js_sys::Object::new();
        if prefer_rear {
            let facing = js_sys::Object::new();
            js_sys::Reflect::set(&facing, &"ideal".into(), &"environment".into())?;
            js_sys::Reflect::set(&video, &"facingMode".into(), &facing)?;
        }
        let constraints = MediaStreamConstraints::new();
        constraints.set_video(&video);
        constraints.set_audio(&JsValue::FALSE);
        Ok(constraints)
    }

    fn request_stream(prefer_rear: bool) -> Result<js_sys::Promise, CameraError> {
        let window = web_sys::window().ok_or(CameraError::Unsupported)?;
        let devices = window
            .navigator()
            .media_devices()
            .map_err(|_| CameraError::Unsupported)?;
        let constraints = constraints(prefer_rear).map_err(|err| camera_error(&err))?;
        devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|err| camera_error(&err))
    }

    fn create_video(stream: &MediaStream) -> Result<HtmlVideoElement, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let video: HtmlVideoElement = document.create_element("video")?.dyn_into()?;
        video.set_id(VIDEO_ELEMENT_ID);
        video.set_autoplay(true);
        video.set_muted(true);
        video.set_attribute("playsinline", "")?;
        video.set_src_object(Some(stream));

        let style = video.style();
        style.set_property("position", "fixed")?;
        style.set_property("inset", "0")?;
        style.set_property("width", "100%")?;
        style.set_property("height", "100%")?;
        style.set_property("object-fit", "cover")?;
        style.set_property("z-index", "-1")?;

        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("no body"))?;
        body.prepend_with_node_1(&video)?;
        let _ = video.play()?;
        Ok(video)
    }

    impl CameraFeed for WebCameraFeed {
        fn acquire(&mut self, prefer_rear: bool) -> AsyncSlot<FeedResult> {
            let promise = match request_stream(prefer_rear) {
                Ok(promise) => promise,
                Err(error) => return AsyncSlot::ready(Err(error)),
            };

            let slot = AsyncSlot::new();
            let producer = slot.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = match JsFuture::from(promise).await {
                    Ok(value) => match value.dyn_into::<MediaStream>() {
                        Ok(stream) => {
                            let id = NEXT_STREAM.with(|next| {
                                let mut next = next.borrow_mut();
                                *next += 1;
                                *next
                            });
                            STREAMS.with(|streams| {
                                streams
                                    .borrow_mut()
                                    .insert(id, LiveStream { stream, video: None })
                            });
                            Ok(StreamHandle(id))
                        }
                        Err(_) => Err(CameraError::Other("getUserMedia returned no stream".into())),
                    },
                    Err(error) => Err(camera_error(&error)),
                };
                producer.fill(result);
            });
            slot
        }

        fn show(&mut self, handle: StreamHandle) {
            STREAMS.with(|streams| {
                let mut streams = streams.borrow_mut();
                let Some(live) = streams.get_mut(&handle.0) else {
                    return;
                };
                match create_video(&live.stream) {
                    Ok(video) => live.video = Some(video),
                    Err(error) => error!("Failed to present camera feed: {}", js_error_message(&error)),
                }
            });
        }

        fn release(&mut self, handle: StreamHandle) {
            let Some(live) = STREAMS.with(|streams| streams.borrow_mut().remove(&handle.0)) else {
                return;
            };
            for track in live.stream.get_tracks().iter() {
                if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                    track.stop();
                }
            }
            if let Some(video) = live.video {
                video.set_src_object(None);
                video.remove();
            }
            debug!("Camera stream {:?} released", handle);
        }
    }
}

/// Camera feed for the current platform.
pub fn platform_feed() -> Box<dyn CameraFeed> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(WebCameraFeed)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(UnavailableCameraFeed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, PoisonError};

    use super::*;

    #[derive(Default)]
    pub struct FeedScript {
        pub requests: Vec<AsyncSlot<FeedResult>>,
        pub shown: Vec<StreamHandle>,
        /// Live tracks per acquired stream.
        pub live_tracks: HashMap<StreamHandle, u32>,
    }

    /// Camera feed whose acquisitions are completed by the test.
    #[derive(Clone, Default)]
    pub struct ScriptedFeed(pub Arc<Mutex<FeedScript>>);

    impl ScriptedFeed {
        pub fn script(&self) -> std::sync::MutexGuard<'_, FeedScript> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Resolve the `index`th acquisition with a stream of `tracks` tracks.
        pub fn grant(&self, index: usize, stream: StreamHandle, tracks: u32) {
            let mut script = self.script();
            script.live_tracks.insert(stream, tracks);
            script.requests[index].fill(Ok(stream));
        }

        pub fn deny(&self, index: usize, error: CameraError) {
            self.script().requests[index].fill(Err(error));
        }

        pub fn live_tracks(&self) -> u32 {
            self.script().live_tracks.values().sum()
        }
    }

    impl CameraFeed for ScriptedFeed {
        fn acquire(&mut self, _prefer_rear: bool) -> AsyncSlot<FeedResult> {
            let slot = AsyncSlot::new();
            self.script().requests.push(slot.clone());
            slot
        }

        fn show(&mut self, stream: StreamHandle) {
            self.script().shown.push(stream);
        }

        fn release(&mut self, stream: StreamHandle) {
            self.script().live_tracks.remove(&stream);
        }
    }

    #[test]
    fn unavailable_feed_reports_unsupported() {
        let slot = UnavailableCameraFeed.acquire(true);
        assert_eq!(slot.take(), Some(Err(CameraError::Unsupported)));
    }
}
