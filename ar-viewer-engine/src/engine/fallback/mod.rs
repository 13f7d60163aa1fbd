//! Camera-overlay fallback for devices without environment tracking.
//!
//! The camera image is a DOM `<video>` behind the transparent canvas; the
//! model is composed in camera space at a fixed distance and manipulated
//! through the same gesture pipeline as the tracked strategies.

pub mod camera_feed;
pub mod compositor;

pub use camera_feed::{CameraFeed, StreamHandle, UnavailableCameraFeed, platform_feed};
pub use compositor::{CompositorState, FallbackCompositor};
