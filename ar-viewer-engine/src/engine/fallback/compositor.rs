use bevy::prelude::*;

use super::camera_feed::{CameraFeed, FeedResult, StreamHandle, platform_feed};
use crate::engine::assets::viewer_config::FallbackConfig;
use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::CameraError;
use crate::engine::spatial::Pose;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompositorState {
    #[default]
    Idle,
    Acquiring,
    Streaming,
    Failed(CameraError),
    Released,
}

/// Camera-overlay fallback: a live camera image behind the scene with the
/// model at a fixed offset in front of the viewer.
#[derive(Resource)]
pub struct FallbackCompositor {
    feed: Box<dyn CameraFeed>,
    state: CompositorState,
    pending: Option<AsyncSlot<FeedResult>>,
    /// Requests abandoned by a teardown; their streams are released on arrival.
    orphaned: Vec<AsyncSlot<FeedResult>>,
    stream: Option<StreamHandle>,
    prefer_rear: bool,
    model_distance: f32,
}

impl Default for FallbackCompositor {
    fn default() -> Self {
        Self::new(platform_feed(), &FallbackConfig::default())
    }
}

impl FallbackCompositor {
    pub fn new(feed: Box<dyn CameraFeed>, config: &FallbackConfig) -> Self {
        Self {
            feed,
            state: CompositorState::Idle,
            pending: None,
            orphaned: Vec::new(),
            stream: None,
            prefer_rear: config.prefer_rear_camera,
            model_distance: config.model_distance,
        }
    }

    pub fn configure(&mut self, config: &FallbackConfig) {
        self.prefer_rear = config.prefer_rear_camera;
        self.model_distance = config.model_distance;
    }

    pub fn state(&self) -> &CompositorState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == CompositorState::Streaming
    }

    /// The stand-in anchor: a fixed offset in front of the camera.
    pub fn anchor_pose(&self) -> Pose {
        Pose::from_translation(Vec3::new(0.0, 0.0, -self.model_distance))
    }

    /// Request the camera. No-op while acquiring or streaming.
    pub fn activate(&mut self) {
        if matches!(
            self.state,
            CompositorState::Acquiring | CompositorState::Streaming
        ) {
            return;
        }
        info!("Requesting camera stream (rear preferred: {})", self.prefer_rear);
        self.pending = Some(self.feed.acquire(self.prefer_rear));
        self.state = CompositorState::Acquiring;
    }

    /// Advance acquisition. Returns the outcome on the frame it is decided.
    pub fn poll(&mut self) -> Option<Result<(), CameraError>> {
        self.release_orphans();

        let result = self.pending.as_ref()?.take()?;
        self.pending = None;

        match result {
            Ok(stream) => {
                self.feed.show(stream);
                self.stream = Some(stream);
                self.state = CompositorState::Streaming;
                info!("Camera stream {:?} streaming", stream);
                Some(Ok(()))
            }
            Err(error) => {
                warn!("Camera unavailable: {}", error);
                self.state = CompositorState::Failed(error.clone());
                Some(Err(error))
            }
        }
    }

    /// Stop the camera and release every track. Safe to call in any state.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.orphaned.push(pending);
        }
        if let Some(stream) = self.stream.take() {
            self.feed.release(stream);
            info!("Camera stream {:?} released", stream);
        }
        self.release_orphans();
        if self.state != CompositorState::Idle {
            self.state = CompositorState::Released;
        }
    }

    /// Release streams that arrived after a teardown.
    pub fn release_orphans(&mut self) {
        let feed = &mut self.feed;
        self.orphaned.retain(|slot| match slot.take() {
            Some(Ok(stream)) => {
                debug!("Releasing camera stream {:?} that arrived after teardown", stream);
                feed.release(stream);
                false
            }
            Some(Err(_)) => false,
            None => true,
        });
    }
}
