use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use constants::render_settings::STATUS_NOTIFY_INTERVAL_SECS;
use serde::Serialize;

use crate::engine::capability::CapabilityProbe;
use crate::engine::error::{UserFacingError, ViewerErrorEvent};
use crate::engine::fallback::{CompositorState, FallbackCompositor};
use crate::engine::loading::model_loader::{ContentState, LoadContentEvent, ModelLoadStatus};
use crate::engine::tracking::{HostTrackingBridge, SpatialAnchorEngine, TrackingStatus};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::gesture::GestureController;
use crate::tools::mode_manager::{ArModeAction, ArModeEvent, ArModeManager, RetryEvent, ViewerMode};

/// Snapshot of everything the host UI and the overlay display.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewerStatus {
    #[serde(flatten)]
    pub mode: ViewerMode,
    pub tracking: TrackingStatus,
    pub camera: &'static str,
    pub model: &'static str,
    pub content_id: Option<String>,
    pub selected: bool,
    pub interaction: bool,
    /// Whether a suspension point is pending: capability detection, camera
    /// acquisition or a model load.
    pub loading: bool,
    pub error: Option<UserFacingError>,
    #[serde(skip)]
    pub fps: Option<f64>,
}

fn camera_state_str(state: &CompositorState) -> &'static str {
    match state {
        CompositorState::Idle => "idle",
        CompositorState::Acquiring => "acquiring",
        CompositorState::Streaming => "streaming",
        CompositorState::Failed(_) => "failed",
        CompositorState::Released => "released",
    }
}

/// Rebuild the status snapshot from the owning resources.
#[allow(clippy::too_many_arguments)]
pub fn update_viewer_status(
    manager: Res<ArModeManager>,
    probe: Res<CapabilityProbe>,
    anchor_engine: Res<SpatialAnchorEngine>,
    compositor: Res<FallbackCompositor>,
    content: Res<ContentState>,
    gestures: Res<GestureController>,
    diagnostics: Res<DiagnosticsStore>,
    mut status: ResMut<ViewerStatus>,
) {
    let mode = manager.mode();
    let model_loading = content.status == ModelLoadStatus::Loading;
    let next = ViewerStatus {
        mode,
        tracking: anchor_engine.status(),
        camera: camera_state_str(compositor.state()),
        model: content.status.as_str(),
        content_id: content.record.as_ref().map(|record| record.id.to_string()),
        selected: gestures.selected(),
        interaction: gestures.allow_interaction(),
        loading: model_loading
            || (mode == ViewerMode::Detecting && probe.is_pending())
            || *compositor.state() == CompositorState::Acquiring,
        error: status.error.clone(),
        fps: diagnostics
            .get(&FrameTimeDiagnosticsPlugin::FPS)
            .and_then(|fps| fps.smoothed()),
    };

    if *status != next {
        *status = next;
    }
}

/// Report errors to the host and keep the latest for the overlay.
/// A new attempt (entering AR, loading content, retrying) clears it.
pub fn report_viewer_errors(
    mut errors: EventReader<ViewerErrorEvent>,
    mut mode_events: EventReader<ArModeEvent>,
    mut content_events: EventReader<LoadContentEvent>,
    mut retries: EventReader<RetryEvent>,
    mut status: ResMut<ViewerStatus>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    let new_attempt = mode_events
        .read()
        .any(|event| event.action == ArModeAction::Enter)
        | (content_events.read().count() > 0)
        | (retries.read().count() > 0);
    if new_attempt && status.error.is_some() {
        status.error = None;
    }

    for ViewerErrorEvent(error) in errors.read() {
        if !error.is_user_visible() {
            debug!("Silent viewer error: {}", error);
            continue;
        }
        let facing = error.to_user_facing();
        error!("Viewer error [{}]: {}", facing.category, error);
        rpc_interface.send_notification(
            "viewer_error",
            serde_json::to_value(&facing).unwrap_or_default(),
        );
        status.error = Some(facing);
    }
}

/// Send `viewer_status` when the snapshot changed, at most once per interval.
pub fn notify_viewer_status(
    mut rpc_interface: ResMut<WebRpcInterface>,
    status: Res<ViewerStatus>,
    mut last_send_time: Local<f32>,
    mut last_sent: Local<Option<ViewerStatus>>,
    time: Res<Time>,
) {
    let current_time = time.elapsed_secs();
    if current_time - *last_send_time < STATUS_NOTIFY_INTERVAL_SECS {
        return;
    }

    let mut comparable = status.clone();
    comparable.fps = None;
    if last_sent.as_ref() == Some(&comparable) {
        return;
    }

    rpc_interface.send_notification(
        "viewer_status",
        serde_json::to_value(&comparable).unwrap_or_default(),
    );
    *last_send_time = current_time;
    *last_sent = Some(comparable);
}

/// Forward the tracking engine's requests to the host page.
pub fn forward_host_requests(
    bridge: Res<HostTrackingBridge>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for request in bridge.drain_requests() {
        debug!("Host request {}", request.method());
        rpc_interface.send_notification(request.method(), request.params());
    }
}
