use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::Serialize;

use crate::engine::assets::model_library::ModelLibrary;
use crate::engine::capability::{CapabilityProbe, Strategy};
use crate::engine::error::{ContentError, TrackingError, ViewerError, ViewerErrorEvent};
use crate::engine::fallback::FallbackCompositor;
use crate::engine::loading::model_loader::{ContentState, retry_model_load};
use crate::engine::render::transform_sync::{SnapTransform, SyncTarget, SyncTargetState};
use crate::engine::tracking::{SessionMode, SpatialAnchorEngine, TrackingStatus};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::gesture::{GestureController, PlacementRequest, TapClaim};
use crate::tools::manipulation::ModelScreenRect;

/// What the viewer is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "strategy")]
pub enum ViewerMode {
    /// Plain 3D preview.
    #[default]
    Preview,
    /// AR requested, waiting for the capability probe.
    Detecting,
    Ar(Strategy),
}

impl ViewerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Detecting => "detecting",
            Self::Ar(_) => "ar",
        }
    }

    pub fn strategy(&self) -> Option<Strategy> {
        match self {
            Self::Ar(strategy) => Some(*strategy),
            _ => None,
        }
    }

    pub fn is_ar(&self) -> bool {
        !matches!(self, Self::Preview)
    }
}

/// Resource tracking the viewer mode and why the last AR visit ended.
#[derive(Resource, Default, Debug)]
pub struct ArModeManager {
    mode: ViewerMode,
    /// Error that ended the last AR visit, kept so a retry can re-enter.
    last_failure: Option<ViewerError>,
}

impl ArModeManager {
    pub fn mode(&self) -> ViewerMode {
        self.mode
    }

    pub fn last_failure(&self) -> Option<&ViewerError> {
        self.last_failure.as_ref()
    }

    /// Whether a retry should re-enter AR.
    pub fn can_retry_ar(&self) -> bool {
        self.last_failure.as_ref().is_some_and(|error| {
            matches!(error, ViewerError::Camera(_) | ViewerError::Tracking(_))
                && error.is_retryable()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArModeAction {
    Enter,
    Exit,
}

/// Source of a mode change, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChangeSource {
    Rpc,
    Keyboard,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ArModeEvent {
    pub action: ArModeAction,
    pub source: ModeChangeSource,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ResetTransformEvent {
    pub source: ModeChangeSource,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct InteractionEvent {
    pub allow: bool,
}

/// Retry the last failed step: a network model load, or an AR visit that
/// ended on a denied permission.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct RetryEvent;

/// Everything a mode transition touches.
#[derive(SystemParam)]
pub struct ArRuntime<'w> {
    manager: ResMut<'w, ArModeManager>,
    probe: ResMut<'w, CapabilityProbe>,
    anchor_engine: ResMut<'w, SpatialAnchorEngine>,
    compositor: ResMut<'w, FallbackCompositor>,
    gestures: ResMut<'w, GestureController>,
    rpc_interface: ResMut<'w, WebRpcInterface>,
    snaps: EventWriter<'w, SnapTransform>,
    errors: EventWriter<'w, ViewerErrorEvent>,
    time: Res<'w, Time>,
}

impl ArRuntime<'_> {
    /// Start detection. Refused while the page route names invalid content,
    /// before any capability query or camera request is made.
    fn enter(&mut self, source: ModeChangeSource, route_rejected: Option<&ContentError>) {
        if self.manager.mode.is_ar() {
            debug!("AR already active, ignoring enter via {:?}", source);
            return;
        }
        if let Some(error) = route_rejected {
            warn!("Not entering AR via {:?}: {}", source, error);
            self.errors.write(ViewerErrorEvent::new(error.clone()));
            return;
        }
        info!("Entering AR via {:?}", source);
        self.manager.last_failure = None;
        self.probe.start(self.time.elapsed_secs_f64());
        self.set_mode(ViewerMode::Detecting);
    }

    /// Start the strategy's session or camera.
    fn start(&mut self, strategy: Strategy) {
        self.gestures.cancel();
        match SessionMode::for_strategy(strategy) {
            Some(mode) => {
                self.compositor.teardown();
                self.anchor_engine.begin(mode);
            }
            None => {
                self.anchor_engine.end();
                self.compositor.activate();
            }
        }
        self.set_mode(ViewerMode::Ar(strategy));
    }

    /// Fall back to the next strategy, or leave AR when none is left.
    fn degrade(&mut self, from: Strategy) {
        match self.probe.degrade(from) {
            Some(next) => {
                info!("{:?} unavailable, degrading to {:?}", from, next);
                self.probe.override_strategy(next);
                self.start(next);
            }
            None => self.leave(Some(ViewerError::NoStrategyAvailable)),
        }
    }

    /// Back to the preview: cancel detection, end the session, release the
    /// camera and drop the gesture. The model transform is kept.
    fn leave(&mut self, failure: Option<ViewerError>) {
        if !self.manager.mode.is_ar() {
            return;
        }
        self.probe.cancel();
        self.anchor_engine.end();
        self.compositor.teardown();
        self.gestures.cancel();
        self.gestures.set_tap_claim(TapClaim::None);
        if self.gestures.unselect() {
            self.rpc_interface
                .send_notification("selection_changed", serde_json::json!({ "selected": false }));
        }

        if let Some(error) = &failure {
            if error.is_user_visible() {
                self.errors.write(ViewerErrorEvent(error.clone()));
            }
        }
        self.manager.last_failure = failure;
        self.snaps.write(SnapTransform);
        self.set_mode(ViewerMode::Preview);
    }

    fn set_mode(&mut self, mode: ViewerMode) {
        if self.manager.mode == mode {
            return;
        }
        info!("Viewer mode {:?} -> {:?}", self.manager.mode, mode);
        self.manager.mode = mode;
        self.rpc_interface.send_notification(
            "ar_mode_changed",
            serde_json::json!({
                "mode": mode.as_str(),
                "strategy": mode.strategy().map(|strategy| strategy.as_str()),
            }),
        );
    }
}

/// System handling AR enter/exit requests from RPC and the keyboard.
pub fn handle_ar_mode_events(
    mut events: EventReader<ArModeEvent>,
    content: Res<ContentState>,
    mut runtime: ArRuntime,
) {
    for event in events.read() {
        match event.action {
            ArModeAction::Enter => runtime.enter(event.source, content.route_rejected.as_ref()),
            ArModeAction::Exit => {
                info!("Leaving AR via {:?}", event.source);
                runtime.leave(None);
            }
        }
    }
}

/// Advance the probe, the tracking session or the camera by one frame.
pub fn advance_ar_session(mut runtime: ArRuntime) {
    // Streams granted after an exit are released whatever the mode.
    runtime.compositor.release_orphans();

    let mode = runtime.manager.mode();
    match mode {
        ViewerMode::Preview => {}
        ViewerMode::Detecting => {
            let now = runtime.time.elapsed_secs_f64();
            if let Some(strategy) = runtime.probe.poll(now) {
                runtime.start(strategy);
            }
        }
        ViewerMode::Ar(Strategy::FallbackCamera) => match runtime.compositor.poll() {
            Some(Err(error)) => runtime.leave(Some(error.into())),
            Some(Ok(())) | None => {}
        },
        ViewerMode::Ar(strategy) => {
            let before = runtime.anchor_engine.status();
            match runtime.anchor_engine.update() {
                None => {}
                Some(TrackingError::Unsupported) => runtime.degrade(strategy),
                Some(TrackingError::Terminated) => {
                    if before == TrackingStatus::SurfaceFound {
                        warn!("Tracking session ended before the model was placed");
                    } else {
                        info!("Tracking session ended by the platform");
                    }
                    runtime.leave(Some(TrackingError::Terminated.into()));
                }
                Some(error) => runtime.leave(Some(error.into())),
            }
        }
    }
}

/// Anchor the model where a claimed tap asked for it.
pub fn handle_placement_requests(
    mut requests: EventReader<PlacementRequest>,
    manager: Res<ArModeManager>,
    mut anchor_engine: ResMut<SpatialAnchorEngine>,
) {
    for request in requests.read() {
        if manager.mode() != ViewerMode::Ar(Strategy::ImmersiveTracking) {
            continue;
        }
        match anchor_engine.place() {
            Ok(_) => debug!("Placement tap at {:?}", request.screen_position),
            Err(error) => info!("Placement tap ignored: {}", error),
        }
    }
}

/// Publish where the model is attached this frame and which taps place it.
pub fn publish_sync_target(
    manager: Res<ArModeManager>,
    anchor_engine: Res<SpatialAnchorEngine>,
    compositor: Res<FallbackCompositor>,
    screen_rect: Res<ModelScreenRect>,
    mut gestures: ResMut<GestureController>,
    mut target: ResMut<SyncTargetState>,
) {
    let frame = anchor_engine.frame();
    let (next, claim) = match manager.mode() {
        ViewerMode::Preview | ViewerMode::Detecting => (SyncTarget::preview(), TapClaim::None),
        ViewerMode::Ar(Strategy::FallbackCamera) => (
            SyncTarget {
                strategy: Some(Strategy::FallbackCamera),
                anchor: Some(compositor.anchor_pose()),
                anchor_generation: 0,
            },
            TapClaim::None,
        ),
        ViewerMode::Ar(strategy) => {
            let claim = match (strategy, frame.status) {
                (Strategy::ImmersiveTracking, TrackingStatus::SurfaceFound) => TapClaim::All,
                (Strategy::ImmersiveTracking, TrackingStatus::Anchored) if frame.surface_under_reticle => {
                    screen_rect.0.map_or(TapClaim::None, TapClaim::Outside)
                }
                _ => TapClaim::None,
            };
            (
                SyncTarget {
                    strategy: Some(strategy),
                    anchor: frame.anchor_pose,
                    anchor_generation: frame.anchor_generation,
                },
                claim,
            )
        }
    };

    gestures.set_tap_claim(claim);
    if target.0 != next {
        target.0 = next;
    }
}

pub fn handle_reset_events(
    mut events: EventReader<ResetTransformEvent>,
    mut gestures: ResMut<GestureController>,
) {
    for event in events.read() {
        info!("Model transform reset via {:?}", event.source);
        gestures.request_reset();
    }
}

pub fn handle_interaction_events(
    mut events: EventReader<InteractionEvent>,
    mut gestures: ResMut<GestureController>,
) {
    for event in events.read() {
        info!("Model interaction {}", if event.allow { "enabled" } else { "disabled" });
        gestures.set_allow_interaction(event.allow);
    }
}

pub fn handle_retry_events(
    mut events: EventReader<RetryEvent>,
    mut content: ResMut<ContentState>,
    mut library: ResMut<ModelLibrary>,
    mut runtime: ArRuntime,
) {
    if events.read().count() == 0 {
        return;
    }

    if retry_model_load(&mut content, &mut library) {
        return;
    }
    if runtime.manager.can_retry_ar() {
        info!("Retrying AR after {:?}", runtime.manager.last_failure);
        runtime.enter(ModeChangeSource::Rpc, content.route_rejected.as_ref());
        return;
    }
    debug!("Nothing to retry");
}

/// System handling keyboard shortcuts for AR mode (native builds only).
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_mode_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    manager: Res<ArModeManager>,
    mut mode_events: EventWriter<ArModeEvent>,
    mut reset_events: EventWriter<ResetTransformEvent>,
) {
    if keyboard.just_pressed(KeyCode::KeyA) {
        let action = if manager.mode().is_ar() {
            ArModeAction::Exit
        } else {
            ArModeAction::Enter
        };
        mode_events.write(ArModeEvent {
            action,
            source: ModeChangeSource::Keyboard,
        });
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        reset_events.write(ResetTransformEvent {
            source: ModeChangeSource::Keyboard,
        });
    }
}

/// Placeholder system for WASM builds where keyboard shortcuts are disabled.
#[cfg(target_arch = "wasm32")]
pub fn handle_mode_keyboard_shortcuts() {}
