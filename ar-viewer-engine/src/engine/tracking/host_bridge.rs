//! Tracking backend driven by the host page.
//!
//! Bevy has no WebXR session support, so the embedding page owns the
//! immersive (or marker) session and streams its results over RPC:
//!
//! - `xr_session` `{session, status: granted|denied|unsupported|ended, hit_test?, reference_space?, anchors?}`
//! - `xr_frame` `{session, viewer?, hit?, marker?, anchors?: [{id, pose?}]}`
//! - `xr_anchor` `{session, anchor, status: created|failed|unsupported, reason?}`
//!
//! Engine requests go back as `xr_request_session`, `xr_create_anchor`,
//! `xr_delete_anchor`, `xr_cancel_hit_test` and `xr_end_session`
//! notifications. Messages for any session but the current one are dropped.
//! The hit sample of an `xr_frame` is handed to the engine once, so engine
//! frames between host frames do not count toward the surface debounce.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bevy::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

use super::backend::{AnchorResolution, HitSample, SessionGrant, TrackingBackend};
use super::session::{AnchorId, HitTestHandle, ReferenceFrame, SessionId, SessionMode};
use crate::engine::error::{AnchorError, TrackingError};
use crate::engine::spatial::{Pose, PoseMessage};

/// Request from the engine to the host page.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    RequestSession {
        session: SessionId,
        mode: SessionMode,
    },
    CreateAnchor {
        session: SessionId,
        anchor: AnchorId,
        pose: Pose,
    },
    DeleteAnchor {
        session: SessionId,
        anchor: AnchorId,
    },
    CancelHitTest {
        session: SessionId,
        hit_test: HitTestHandle,
    },
    EndSession {
        session: SessionId,
    },
}

impl HostRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::RequestSession { .. } => "xr_request_session",
            Self::CreateAnchor { .. } => "xr_create_anchor",
            Self::DeleteAnchor { .. } => "xr_delete_anchor",
            Self::CancelHitTest { .. } => "xr_cancel_hit_test",
            Self::EndSession { .. } => "xr_end_session",
        }
    }

    pub fn params(&self) -> Value {
        match self {
            Self::RequestSession { session, mode } => json!({ "session": session, "mode": mode }),
            Self::CreateAnchor {
                session,
                anchor,
                pose,
            } => json!({
                "session": session,
                "anchor": anchor,
                "pose": PoseMessage::from(pose),
            }),
            Self::DeleteAnchor { session, anchor } => json!({ "session": session, "anchor": anchor }),
            Self::CancelHitTest { session, hit_test } => {
                json!({ "session": session, "hit_test": hit_test })
            }
            Self::EndSession { session } => json!({ "session": session }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SessionStatusMessage {
    Granted,
    Denied,
    Unsupported,
    Ended,
}

#[derive(Debug, Deserialize)]
struct SessionMessage {
    session: SessionId,
    status: SessionStatusMessage,
    #[serde(default)]
    hit_test: Option<HitTestHandle>,
    #[serde(default)]
    reference_space: ReferenceFrame,
    #[serde(default)]
    anchors: bool,
}

#[derive(Debug, Deserialize)]
struct AnchorPoseMessage {
    id: AnchorId,
    #[serde(default)]
    pose: Option<PoseMessage>,
}

#[derive(Debug, Deserialize)]
struct FrameMessage {
    session: SessionId,
    #[serde(default)]
    viewer: Option<PoseMessage>,
    #[serde(default)]
    hit: Option<PoseMessage>,
    #[serde(default)]
    marker: Option<PoseMessage>,
    #[serde(default)]
    anchors: Vec<AnchorPoseMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AnchorStatusMessage {
    Created,
    Failed,
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct AnchorMessage {
    session: SessionId,
    anchor: AnchorId,
    status: AnchorStatusMessage,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Default)]
struct BridgeState {
    session: Option<SessionId>,
    grant: Option<Result<SessionGrant, TrackingError>>,
    anchors_supported: bool,
    viewer: Option<Pose>,
    hit: Option<HitSample>,
    marker: Option<Pose>,
    anchor_poses: HashMap<AnchorId, Option<Pose>>,
    seen_anchors: HashSet<AnchorId>,
    anchor_failures: HashMap<AnchorId, AnchorError>,
    termination: Option<TrackingError>,
    outbox: Vec<HostRequest>,
    next_anchor: u64,
}

impl BridgeState {
    fn clear_session(&mut self) {
        self.session = None;
        self.grant = None;
        self.anchors_supported = false;
        self.viewer = None;
        self.hit = None;
        self.marker = None;
        self.anchor_poses.clear();
        self.seen_anchors.clear();
        self.anchor_failures.clear();
        self.termination = None;
    }

    fn is_current(&self, session: SessionId, method: &str) -> bool {
        let current = self.session == Some(session);
        if !current {
            debug!("Dropping {} for stale session {:?}", method, session);
        }
        current
    }
}

/// Shared between the anchor engine (as its backend) and the RPC layer.
/// Clones refer to the same session state.
#[derive(Resource, Clone, Default)]
pub struct HostTrackingBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl HostTrackingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `method` is a tracking message from the host.
    pub fn accepts(method: &str) -> bool {
        matches!(method, "xr_session" | "xr_frame" | "xr_anchor")
    }

    /// Apply one host message. Unknown methods are ignored.
    pub fn handle_message(&self, method: &str, params: &Value) -> Result<(), serde_json::Error> {
        match method {
            "xr_session" => {
                let message: SessionMessage = serde_json::from_value(params.clone())?;
                self.on_session(message);
            }
            "xr_frame" => {
                let message: FrameMessage = serde_json::from_value(params.clone())?;
                self.on_frame(message);
            }
            "xr_anchor" => {
                let message: AnchorMessage = serde_json::from_value(params.clone())?;
                self.on_anchor(message);
            }
            _ => {}
        }
        Ok(())
    }

    /// Requests queued for the host since the last call.
    pub fn drain_requests(&self) -> Vec<HostRequest> {
        std::mem::take(&mut self.state().outbox)
    }

    fn on_session(&self, message: SessionMessage) {
        let mut state = self.state();
        if !state.is_current(message.session, "xr_session") {
            return;
        }
        match message.status {
            SessionStatusMessage::Granted => {
                state.anchors_supported = message.anchors;
                state.grant = Some(Ok(SessionGrant {
                    hit_test: message.hit_test,
                    reference_frame: message.reference_space,
                    anchors_supported: message.anchors,
                }));
            }
            SessionStatusMessage::Denied => {
                state.grant = Some(Err(TrackingError::PermissionDenied));
            }
            SessionStatusMessage::Unsupported => {
                state.grant = Some(Err(TrackingError::Unsupported));
            }
            SessionStatusMessage::Ended => {
                state.termination = Some(TrackingError::Terminated);
            }
        }
    }

    fn on_frame(&self, message: FrameMessage) {
        let mut state = self.state();
        if !state.is_current(message.session, "xr_frame") {
            return;
        }
        state.viewer = message.viewer.as_ref().map(PoseMessage::to_pose);
        state.hit = Some(
            message
                .hit
                .as_ref()
                .map_or(HitSample::Miss, |hit| HitSample::Hit(hit.to_pose())),
        );
        state.marker = message.marker.as_ref().map(PoseMessage::to_pose);
        state.anchor_poses = message
            .anchors
            .iter()
            .map(|anchor| (anchor.id, anchor.pose.as_ref().map(PoseMessage::to_pose)))
            .collect();
        let reported: Vec<AnchorId> = state
            .anchor_poses
            .iter()
            .filter(|(_, pose)| pose.is_some())
            .map(|(id, _)| *id)
            .collect();
        state.seen_anchors.extend(reported);
    }

    fn on_anchor(&self, message: AnchorMessage) {
        let mut state = self.state();
        if !state.is_current(message.session, "xr_anchor") {
            return;
        }
        match message.status {
            AnchorStatusMessage::Created => debug!("Host created anchor {:?}", message.anchor),
            AnchorStatusMessage::Failed => {
                let reason = message
                    .reason
                    .unwrap_or_else(|| "rejected by host".to_string());
                state
                    .anchor_failures
                    .insert(message.anchor, AnchorError::Failed(reason));
            }
            AnchorStatusMessage::Unsupported => {
                state.anchors_supported = false;
                state
                    .anchor_failures
                    .insert(message.anchor, AnchorError::Unsupported);
            }
        }
    }
}

impl TrackingBackend for HostTrackingBridge {
    fn request_session(&mut self, session: SessionId, mode: SessionMode) {
        let mut state = self.state();
        state.clear_session();
        state.session = Some(session);
        state.outbox.push(HostRequest::RequestSession { session, mode });
    }

    fn poll_session(&mut self) -> Option<Result<SessionGrant, TrackingError>> {
        self.state().grant.take()
    }

    fn hit_test(&mut self) -> HitSample {
        self.state().hit.take().unwrap_or(HitSample::NoNewFrame)
    }

    fn marker_pose(&mut self) -> Option<Pose> {
        self.state().marker
    }

    fn viewer_pose(&mut self) -> Option<Pose> {
        self.state().viewer
    }

    fn create_anchor(&mut self, pose: &Pose) -> Result<AnchorId, AnchorError> {
        let mut state = self.state();
        let session = state
            .session
            .ok_or_else(|| AnchorError::Failed("no active session".to_string()))?;
        if !state.anchors_supported {
            return Err(AnchorError::Unsupported);
        }

        state.next_anchor += 1;
        let anchor = AnchorId(state.next_anchor);
        state.outbox.push(HostRequest::CreateAnchor {
            session,
            anchor,
            pose: *pose,
        });
        Ok(anchor)
    }

    fn resolve_anchor(&mut self, anchor: AnchorId) -> AnchorResolution {
        let state = self.state();
        if let Some(error) = state.anchor_failures.get(&anchor) {
            return AnchorResolution::Failed(error.clone());
        }
        match state.anchor_poses.get(&anchor) {
            Some(Some(pose)) => AnchorResolution::Resolved(*pose),
            Some(None) => AnchorResolution::Unresolved,
            None if state.seen_anchors.contains(&anchor) => AnchorResolution::Unresolved,
            None => AnchorResolution::Pending,
        }
    }

    fn delete_anchor(&mut self, anchor: AnchorId) {
        let mut state = self.state();
        state.anchor_poses.remove(&anchor);
        state.seen_anchors.remove(&anchor);
        state.anchor_failures.remove(&anchor);
        if let Some(session) = state.session {
            state.outbox.push(HostRequest::DeleteAnchor { session, anchor });
        }
    }

    fn cancel_hit_test(&mut self, hit_test: HitTestHandle) {
        let mut state = self.state();
        if let Some(session) = state.session {
            state
                .outbox
                .push(HostRequest::CancelHitTest { session, hit_test });
        }
    }

    fn end_session(&mut self) {
        let mut state = self.state();
        if let Some(session) = state.session {
            state.outbox.push(HostRequest::EndSession { session });
        }
        state.clear_session();
    }

    fn take_termination(&mut self) -> Option<TrackingError> {
        self.state().termination.take()
    }
}
