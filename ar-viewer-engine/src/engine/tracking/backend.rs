use crate::engine::error::{AnchorError, TrackingError};
use crate::engine::spatial::Pose;

use super::session::{AnchorId, HitTestHandle, ReferenceFrame, SessionId, SessionMode};

/// What the platform granted for a session request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionGrant {
    pub hit_test: Option<HitTestHandle>,
    pub reference_frame: ReferenceFrame,
    pub anchors_supported: bool,
}

/// Per-frame state of a platform anchor.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorResolution {
    /// Tracked at this pose.
    Resolved(Pose),
    /// Created but not reported yet.
    Pending,
    /// Known but not locatable this frame.
    Unresolved,
    /// The platform gave up on the anchor.
    Failed(AnchorError),
}

/// Hit-test outcome read once per engine frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitSample {
    /// The platform produced no frame since the last read.
    NoNewFrame,
    /// A new frame without a surface under the reticle.
    Miss,
    Hit(Pose),
}

/// Seam to the platform that runs the tracking session.
///
/// Calls never block. Requests are fire-and-forget; answers are read back by
/// the per-frame polling methods.
pub trait TrackingBackend: Send + Sync + 'static {
    fn request_session(&mut self, session: SessionId, mode: SessionMode);

    /// `Some` once the outstanding request was granted or refused.
    fn poll_session(&mut self) -> Option<Result<SessionGrant, TrackingError>>;

    /// Surface under the reticle in the newest frame. A sample is returned
    /// once; later calls see [`HitSample::NoNewFrame`] until the next frame.
    fn hit_test(&mut self) -> HitSample;

    /// Marker pose in the latest frame, `None` while not visible.
    fn marker_pose(&mut self) -> Option<Pose>;

    /// Device camera pose in the latest frame.
    fn viewer_pose(&mut self) -> Option<Pose> {
        None
    }

    fn create_anchor(&mut self, pose: &Pose) -> Result<AnchorId, AnchorError>;

    fn resolve_anchor(&mut self, anchor: AnchorId) -> AnchorResolution;

    fn delete_anchor(&mut self, anchor: AnchorId);

    fn cancel_hit_test(&mut self, hit_test: HitTestHandle);

    fn end_session(&mut self);

    /// Termination reported by the platform since the last call.
    fn take_termination(&mut self) -> Option<TrackingError>;
}
