use serde::{Deserialize, Serialize};

use crate::engine::capability::Strategy;
use crate::engine::spatial::Pose;

/// Fresh for every AR-mode entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

/// Platform hit-test source, cancelled on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HitTestHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(pub u64);

/// Coordinate space the platform reports poses in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceFrame {
    #[default]
    Local,
    LocalFloor,
    Unbounded,
    Viewer,
}

/// Which kind of session the platform should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Immersive,
    Marker,
}

impl SessionMode {
    pub fn for_strategy(strategy: Strategy) -> Option<Self> {
        match strategy {
            Strategy::ImmersiveTracking => Some(Self::Immersive),
            Strategy::MarkerTracking => Some(Self::Marker),
            Strategy::FallbackCamera => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    #[default]
    Idle,
    RequestingCapability,
    Tracking,
    SurfaceFound,
    Anchored,
    Lost,
    Ended,
}

impl TrackingStatus {
    /// Statuses in which the session holds an anchor.
    pub fn has_anchor(&self) -> bool {
        matches!(self, Self::Anchored | Self::Lost)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Ended)
    }
}

/// What the model is attached to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorKind {
    /// Platform anchor that keeps tracking the real-world point.
    Platform(AnchorId),
    /// Static transform frozen at the placement hit pose.
    PoseLocked,
    /// The tracked marker itself.
    Marker,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorBinding {
    pub kind: AnchorKind,
    /// Hit pose at placement time.
    pub placement_pose: Pose,
    /// Last resolved pose; equals `placement_pose` until the platform reports.
    pub pose: Pose,
    /// Whether the platform has reported a pose for this anchor yet.
    pub confirmed: bool,
}

impl AnchorBinding {
    pub fn new(kind: AnchorKind, placement_pose: Pose) -> Self {
        Self {
            kind,
            placement_pose,
            pose: placement_pose,
            confirmed: !matches!(kind, AnchorKind::Platform(_)),
        }
    }

    pub fn platform_id(&self) -> Option<AnchorId> {
        match self.kind {
            AnchorKind::Platform(id) => Some(id),
            _ => None,
        }
    }
}

/// One AR-mode visit. Nothing carries over to the next session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    pub id: SessionId,
    pub mode: SessionMode,
    pub status: TrackingStatus,
    pub hit_test: Option<HitTestHandle>,
    pub reference_frame: Option<ReferenceFrame>,
    pub anchor: Option<AnchorBinding>,
    pub anchors_supported: bool,
}

impl TrackingSession {
    pub fn new(id: SessionId, mode: SessionMode) -> Self {
        Self {
            id,
            mode,
            status: TrackingStatus::RequestingCapability,
            hit_test: None,
            reference_frame: None,
            anchor: None,
            anchors_supported: false,
        }
    }
}
