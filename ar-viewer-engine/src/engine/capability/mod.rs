//! Environment-tracking capability detection.
//!
//! Picks one of three AR strategies without ever blocking a frame: the
//! platform query runs asynchronously and a bounded timeout turns a hanging
//! or broken query into the camera fallback.

pub mod probe;
pub mod query;

pub use probe::CapabilityProbe;
pub use query::{CapabilityQuery, QueryResult, platform_query};

use serde::Serialize;

/// How the model gets anchored in the user's environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Host-managed immersive session with hit testing and anchors.
    ImmersiveTracking,
    /// Marker pose supplied by the host acts as the anchor.
    MarkerTracking,
    /// Live camera feed behind the scene, model at a fixed offset.
    FallbackCamera,
}

impl Strategy {
    /// Strategies whose pose comes from a tracking session.
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::ImmersiveTracking | Self::MarkerTracking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImmersiveTracking => "immersive_tracking",
            Self::MarkerTracking => "marker_tracking",
            Self::FallbackCamera => "fallback_camera",
        }
    }
}
