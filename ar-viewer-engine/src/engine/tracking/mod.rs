//! Spatial anchoring for tracked AR strategies.
//!
//! [`SpatialAnchorEngine`] runs the per-visit [`TrackingSession`] state
//! machine: it debounces hit tests into a found surface, creates (or
//! pose-locks) the anchor on placement, and publishes the anchor pose for
//! the transform synchronizer once per frame. The platform sits behind
//! [`TrackingBackend`]; the shipped one is the host-page bridge.

pub mod anchor_engine;
pub mod backend;
pub mod host_bridge;
pub mod session;

pub use anchor_engine::{SpatialAnchorEngine, TrackingFrame};
pub use backend::{AnchorResolution, HitSample, SessionGrant, TrackingBackend};
pub use host_bridge::{HostRequest, HostTrackingBridge};
pub use session::{SessionMode, TrackingSession, TrackingStatus};
