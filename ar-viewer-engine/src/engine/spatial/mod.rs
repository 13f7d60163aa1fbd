//! Spatial value types shared by the anchor engine, gestures and the synchroniser.

/// Position, orientation and optional scale snapshot published once per frame.
pub mod pose;

/// User-driven model transform with its scale limits.
pub mod model_state;

pub use model_state::{ModelState, ScaleLimits};
pub use pose::{Pose, PoseMessage};
