/// Inner and outer radius, in metres, of the placement reticle ring.
pub const RETICLE_INNER_RADIUS: f32 = 0.08;
pub const RETICLE_OUTER_RADIUS: f32 = 0.1;

/// Largest model dimension, in metres, after fit scaling.
pub const TARGET_MODEL_SIZE: f32 = 0.5;

/// Per-frame smoothing factor for the synchronised transform (1.0 disables easing).
pub const TRANSFORM_EASING: f32 = 0.35;

/// Interval, in seconds, between periodic status notifications to the host.
pub const STATUS_NOTIFY_INTERVAL_SECS: f32 = 0.5;

/// Preview camera position and look-at point, in metres.
pub const PREVIEW_CAMERA_POSITION: [f32; 3] = [0.0, 0.55, 1.4];
pub const PREVIEW_CAMERA_FOCUS: [f32; 3] = [0.0, 0.25, 0.0];
