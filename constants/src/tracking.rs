/// Upper bound, in seconds, on the immersive capability query.
pub const CAPABILITY_TIMEOUT_SECS: f64 = 3.0;

/// Consecutive frames with a valid hit before a surface counts as found.
pub const SURFACE_DEBOUNCE_FRAMES: u32 = 3;

/// Whether marker tracking is offered when immersive tracking is unsupported.
pub const MARKER_TRACKING_ENABLED: bool = false;

/// Distance, in metres, of the model in front of the camera in fallback mode.
pub const FALLBACK_MODEL_DISTANCE: f32 = 1.5;

/// WebXR session mode requested from the host page.
pub const IMMERSIVE_SESSION_MODE: &str = "immersive-ar";
