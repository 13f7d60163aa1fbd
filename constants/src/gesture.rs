/// Longest press, in seconds, that still counts as a tap.
pub const TAP_MAX_DURATION_SECS: f64 = 0.3;

/// Maximum pointer travel, in pixels, between down and up for a tap.
pub const TAP_MAX_DISTANCE_PX: f32 = 20.0;

/// Window, in seconds, in which a second tap turns into a double-tap.
pub const DOUBLE_TAP_INTERVAL_SECS: f64 = 0.3;

/// Maximum distance, in pixels, between the two taps of a double-tap.
pub const DOUBLE_TAP_RADIUS_PX: f32 = 50.0;

/// Single pointer travel, in pixels, before a pan is recognised.
pub const PAN_MIN_DISTANCE_PX: f32 = 10.0;

/// Metres of camera-plane translation per pixel of pan.
pub const PAN_SENSITIVITY: f32 = 0.002;

/// Change in finger spread, in pixels, before a pinch is recognised.
pub const PINCH_THRESHOLD_PX: f32 = 8.0;

/// Change in finger angle, in radians, before a rotate is recognised.
pub const ROTATE_THRESHOLD_RAD: f32 = 0.05;

/// Fraction of the two-finger angular change applied as yaw.
pub const ROTATE_DAMPING: f32 = 0.5;

/// Smallest uniform scale a user can pinch the model to.
pub const MIN_MODEL_SCALE: f32 = 0.1;

/// Largest uniform scale a user can pinch the model to.
pub const MAX_MODEL_SCALE: f32 = 3.0;

/// Scale restored by a reset.
pub const INITIAL_MODEL_SCALE: f32 = 1.0;
