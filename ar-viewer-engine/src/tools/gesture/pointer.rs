use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// Platform-neutral pointer sample in logical window pixels (y down).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: u64,
    pub phase: PointerPhase,
    pub position: Vec2,
    /// Seconds since app start.
    pub time: f64,
}

impl PointerEvent {
    pub fn new(id: u64, phase: PointerPhase, position: Vec2, time: f64) -> Self {
        Self {
            id,
            phase,
            position,
            time,
        }
    }
}

/// Pointer id used for the mouse, outside the range of touch ids.
pub const MOUSE_POINTER_ID: u64 = u64::MAX;

/// Distance and angle between two pointers.
pub(crate) fn span(a: Vec2, b: Vec2) -> (f32, f32) {
    let delta = b - a;
    (delta.length(), delta.y.atan2(delta.x))
}
