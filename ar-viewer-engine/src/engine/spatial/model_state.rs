use bevy::prelude::*;
use constants::gesture::{INITIAL_MODEL_SCALE, MAX_MODEL_SCALE, MIN_MODEL_SCALE};

use crate::engine::error::ConfigError;

/// Inclusive uniform scale range. Always `0 < min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    min: f32,
    max: f32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self {
            min: MIN_MODEL_SCALE,
            max: MAX_MODEL_SCALE,
        }
    }
}

impl ScaleLimits {
    pub fn new(min: f32, max: f32) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(ConfigError::InvalidScaleLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Clamp into range. Non-finite input collapses to the lower bound.
    pub fn clamp(&self, scale: f32) -> f32 {
        if scale.is_nan() {
            return self.min;
        }
        scale.clamp(self.min, self.max)
    }
}

/// The user-controlled part of the model transform.
///
/// Written only by the gesture controller; read once per frame by the
/// transform synchroniser. In anchored strategies `position` and
/// `rotation_euler` are relative to the anchor; in fallback mode they are
/// camera-space values.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ModelState {
    pub position: Vec3,
    /// Euler angles in radians, applied in Y, X, Z order.
    pub rotation_euler: Vec3,
    scale: f32,
    limits: ScaleLimits,
    initial: InitialTransform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct InitialTransform {
    position: Vec3,
    rotation_euler: Vec3,
    scale: f32,
}

impl Default for ModelState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, INITIAL_MODEL_SCALE, ScaleLimits::default())
    }
}

impl ModelState {
    /// Build a state whose reset target is the given position and scale with
    /// zero rotation. The initial scale is clamped into the limits.
    pub fn new(position: Vec3, initial_scale: f32, limits: ScaleLimits) -> Self {
        let scale = limits.clamp(initial_scale);
        Self {
            position,
            rotation_euler: Vec3::ZERO,
            scale,
            limits,
            initial: InitialTransform {
                position,
                rotation_euler: Vec3::ZERO,
                scale,
            },
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn limits(&self) -> ScaleLimits {
        self.limits
    }

    /// Set the uniform scale, clamped to the configured range.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = self.limits.clamp(scale);
    }

    /// Replace the limits and re-clamp the current and initial scale.
    pub fn set_limits(&mut self, limits: ScaleLimits) {
        self.limits = limits;
        self.scale = limits.clamp(self.scale);
        self.initial.scale = limits.clamp(self.initial.scale);
    }

    pub fn translate(&mut self, delta: Vec3) {
        if delta.is_finite() {
            self.position += delta;
        }
    }

    /// Yaw about the vertical axis.
    pub fn rotate_yaw(&mut self, radians: f32) {
        if radians.is_finite() {
            self.rotation_euler.y = wrap_angle(self.rotation_euler.y + radians);
        }
    }

    /// Restore the initial tuple exactly.
    pub fn reset(&mut self) {
        self.position = self.initial.position;
        self.rotation_euler = self.initial.rotation_euler;
        self.scale = self.initial.scale;
    }

    pub fn is_initial(&self) -> bool {
        self.position == self.initial.position
            && self.rotation_euler == self.initial.rotation_euler
            && self.scale == self.initial.scale
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.rotation_euler.y,
            self.rotation_euler.x,
            self.rotation_euler.z,
        )
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.rotation(),
            scale: Vec3::splat(self.scale),
        }
    }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}
