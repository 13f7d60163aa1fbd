use bevy::prelude::*;
use constants::{gesture, render_settings, tracking};
use serde::{Deserialize, Serialize};

use crate::engine::error::ConfigError;
use crate::engine::spatial::ScaleLimits;

/// Gesture recognition thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub tap_max_secs: f64,
    pub tap_max_distance: f32,
    pub double_tap_secs: f64,
    pub double_tap_radius: f32,
    pub pan_min_distance: f32,
    pub pan_sensitivity: f32,
    pub pinch_threshold: f32,
    pub rotate_threshold: f32,
    pub rotate_damping: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub initial_scale: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_max_secs: gesture::TAP_MAX_DURATION_SECS,
            tap_max_distance: gesture::TAP_MAX_DISTANCE_PX,
            double_tap_secs: gesture::DOUBLE_TAP_INTERVAL_SECS,
            double_tap_radius: gesture::DOUBLE_TAP_RADIUS_PX,
            pan_min_distance: gesture::PAN_MIN_DISTANCE_PX,
            pan_sensitivity: gesture::PAN_SENSITIVITY,
            pinch_threshold: gesture::PINCH_THRESHOLD_PX,
            rotate_threshold: gesture::ROTATE_THRESHOLD_RAD,
            rotate_damping: gesture::ROTATE_DAMPING,
            min_scale: gesture::MIN_MODEL_SCALE,
            max_scale: gesture::MAX_MODEL_SCALE,
            initial_scale: gesture::INITIAL_MODEL_SCALE,
        }
    }
}

impl GestureConfig {
    pub fn scale_limits(&self) -> Result<ScaleLimits, ConfigError> {
        ScaleLimits::new(self.min_scale, self.max_scale)
    }
}

/// Capability probing and anchor engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub capability_timeout_secs: f64,
    pub surface_debounce_frames: u32,
    pub marker_tracking: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            capability_timeout_secs: tracking::CAPABILITY_TIMEOUT_SECS,
            surface_debounce_frames: tracking::SURFACE_DEBOUNCE_FRAMES,
            marker_tracking: tracking::MARKER_TRACKING_ENABLED,
        }
    }
}

/// Camera-overlay fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub model_distance: f32,
    pub prefer_rear_camera: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            model_distance: tracking::FALLBACK_MODEL_DISTANCE,
            prefer_rear_camera: true,
        }
    }
}

/// Transform synchronisation and presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub easing: f32,
    pub target_model_size: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            easing: render_settings::TRANSFORM_EASING,
            target_model_size: render_settings::TARGET_MODEL_SIZE,
        }
    }
}

/// Runtime configuration, loaded from `config/viewer.json`.
/// Missing fields fall back to the compile-time defaults in `constants`.
#[derive(Asset, TypePath, Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub gesture: GestureConfig,
    pub tracking: TrackingConfig,
    pub fallback: FallbackConfig,
    pub render: RenderConfig,
}

impl ViewerConfig {
    /// Check every value that would otherwise break an invariant downstream.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gesture.scale_limits()?;

        positive("gesture.tap_max_secs", self.gesture.tap_max_secs)?;
        positive("gesture.double_tap_secs", self.gesture.double_tap_secs)?;
        positive("gesture.tap_max_distance", self.gesture.tap_max_distance.into())?;
        positive("gesture.double_tap_radius", self.gesture.double_tap_radius.into())?;
        positive("gesture.pan_min_distance", self.gesture.pan_min_distance.into())?;
        positive("gesture.pan_sensitivity", self.gesture.pan_sensitivity.into())?;
        positive("gesture.pinch_threshold", self.gesture.pinch_threshold.into())?;
        positive("gesture.rotate_threshold", self.gesture.rotate_threshold.into())?;
        positive("gesture.rotate_damping", self.gesture.rotate_damping.into())?;
        positive("gesture.initial_scale", self.gesture.initial_scale.into())?;
        positive(
            "tracking.capability_timeout_secs",
            self.tracking.capability_timeout_secs,
        )?;
        positive(
            "tracking.surface_debounce_frames",
            self.tracking.surface_debounce_frames.into(),
        )?;
        positive("fallback.model_distance", self.fallback.model_distance.into())?;
        positive("render.target_model_size", self.render.target_model_size.into())?;

        let easing = self.render.easing;
        if !(easing > 0.0 && easing <= 1.0) {
            return Err(ConfigError::InvalidEasing(easing));
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ViewerConfig =
            serde_json::from_str(r#"{ "gesture": { "max_scale": 5.0 }, "tracking": { "marker_tracking": true } }"#)
                .unwrap();
        assert_eq!(config.gesture.max_scale, 5.0);
        assert_eq!(config.gesture.min_scale, gesture::MIN_MODEL_SCALE);
        assert!(config.tracking.marker_tracking);
        assert_eq!(config.render, RenderConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut config = ViewerConfig::default();
        config.gesture.min_scale = 4.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScaleLimits { .. })
        ));

        let mut config = ViewerConfig::default();
        config.render.easing = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEasing(0.0)));

        let mut config = ViewerConfig::default();
        config.tracking.surface_debounce_frames = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { name: "tracking.surface_debounce_frames", .. })
        ));
    }
}
