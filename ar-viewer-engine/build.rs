// build.rs
use constants::{gesture, path, render_settings, tracking};
use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../constants/src");

    let defaults = serde_json::json!({
        "gesture": {
            "tap_max_secs": gesture::TAP_MAX_DURATION_SECS,
            "tap_max_distance": gesture::TAP_MAX_DISTANCE_PX,
            "double_tap_secs": gesture::DOUBLE_TAP_INTERVAL_SECS,
            "double_tap_radius": gesture::DOUBLE_TAP_RADIUS_PX,
            "pan_min_distance": gesture::PAN_MIN_DISTANCE_PX,
            "pan_sensitivity": gesture::PAN_SENSITIVITY,
            "pinch_threshold": gesture::PINCH_THRESHOLD_PX,
            "rotate_threshold": gesture::ROTATE_THRESHOLD_RAD,
            "rotate_damping": gesture::ROTATE_DAMPING,
            "min_scale": gesture::MIN_MODEL_SCALE,
            "max_scale": gesture::MAX_MODEL_SCALE,
            "initial_scale": gesture::INITIAL_MODEL_SCALE
        },
        "tracking": {
            "capability_timeout_secs": tracking::CAPABILITY_TIMEOUT_SECS,
            "surface_debounce_frames": tracking::SURFACE_DEBOUNCE_FRAMES,
            "marker_tracking": tracking::MARKER_TRACKING_ENABLED
        },
        "fallback": {
            "model_distance": tracking::FALLBACK_MODEL_DISTANCE,
            "prefer_rear_camera": true
        },
        "render": {
            "easing": render_settings::TRANSFORM_EASING,
            "target_model_size": render_settings::TARGET_MODEL_SIZE
        }
    });

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let config_path = manifest_dir.join("assets").join(path::VIEWER_CONFIG_PATH);

    // Deployments edit the shipped file; only seed it when absent.
    if config_path.exists() {
        return;
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create assets/config");
    }
    let json_content = serde_json::to_string_pretty(&defaults).unwrap();
    fs::write(&config_path, json_content).expect("Failed to write viewer config defaults");

    println!("cargo:warning=Generated default {}", path::VIEWER_CONFIG_PATH);
}
