//! Scene camera for the preview and the AR strategies.
//!
//! In AR the camera mirrors the device pose reported by the tracking session
//! (or stays at the origin for the camera-space fallback) and the clear
//! colour turns transparent so the page's camera image shows through.

/// Camera spawn, per-strategy pose and clear colour.
pub mod ar_camera;

pub use ar_camera::{ArCamera, spawn_ar_camera, update_ar_camera};
