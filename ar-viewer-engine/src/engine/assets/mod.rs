//! Model and configuration assets.
//!
//! Models are fetched by URL, validated, and cached in memory so the renderer
//! can load them through the `model-cache://` asset source.

/// Axis-aligned model bounds used for centering and fit scaling.
pub mod bounds;

/// glTF / GLB descriptor inspection: version, external files, bounds.
pub mod descriptor;

/// Byte fetching seam with browser and local-file implementations.
pub mod fetch;

/// URL-keyed model cache with frame-polled loading.
pub mod model_library;

/// Runtime configuration loaded from `config/viewer.json`.
pub mod viewer_config;
