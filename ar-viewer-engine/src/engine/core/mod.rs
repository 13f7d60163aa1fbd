//! Core application setup and state management.
//!
//! Handles application lifecycle, window configuration, the per-frame system
//! order and the glue between browser promises and the frame loop.

/// App construction: plugins, resources, events and system scheduling.
pub mod app_setup;

/// `Loading` → `Running` states and the per-frame `ArFrameSet` order.
pub mod app_state;

/// Single-assignment slot filled by async browser tasks and polled per frame.
pub mod async_slot;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures a transparent canvas for web targets and vsync settings.
pub mod window_config;

#[cfg(target_arch = "wasm32")]
pub mod web;
