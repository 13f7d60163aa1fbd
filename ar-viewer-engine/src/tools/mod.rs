//! User-facing interaction with the viewed model.
//!
//! ## Mode Manager
//!
//! `ArModeManager` owns the viewer mode: plain preview, capability detection,
//! or AR with the chosen strategy. Mode changes arrive as `ArModeEvent`s from
//! RPC (`enter_ar` / `exit_ar`) or the keyboard (native only):
//!
//! ```text
//! Keyboard/RPC Input
//!   └─> ArModeEvent
//!       └─> handle_ar_mode_events()
//!           ├─> Enter: start capability probe → Detecting
//!           │     └─> advance_ar_session(): probe resolves → start strategy
//!           └─> Exit: end tracking, release camera, keep model state
//! ```
//!
//! Failures while in AR degrade to the next strategy where possible and
//! otherwise return to preview with a `viewer_error` notification.
//!
//! ## Gestures
//!
//! Touch and mouse input becomes `PointerEvent`s consumed by the
//! `GestureController`, the only writer of `ModelState` at runtime:
//! - **Tap**: toggle selection, or place the model while a surface is found
//! - **Double tap**: reset the transform and unselect
//! - **One-finger drag**: pan in the camera plane (selected model only)
//! - **Pinch / twist**: scale and yaw together
//!
//! ## Manipulation Feedback
//!
//! The model's projected screen rectangle decides which taps belong to the
//! model, and a wireframe bounds box marks the selection.
//!
//! ## Keyboard Shortcuts (native)
//!
//! - `A`: toggle AR
//! - `R`: reset the model transform

/// Pointer normalisation, gesture recognition and per-frame commit.
pub mod gesture;

/// Screen rectangle of the model and the selection outline.
pub mod manipulation;

/// Viewer mode, AR session orchestration and host-driven controls.
pub mod mode_manager;
