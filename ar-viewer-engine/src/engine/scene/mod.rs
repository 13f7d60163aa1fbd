//! Scene furniture around the model.
//!
//! Provides the placement reticle and the status overlay that explains
//! what the viewer is waiting for.

/// Placement reticle following the hit pose while nothing is anchored.
pub mod reticle;

/// Bevy UI overlay for loading, searching and error messages.
pub mod status_overlay;
