//! Per-frame model presentation.
//!
//! The transform synchroniser is the only writer of the model root's
//! `Transform`; everything else feeds it through `ModelState` and the
//! published [`transform_sync::SyncTarget`].

/// Anchor pose and user transform composition with easing.
pub mod transform_sync;
