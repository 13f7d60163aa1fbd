//! Startup and content loading.
//!
//! Startup resolves the runtime configuration and checks the page route
//! before the app enters `Running`. Models are loaded whenever the host
//! pushes a content record, at any point after that.

/// Runtime configuration loading and distribution to the components.
pub mod config_loader;

/// Content records to spawned models, through the in-memory asset source.
pub mod model_loader;

/// Loading progress tracking resource for state transitions.
pub mod progress;
