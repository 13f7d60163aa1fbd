//! Compile-time defaults shared by the viewer engine and its build script.
//!
//! Every value here can be overridden at runtime through `config/viewer.json`.

pub mod gesture;
pub mod path;
pub mod render_settings;
pub mod tracking;
