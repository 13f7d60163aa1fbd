pub mod assets;
pub mod camera;
pub mod capability;
pub mod content;
pub mod core;
pub mod error;
pub mod fallback;
pub mod loading;
pub mod render;
pub mod scene;
pub mod spatial;
pub mod systems;
pub mod tracking;
