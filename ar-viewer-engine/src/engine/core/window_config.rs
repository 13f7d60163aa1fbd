use bevy::prelude::*;
use bevy::window::{CompositeAlphaMode, PresentMode};

/// Primary window. On the web the canvas is transparent so the camera feed
/// or the host's AR layer shows through behind the model.
pub fn create_window_config() -> Window {
    #[cfg(target_arch = "wasm32")]
    {
        Window {
            canvas: Some("#bevy".into()),
            fit_canvas_to_parent: true,
            prevent_default_event_handling: true,
            transparent: true,
            composite_alpha_mode: CompositeAlphaMode::PreMultiplied,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "AR Viewer".into(),
            present_mode: PresentMode::AutoVsync,
            composite_alpha_mode: CompositeAlphaMode::Auto,
            ..default()
        }
    }
}
