use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::path::VIEWER_CONFIG_PATH;

use crate::engine::assets::viewer_config::ViewerConfig;
use crate::engine::capability::CapabilityProbe;
use crate::engine::fallback::FallbackCompositor;
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::render::transform_sync::TransformSynchronizer;
use crate::engine::spatial::ModelState;
use crate::engine::tracking::SpatialAnchorEngine;
use crate::tools::gesture::GestureController;

#[derive(Resource, Default)]
pub struct ConfigLoader {
    handle: Option<Handle<ViewerConfig>>,
}

/// Start loading the runtime configuration.
pub fn start_loading(mut config_loader: ResMut<ConfigLoader>, asset_server: Res<AssetServer>) {
    config_loader.handle = Some(asset_server.load(VIEWER_CONFIG_PATH));
}

/// Apply the loaded configuration to every component, or keep the
/// compile-time defaults when the file is missing or invalid.
#[allow(clippy::too_many_arguments)]
pub fn apply_viewer_config(
    mut loading_progress: ResMut<LoadingProgress>,
    config_loader: Res<ConfigLoader>,
    asset_server: Res<AssetServer>,
    configs: Res<Assets<ViewerConfig>>,
    mut active: ResMut<ViewerConfig>,
    mut probe: ResMut<CapabilityProbe>,
    mut anchor_engine: ResMut<SpatialAnchorEngine>,
    mut compositor: ResMut<FallbackCompositor>,
    mut gestures: ResMut<GestureController>,
    mut model: ResMut<ModelState>,
    mut synchronizer: ResMut<TransformSynchronizer>,
) {
    if loading_progress.config_resolved {
        return;
    }
    let Some(handle) = config_loader.handle.as_ref() else {
        return;
    };

    let config = match asset_server.get_load_state(handle) {
        Some(LoadState::Loaded) => match configs.get(handle) {
            Some(config) => config.clone(),
            None => return,
        },
        Some(LoadState::Failed(error)) => {
            warn!("Viewer config unavailable ({}), using defaults", error);
            ViewerConfig::default()
        }
        _ => return,
    };

    let config = match config.validate() {
        Ok(()) => {
            info!("✓ Viewer config loaded");
            config
        }
        Err(error) => {
            warn!("Invalid viewer config ({}), using defaults", error);
            ViewerConfig::default()
        }
    };

    probe.configure(&config.tracking);
    anchor_engine.set_debounce_frames(config.tracking.surface_debounce_frames);
    compositor.configure(&config.fallback);
    gestures.set_config(config.gesture.clone());
    if let Ok(limits) = config.gesture.scale_limits() {
        *model = ModelState::new(Vec3::ZERO, config.gesture.initial_scale, limits);
    }
    synchronizer.set_easing(config.render.easing);

    *active = config;
    loading_progress.config_resolved = true;
}
