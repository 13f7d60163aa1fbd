use bevy::asset::AssetMetaCheck;
use bevy::asset::io::AssetSourceBuilder;
use bevy::asset::io::memory::MemoryAssetReader;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::path::MODEL_CACHE_SOURCE;
use constants::tracking::SURFACE_DEBOUNCE_FRAMES;

// Crate engine modules
use crate::engine::assets::model_library::ModelLibrary;
use crate::engine::assets::viewer_config::ViewerConfig;
use crate::engine::camera::ar_camera::preview_clear_color;
use crate::engine::camera::{spawn_ar_camera, update_ar_camera};
use crate::engine::capability::CapabilityProbe;
use crate::engine::core::app_state::{AppState, ArFrameSet, transition_to_running};
use crate::engine::core::window_config::create_window_config;
use crate::engine::error::ViewerErrorEvent;
use crate::engine::fallback::FallbackCompositor;
use crate::engine::loading::config_loader::{ConfigLoader, apply_viewer_config, start_loading};
use crate::engine::loading::model_loader::{
    ContentState, LoadContentEvent, ModelCacheDir, check_viewer_route, handle_load_content,
    poll_model_library,
};
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::render::transform_sync::{
    SnapTransform, SyncTargetState, TransformSynchronizer, sync_model_transform,
};
use crate::engine::scene::reticle::{spawn_reticle, update_reticle};
use crate::engine::scene::status_overlay::{
    fps_text_update_system, spawn_status_overlay, update_status_overlay,
};
use crate::engine::spatial::ModelState;
use crate::engine::systems::status_notifications::{
    ViewerStatus, forward_host_requests, notify_viewer_status, report_viewer_errors,
    update_viewer_status,
};
use crate::engine::tracking::{HostTrackingBridge, SpatialAnchorEngine};
// Crate tools modules
use crate::tools::gesture::{
    GestureController, MousePointer, PlacementRequest, PointerEvent, collect_pointer_input,
    commit_gestures, process_pointer_events,
};
use crate::tools::manipulation::{
    ModelScreenRect, attach_selection_outline, update_model_screen_rect, update_selection_outline,
};
use crate::tools::mode_manager::{
    ArModeEvent, ArModeManager, InteractionEvent, ResetTransformEvent, RetryEvent,
    advance_ar_session, handle_ar_mode_events, handle_interaction_events,
    handle_mode_keyboard_shortcuts, handle_placement_requests, handle_reset_events,
    handle_retry_events, publish_sync_target,
};
// Web RPC
use crate::rpc::web_rpc::{RpcSet, WebRpcPlugin};

pub fn create_app() -> App {
    let mut app = App::new();

    // Fetched model files are served from memory so glTF siblings resolve.
    // The source must exist before the asset plugin is built.
    let cache = ModelCacheDir::default();
    let cache_root = cache.0.clone();
    app.register_asset_source(
        MODEL_CACHE_SOURCE,
        AssetSourceBuilder::default().with_reader(move || {
            Box::new(MemoryAssetReader {
                root: cache_root.clone(),
            })
        }),
    );

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers ViewerConfig as a loadable asset type from JSON files.
        .add_plugins(JsonAssetPlugin::<ViewerConfig>::new(&["json"]))
        .add_plugins(WebRpcPlugin);

    let bridge = HostTrackingBridge::new();
    let anchor_engine =
        SpatialAnchorEngine::new(Box::new(bridge.clone()), SURFACE_DEBOUNCE_FRAMES);

    // Initialise resources early
    app.insert_resource(cache)
        .insert_resource(bridge)
        .insert_resource(anchor_engine)
        .insert_resource(ClearColor(preview_clear_color()))
        .init_resource::<ViewerConfig>()
        .init_resource::<ConfigLoader>()
        .init_resource::<LoadingProgress>()
        .init_resource::<ModelLibrary>()
        .init_resource::<ContentState>()
        .init_resource::<CapabilityProbe>()
        .init_resource::<FallbackCompositor>()
        .init_resource::<GestureController>()
        .init_resource::<MousePointer>()
        .init_resource::<ModelState>()
        .init_resource::<TransformSynchronizer>()
        .init_resource::<SyncTargetState>()
        .init_resource::<ModelScreenRect>()
        .init_resource::<ArModeManager>()
        .init_resource::<ViewerStatus>()
        .add_event::<PointerEvent>()
        .add_event::<PlacementRequest>()
        .add_event::<SnapTransform>()
        .add_event::<LoadContentEvent>()
        .add_event::<ViewerErrorEvent>()
        .add_event::<ArModeEvent>()
        .add_event::<ResetTransformEvent>()
        .add_event::<InteractionEvent>()
        .add_event::<RetryEvent>();

    configure_frame_sets(&mut app);

    app.add_systems(
        Startup,
        (
            start_loading,
            spawn_ar_camera,
            spawn_lighting,
            spawn_reticle,
            spawn_status_overlay,
            check_viewer_route,
        ),
    )
    .add_systems(
        Update,
        (apply_viewer_config, transition_to_running)
            .chain()
            .run_if(in_state(AppState::Loading)),
    );

    // Content pushed by the host before the viewer is running still starts
    // loading; spawning waits for the config.
    app.add_systems(Update, handle_load_content.in_set(ArFrameSet::Mode))
        .add_systems(
            Update,
            (report_viewer_errors, forward_host_requests)
                .chain()
                .in_set(ArFrameSet::Output),
        );

    let runtime_systems = (
        handle_mode_keyboard_shortcuts.in_set(ArFrameSet::Rpc),
        (
            poll_model_library,
            handle_ar_mode_events,
            handle_retry_events,
            advance_ar_session,
            handle_interaction_events,
        )
            .chain()
            .after(handle_load_content)
            .in_set(ArFrameSet::Mode),
        (collect_pointer_input, process_pointer_events, handle_reset_events)
            .chain()
            .in_set(ArFrameSet::Input),
        (handle_placement_requests, publish_sync_target)
            .chain()
            .in_set(ArFrameSet::Tracking),
        commit_gestures.in_set(ArFrameSet::Commit),
        (
            sync_model_transform,
            update_ar_camera,
            update_reticle,
            attach_selection_outline,
            update_selection_outline,
            update_model_screen_rect,
        )
            .chain()
            .in_set(ArFrameSet::Sync),
        (
            update_viewer_status,
            notify_viewer_status,
            update_status_overlay,
            fps_text_update_system,
        )
            .chain()
            .after(report_viewer_errors)
            .in_set(ArFrameSet::Output),
    );

    app.add_systems(Update, runtime_systems.run_if(in_state(AppState::Running)));

    app
}

fn configure_frame_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            ArFrameSet::Rpc,
            ArFrameSet::Mode,
            ArFrameSet::Input,
            ArFrameSet::Tracking,
            ArFrameSet::Commit,
            ArFrameSet::Sync,
            ArFrameSet::Output,
        )
            .chain(),
    )
    .configure_sets(Update, RpcSet::Intake.in_set(ArFrameSet::Rpc))
    // Flush after everything else in the output stage has queued its messages.
    .configure_sets(Update, RpcSet::Flush.after(ArFrameSet::Output));
}

fn spawn_lighting(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            illuminance: 4_000.0,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
    commands.insert_resource(AmbientLight {
        brightness: 400.0,
        ..default()
    });
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
