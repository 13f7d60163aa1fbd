use std::path::Path;

use bevy::asset::io::memory::Dir;
use bevy::prelude::*;

use crate::engine::assets::bounds::ModelBounds;
use crate::engine::assets::model_library::{LoadEvent, LoadedModel, ModelHandle, ModelLibrary};
use crate::engine::assets::viewer_config::ViewerConfig;
use crate::engine::content::{ContentRecord, route_content_id};
use crate::engine::error::{AssetError, ContentError, ViewerErrorEvent};
use crate::engine::loading::progress::LoadingProgress;
use crate::engine::render::transform_sync::{SnapTransform, ViewerModel};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::gesture::GestureController;

/// Backing store of the `model-cache://` asset source.
#[derive(Resource, Clone, Default)]
pub struct ModelCacheDir(pub Dir);

impl ModelCacheDir {
    fn insert(&self, model: &LoadedModel) {
        let folder = model.folder();
        for file in &model.files {
            let path = format!("{folder}/{}", file.path);
            self.0.insert_asset(Path::new(&path), file.bytes.clone());
        }
    }

    fn remove(&self, model: &LoadedModel) {
        let folder = model.folder();
        for file in &model.files {
            let path = format!("{folder}/{}", file.path);
            self.0.remove_asset(Path::new(&path));
        }
    }
}

/// Content record pushed by the host.
#[derive(Event, Debug, Clone)]
pub struct LoadContentEvent {
    pub record: ContentRecord,
}

/// Model bounds after centering and fit scaling, in the root's local space.
#[derive(Component, Debug, Clone, Copy)]
pub struct ModelExtent(pub ModelBounds);

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ModelLoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(AssetError),
}

impl ModelLoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// The record being shown and the state of its model.
#[derive(Resource, Default)]
pub struct ContentState {
    pub record: Option<ContentRecord>,
    pub model: Option<ModelHandle>,
    pub status: ModelLoadStatus,
    pub root: Option<Entity>,
    /// Set when the page route named an invalid content id. AR stays
    /// unavailable until the host pushes a viewable record.
    pub route_rejected: Option<ContentError>,
}

impl ContentState {
    /// Whether a failed load can be retried.
    pub fn can_retry(&self) -> bool {
        matches!(&self.status, ModelLoadStatus::Failed(error) if error.is_retryable())
    }
}

/// Ask the host for the record named by the page route.
pub fn check_viewer_route(
    mut content: ResMut<ContentState>,
    mut loading_progress: ResMut<LoadingProgress>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut errors: EventWriter<ViewerErrorEvent>,
) {
    match route_content_id() {
        Ok(Some(id)) => {
            info!("Viewer route names content {}", id);
            rpc_interface.send_notification(
                "content_requested",
                serde_json::json!({ "id": id.to_string() }),
            );
        }
        Ok(None) => debug!("No content id in the page route"),
        Err(error) => {
            warn!("Rejected viewer route: {}", error);
            content.route_rejected = Some(error.clone());
            errors.write(ViewerErrorEvent::new(error));
        }
    }
    loading_progress.route_checked = true;
}

/// Replace the shown model with the one named by the newest record.
#[allow(clippy::too_many_arguments)]
pub fn handle_load_content(
    mut commands: Commands,
    mut events: EventReader<LoadContentEvent>,
    mut content: ResMut<ContentState>,
    mut library: ResMut<ModelLibrary>,
    cache: Res<ModelCacheDir>,
    mut gestures: ResMut<GestureController>,
    mut errors: EventWriter<ViewerErrorEvent>,
) {
    let Some(event) = events.read().last() else {
        return;
    };
    let record = event.record.clone();

    let url = match record.viewable_model_url() {
        Ok(url) => url.to_string(),
        Err(error) => {
            warn!("Content {} cannot be shown: {}", record.id, error);
            errors.write(ViewerErrorEvent::new(error));
            return;
        }
    };

    release_model(&mut commands, &mut content, &mut library, &cache);
    gestures.cancel();
    gestures.unselect();
    gestures.request_reset();

    info!("Showing content {} ({})", record.id, record.title);
    content.route_rejected = None;
    content.record = Some(record);
    match library.load(&url) {
        Ok(handle) => {
            content.model = Some(handle);
            content.status = ModelLoadStatus::Loading;
        }
        Err(error) => {
            content.status = ModelLoadStatus::Failed(error.clone());
            errors.write(ViewerErrorEvent::new(error));
        }
    }
}

/// Poll in-flight loads and spawn the model once its files are cached.
#[allow(clippy::too_many_arguments)]
pub fn poll_model_library(
    mut commands: Commands,
    mut library: ResMut<ModelLibrary>,
    mut content: ResMut<ContentState>,
    cache: Res<ModelCacheDir>,
    asset_server: Res<AssetServer>,
    config: Res<ViewerConfig>,
    mut snaps: EventWriter<SnapTransform>,
    mut errors: EventWriter<ViewerErrorEvent>,
) {
    for event in library.poll() {
        match event {
            LoadEvent::Loaded(handle) if content.model == Some(handle) => {
                let Some(model) = library.get(handle) else {
                    continue;
                };
                cache.insert(&model);
                let root = spawn_model(
                    &mut commands,
                    &asset_server,
                    &model,
                    config.render.target_model_size,
                );
                content.root = Some(root);
                content.status = ModelLoadStatus::Loaded;
                snaps.write(SnapTransform);
            }
            LoadEvent::Failed(handle, error) if content.model == Some(handle) => {
                content.status = ModelLoadStatus::Failed(error.clone());
                errors.write(ViewerErrorEvent::new(error));
            }
            other => debug!("Ignoring load event for a replaced model: {:?}", other),
        }
    }
}

/// Restart the current model load after a network failure.
pub fn retry_model_load(content: &mut ContentState, library: &mut ModelLibrary) -> bool {
    if !content.can_retry() {
        return false;
    }
    let Some(handle) = content.model else {
        return false;
    };
    if library.retry(handle) {
        content.status = ModelLoadStatus::Loading;
        true
    } else {
        false
    }
}

fn release_model(
    commands: &mut Commands,
    content: &mut ContentState,
    library: &mut ModelLibrary,
    cache: &ModelCacheDir,
) {
    if let Some(root) = content.root.take() {
        commands.entity(root).despawn();
    }
    if let Some(model) = content.model.take().and_then(|handle| library.release(handle)) {
        cache.remove(&model);
    }
    content.status = ModelLoadStatus::Idle;
}

/// Root carries the synchronised transform; the child centres the model on
/// its base and fits its largest dimension to `target_size`.
fn spawn_model(
    commands: &mut Commands,
    asset_server: &AssetServer,
    model: &LoadedModel,
    target_size: f32,
) -> Entity {
    let bounds = model.bounds;
    let fit = bounds.fit_scale(target_size);
    let offset = bounds.placement_offset();
    let extent = ModelBounds::new((bounds.min + offset) * fit, (bounds.max + offset) * fit);

    let scene = asset_server.load(GltfAssetLabel::Scene(0).from_asset(model.asset_path()));
    let root = commands
        .spawn((
            ViewerModel,
            ModelExtent(extent),
            Transform::default(),
            Visibility::Hidden,
            Name::new(format!("model {}", model.url)),
        ))
        .with_children(|parent| {
            parent.spawn((
                SceneRoot(scene),
                Transform::from_translation(offset * fit).with_scale(Vec3::splat(fit)),
            ));
        })
        .id();

    info!(
        "Spawned model {} (fit scale {:.3}, extent {:?})",
        model.url,
        fit,
        extent.size()
    );
    root
}
