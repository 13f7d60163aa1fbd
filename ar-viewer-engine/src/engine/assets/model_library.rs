//! URL-keyed model cache.
//!
//! A load runs in two stages, both polled once per frame: the descriptor
//! fetch, then one fetch per external file it references. Each URL is
//! fetched once no matter how many times it is requested.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::*;
use constants::path::MODEL_CACHE_SOURCE;
use url::Url;

use super::bounds::ModelBounds;
use super::descriptor::{DependencyKind, ModelFormat, parse_model};
use super::fetch::{AssetFetcher, FetchResult, platform_fetcher};
use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::AssetError;

/// Opaque reference to a model in the [`ModelLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(u64);

impl ModelHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed(AssetError),
}

/// One file of a loaded model, keyed by its path inside the model folder.
#[derive(Debug, Clone)]
pub struct CachedFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// A fully fetched and validated model.
#[derive(Debug)]
pub struct LoadedModel {
    pub handle: ModelHandle,
    pub url: Url,
    pub format: ModelFormat,
    pub bounds: ModelBounds,
    /// Descriptor first, then every external file it references.
    pub files: Vec<CachedFile>,
}

impl LoadedModel {
    /// Folder of this model inside the in-memory asset source.
    pub fn folder(&self) -> String {
        self.handle.0.to_string()
    }

    /// Asset path of the descriptor, e.g. `model-cache://3/duck.gltf`.
    pub fn asset_path(&self) -> String {
        let entry = self.files.first().map_or("", |file| file.path.as_str());
        format!("{MODEL_CACHE_SOURCE}://{}/{entry}", self.folder())
    }
}

/// Completion notice returned by [`ModelLibrary::poll`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Loaded(ModelHandle),
    Failed(ModelHandle, AssetError),
}

struct PendingFile {
    url: Url,
    path: String,
    min_length: usize,
    slot: AsyncSlot<FetchResult>,
    bytes: Option<Vec<u8>>,
}

enum Stage {
    Descriptor(AsyncSlot<FetchResult>),
    Files {
        bounds: ModelBounds,
        descriptor: Vec<u8>,
        pending: Vec<PendingFile>,
    },
    Loaded(Arc<LoadedModel>),
    Failed(AssetError),
}

struct Entry {
    url: Url,
    format: ModelFormat,
    stage: Stage,
}

#[derive(Resource)]
pub struct ModelLibrary {
    fetcher: Box<dyn AssetFetcher>,
    by_url: HashMap<String, ModelHandle>,
    entries: HashMap<ModelHandle, Entry>,
    next_id: u64,
}

impl Default for ModelLibrary {
    fn default() -> Self {
        Self::new(platform_fetcher())
    }
}

impl ModelLibrary {
    pub fn new(fetcher: Box<dyn AssetFetcher>) -> Self {
        Self {
            fetcher,
            by_url: HashMap::new(),
            entries: HashMap::new(),
            next_id: 0,
        }
    }

    /// Start loading `url`, or return the handle of an earlier request for it.
    ///
    /// Invalid URLs and unsupported formats fail here, before any fetch.
    pub fn load(&mut self, url: &str) -> Result<ModelHandle, AssetError> {
        let parsed =
            Url::parse(url).map_err(|e| AssetError::malformed(url, format!("invalid URL: {e}")))?;
        if let Some(&handle) = self.by_url.get(parsed.as_str()) {
            return Ok(handle);
        }

        let format = ModelFormat::from_path(parsed.path()).map_err(|extension| {
            AssetError::UnsupportedFormat {
                url: parsed.to_string(),
                extension,
            }
        })?;

        let handle = ModelHandle(self.next_id);
        self.next_id += 1;

        info!("Loading model {} ({:?}) as {:?}", parsed, format, handle);
        let slot = self.fetcher.fetch(&parsed);
        self.by_url.insert(parsed.to_string(), handle);
        self.entries.insert(
            handle,
            Entry {
                url: parsed,
                format,
                stage: Stage::Descriptor(slot),
            },
        );
        Ok(handle)
    }

    pub fn handle_for(&self, url: &str) -> Option<ModelHandle> {
        let parsed = Url::parse(url).ok()?;
        self.by_url.get(parsed.as_str()).copied()
    }

    pub fn load_state(&self, handle: ModelHandle) -> Option<LoadState> {
        self.entries.get(&handle).map(|entry| match &entry.stage {
            Stage::Descriptor(_) | Stage::Files { .. } => LoadState::Loading,
            Stage::Loaded(_) => LoadState::Loaded,
            Stage::Failed(error) => LoadState::Failed(error.clone()),
        })
    }

    pub fn get(&self, handle: ModelHandle) -> Option<Arc<LoadedModel>> {
        match &self.entries.get(&handle)?.stage {
            Stage::Loaded(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    /// Advance every in-flight load. Returns the loads that finished this call.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut handles: Vec<ModelHandle> = self.entries.keys().copied().collect();
        handles.sort();
        handles
            .into_iter()
            .filter_map(|handle| self.advance(handle))
            .collect()
    }

    /// Restart a load that failed with a network error.
    /// Returns `false` when there is nothing to retry.
    pub fn retry(&mut self, handle: ModelHandle) -> bool {
        let Some(entry) = self.entries.get_mut(&handle) else {
            return false;
        };
        match &entry.stage {
            Stage::Failed(error) if error.is_retryable() => {
                info!("Retrying model {}", entry.url);
                entry.stage = Stage::Descriptor(self.fetcher.fetch(&entry.url));
                true
            }
            _ => false,
        }
    }

    /// Forget a model. Returns its files if it had finished loading so the
    /// caller can drop them from the asset source.
    pub fn release(&mut self, handle: ModelHandle) -> Option<Arc<LoadedModel>> {
        let entry = self.entries.remove(&handle)?;
        self.by_url.remove(entry.url.as_str());
        debug!("Released model {:?}", handle);
        match entry.stage {
            Stage::Loaded(model) => Some(model),
            _ => None,
        }
    }

    fn advance(&mut self, handle: ModelHandle) -> Option<LoadEvent> {
        let entry = self.entries.get_mut(&handle)?;

        if let Stage::Descriptor(slot) = &entry.stage {
            let result = slot.take()?;
            entry.stage = match result
                .and_then(|bytes| start_files(&entry.url, entry.format, bytes, self.fetcher.as_ref()))
            {
                Ok(stage) => stage,
                Err(error) => return Some(fail(handle, entry, error)),
            };
        }

        let Stage::Files {
            bounds,
            descriptor,
            pending,
        } = &mut entry.stage
        else {
            return None;
        };

        let mut failure = None;
        for file in pending.iter_mut().filter(|file| file.bytes.is_none()) {
            match file.slot.take() {
                Some(Ok(bytes)) if bytes.len() < file.min_length => {
                    failure = Some(AssetError::malformed(
                        file.url.as_str(),
                        format!(
                            "buffer has {} bytes but {} are declared",
                            bytes.len(),
                            file.min_length
                        ),
                    ));
                    break;
                }
                Some(Ok(bytes)) => file.bytes = Some(bytes),
                Some(Err(error)) => {
                    failure = Some(error);
                    break;
                }
                None => {}
            }
        }
        if let Some(error) = failure {
            return Some(fail(handle, entry, error));
        }
        if pending.iter().any(|file| file.bytes.is_none()) {
            return None;
        }

        let mut files = vec![CachedFile {
            path: entry_file_name(&entry.url, entry.format),
            bytes: std::mem::take(descriptor),
        }];
        files.extend(pending.iter_mut().filter_map(|file| {
            file.bytes.take().map(|bytes| CachedFile {
                path: file.path.clone(),
                bytes,
            })
        }));

        let model = LoadedModel {
            handle,
            url: entry.url.clone(),
            format: entry.format,
            bounds: *bounds,
            files,
        };
        info!(
            "Model {} loaded: {} file(s), size {:?}",
            model.url,
            model.files.len(),
            model.bounds.size()
        );
        entry.stage = Stage::Loaded(Arc::new(model));
        Some(LoadEvent::Loaded(handle))
    }
}

fn fail(handle: ModelHandle, entry: &mut Entry, error: AssetError) -> LoadEvent {
    warn!("Model {} failed to load: {}", entry.url, error);
    entry.stage = Stage::Failed(error.clone());
    LoadEvent::Failed(handle, error)
}

/// Parse the descriptor and issue fetches for every external file.
fn start_files(
    url: &Url,
    format: ModelFormat,
    descriptor: Vec<u8>,
    fetcher: &dyn AssetFetcher,
) -> Result<Stage, AssetError> {
    let parsed = parse_model(format, &descriptor)
        .map_err(|reason| AssetError::malformed(url.as_str(), reason.to_string()))?;

    let mut pending: Vec<PendingFile> = Vec::new();
    for dependency in parsed.dependencies {
        let (resolved, path) = resolve_in_folder(url, &dependency.uri)?;
        let min_length = match dependency.kind {
            DependencyKind::Buffer { byte_length } => byte_length,
            DependencyKind::Image => 0,
        };

        if let Some(existing) = pending.iter_mut().find(|file| file.url == resolved) {
            existing.min_length = existing.min_length.max(min_length);
            continue;
        }
        let slot = fetcher.fetch(&resolved);
        pending.push(PendingFile {
            url: resolved,
            path,
            min_length,
            slot,
            bytes: None,
        });
    }

    Ok(Stage::Files {
        bounds: parsed.bounds,
        descriptor,
        pending,
    })
}

/// Resolve `reference` against the descriptor URL. The result must stay
/// inside the descriptor's folder; returns the URL and the folder-relative path.
fn resolve_in_folder(descriptor: &Url, reference: &str) -> Result<(Url, String), AssetError> {
    let escapes = || {
        AssetError::malformed(
            descriptor.as_str(),
            format!("reference '{reference}' leaves the model folder"),
        )
    };

    let resolved = descriptor.join(reference).map_err(|e| {
        AssetError::malformed(descriptor.as_str(), format!("bad reference '{reference}': {e}"))
    })?;
    let folder = descriptor.join(".").map_err(|_| escapes())?;

    let same_location = resolved.scheme() == folder.scheme()
        && resolved.host_str() == folder.host_str()
        && resolved.port_or_known_default() == folder.port_or_known_default();
    if !same_location {
        return Err(escapes());
    }

    let relative = resolved
        .path()
        .strip_prefix(folder.path())
        .filter(|rest| !rest.is_empty())
        .ok_or_else(escapes)?;
    Ok((resolved.clone(), relative.to_string()))
}

fn entry_file_name(url: &Url, format: ModelFormat) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match format {
            ModelFormat::Gltf => "model.gltf".to_string(),
            ModelFormat::Glb => "model.glb".to_string(),
        })
}
