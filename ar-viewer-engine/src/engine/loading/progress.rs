use bevy::prelude::*;

/// Startup progress driving the `AppState` transitions.
#[derive(Resource, Default, Debug)]
pub struct LoadingProgress {
    /// `config/viewer.json` was applied, or defaults were kept.
    pub config_resolved: bool,
    /// The page route was checked for a content id.
    pub route_checked: bool,
}

impl LoadingProgress {
    pub fn is_complete(&self) -> bool {
        self.config_resolved && self.route_checked
    }
}
