use bevy::prelude::*;

use crate::engine::loading::progress::LoadingProgress;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

/// Per-frame order of the running viewer. Chained, so each set sees the
/// results of the previous one within the same frame.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArFrameSet {
    /// Host messages become events and bridge state.
    Rpc,
    /// AR enter/exit, capability detection, session advancement.
    Mode,
    /// Pointer input into the gesture controller.
    Input,
    /// Placement requests against the current tracking frame.
    Tracking,
    /// Pending gesture deltas are committed to the model state.
    Commit,
    /// Model, camera and reticle transforms follow the committed state.
    Sync,
    /// Status, overlay and outgoing messages.
    Output,
}

pub fn transition_to_running(
    loading_progress: Res<LoadingProgress>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if loading_progress.is_complete() {
        info!("Viewer ready, transitioning to Running state");
        next_state.set(AppState::Running);
    }
}
