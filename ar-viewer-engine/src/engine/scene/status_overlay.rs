use bevy::prelude::*;

use crate::engine::capability::Strategy;
use crate::engine::systems::status_notifications::ViewerStatus;
use crate::engine::tracking::TrackingStatus;
use crate::tools::mode_manager::ViewerMode;

#[derive(Component)]
pub struct StatusText;

#[derive(Component)]
pub struct FpsText;

pub fn spawn_status_overlay(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new(""),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.55)),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(16.0),
                    left: Val::Percent(50.0),
                    padding: UiRect::axes(Val::Px(12.0), Val::Px(6.0)),
                    ..default()
                },
                Visibility::Hidden,
                StatusText,
            ));

            #[cfg(not(target_arch = "wasm32"))]
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

/// Line shown to the user for a status, if any. Errors win over progress.
pub fn overlay_message(status: &ViewerStatus) -> Option<String> {
    if let Some(error) = &status.error {
        return Some(error.message.clone());
    }
    if status.model == "loading" {
        return Some("Loading model...".to_string());
    }

    let message = match status.mode {
        ViewerMode::Detecting => "Checking AR support...",
        ViewerMode::Ar(Strategy::FallbackCamera) => match status.camera {
            "acquiring" => "Opening camera...",
            _ => return None,
        },
        ViewerMode::Ar(_) => match status.tracking {
            TrackingStatus::RequestingCapability => "Starting AR...",
            TrackingStatus::Tracking => "Move your device slowly to find a surface",
            TrackingStatus::SurfaceFound => "Tap to place the model",
            TrackingStatus::Lost => "Searching for the surface...",
            _ => return None,
        },
        ViewerMode::Preview => return None,
    };
    Some(message.to_string())
}

pub fn update_status_overlay(
    status: Res<ViewerStatus>,
    mut texts: Query<(&mut Text, &mut Visibility), With<StatusText>>,
) {
    if !status.is_changed() {
        return;
    }
    let message = overlay_message(&status);
    for (mut text, mut visibility) in &mut texts {
        match &message {
            Some(message) => {
                text.0.clone_from(message);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

pub fn fps_text_update_system(
    status: Res<ViewerStatus>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    let Some(value) = status.fps else {
        return;
    };
    for mut text in &mut query {
        text.0 = format!("FPS: {value:.1}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::{CameraError, ViewerError};

    fn ar_status(tracking: TrackingStatus) -> ViewerStatus {
        ViewerStatus {
            mode: ViewerMode::Ar(Strategy::ImmersiveTracking),
            tracking,
            model: "loaded",
            ..default()
        }
    }

    #[test]
    fn tracking_progress_is_explained() {
        assert_eq!(
            overlay_message(&ar_status(TrackingStatus::SurfaceFound)).as_deref(),
            Some("Tap to place the model")
        );
        assert_eq!(
            overlay_message(&ar_status(TrackingStatus::Lost)).as_deref(),
            Some("Searching for the surface...")
        );
        assert_eq!(overlay_message(&ar_status(TrackingStatus::Anchored)), None);
    }

    #[test]
    fn errors_replace_progress() {
        let mut status = ar_status(TrackingStatus::Tracking);
        status.error = Some(ViewerError::from(CameraError::NotFound).to_user_facing());
        assert_eq!(
            overlay_message(&status).as_deref(),
            Some("No camera was found on this device.")
        );
    }
}
