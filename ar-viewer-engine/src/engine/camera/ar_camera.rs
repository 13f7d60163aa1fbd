use bevy::prelude::*;
use constants::render_settings::{PREVIEW_CAMERA_FOCUS, PREVIEW_CAMERA_POSITION};

use crate::engine::capability::Strategy;
use crate::engine::spatial::Pose;
use crate::engine::tracking::SpatialAnchorEngine;
use crate::engine::render::transform_sync::SyncTargetState;

/// The single scene camera. Its pose follows the active strategy.
#[derive(Component, Debug, Default)]
pub struct ArCamera;

pub fn preview_camera_transform() -> Transform {
    Transform::from_translation(Vec3::from_array(PREVIEW_CAMERA_POSITION))
        .looking_at(Vec3::from_array(PREVIEW_CAMERA_FOCUS), Vec3::Y)
}

/// Camera pose for a strategy.
///
/// Tracked strategies use the device pose reported by the session; until
/// one arrives the camera sits at the reference-space origin. The fallback
/// works in camera space, so its camera never moves.
pub fn camera_transform(strategy: Option<Strategy>, viewer: Option<Pose>) -> Transform {
    match strategy {
        None => preview_camera_transform(),
        Some(Strategy::FallbackCamera) => Transform::IDENTITY,
        Some(_) => viewer
            .filter(Pose::is_finite)
            .map_or(Transform::IDENTITY, |pose| {
                Transform::from_translation(pose.position).with_rotation(pose.orientation)
            }),
    }
}

pub fn spawn_ar_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            ..default()
        }),
        preview_camera_transform(),
        ArCamera,
    ));
}

/// Move the camera for the active strategy and clear to transparent while
/// the page shows the real world behind the canvas.
pub fn update_ar_camera(
    target: Res<SyncTargetState>,
    anchor_engine: Res<SpatialAnchorEngine>,
    mut clear_color: ResMut<ClearColor>,
    mut cameras: Query<&mut Transform, With<ArCamera>>,
) {
    let strategy = target.0.strategy;
    let next = camera_transform(strategy, anchor_engine.frame().viewer_pose);
    for mut transform in &mut cameras {
        if *transform != next {
            *transform = next;
        }
    }

    let clear = if strategy.is_some() {
        Color::NONE
    } else {
        preview_clear_color()
    };
    if clear_color.0 != clear {
        clear_color.0 = clear;
    }
}

pub fn preview_clear_color() -> Color {
    Color::srgb(0.93, 0.94, 0.96)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_camera_looks_at_the_model() {
        let transform = camera_transform(None, None);
        let to_focus = (Vec3::from_array(PREVIEW_CAMERA_FOCUS) - transform.translation).normalize();
        assert!(transform.forward().dot(to_focus) > 0.999);
    }

    #[test]
    fn tracked_camera_follows_the_viewer() {
        let viewer = Pose::new(Vec3::new(0.1, 1.5, 0.0), Quat::from_rotation_y(0.3));
        let transform = camera_transform(Some(Strategy::ImmersiveTracking), Some(viewer));
        assert_eq!(transform.translation, viewer.position);
        assert_eq!(transform.rotation, viewer.orientation);

        let fallback = camera_transform(Some(Strategy::FallbackCamera), Some(viewer));
        assert_eq!(fallback, Transform::IDENTITY);
    }

    #[test]
    fn non_finite_viewer_pose_is_ignored() {
        let broken = Pose::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(
            camera_transform(Some(Strategy::MarkerTracking), Some(broken)),
            Transform::IDENTITY
        );
    }
}
