use bevy::prelude::*;
use constants::render_settings::{RETICLE_INNER_RADIUS, RETICLE_OUTER_RADIUS};

use crate::engine::spatial::Pose;
use crate::engine::tracking::SpatialAnchorEngine;

/// Flat ring marking the surface under the screen centre.
#[derive(Component)]
pub struct Reticle;

pub fn spawn_reticle(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.85),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        double_sided: true,
        cull_mode: None,
        ..default()
    });

    commands.spawn((
        Mesh3d(meshes.add(Annulus::new(RETICLE_INNER_RADIUS, RETICLE_OUTER_RADIUS))),
        MeshMaterial3d(material),
        Transform::default(),
        Visibility::Hidden,
        Reticle,
    ));
}

/// Reticle transform for a hit pose: the ring mesh lies in its local XY
/// plane, so it is laid flat onto the surface first.
pub fn reticle_transform(pose: &Pose) -> Transform {
    let lay_flat = Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2);
    Transform::from_translation(pose.position).with_rotation(pose.orientation * lay_flat)
}

pub fn update_reticle(
    anchor_engine: Res<SpatialAnchorEngine>,
    mut reticles: Query<(&mut Transform, &mut Visibility), With<Reticle>>,
) {
    let reticle = anchor_engine.frame().reticle.filter(Pose::is_finite);
    for (mut transform, mut visibility) in &mut reticles {
        match reticle {
            Some(pose) => {
                *transform = reticle_transform(&pose);
                *visibility = Visibility::Inherited;
            }
            None if *visibility != Visibility::Hidden => *visibility = Visibility::Hidden,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reticle_lies_flat_on_an_upright_surface() {
        let transform = reticle_transform(&Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)));
        let normal = transform.rotation * Vec3::Z;
        assert!((normal - Vec3::Y).length() < 1e-5);
        assert_eq!(transform.translation, Vec3::new(0.0, 0.0, -1.0));
    }
}
