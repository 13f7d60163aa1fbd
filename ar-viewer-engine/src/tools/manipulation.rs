use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::alpha::AlphaMode;
use bevy::render::mesh::{Indices, PrimitiveTopology};

use crate::engine::assets::bounds::ModelBounds;
use crate::engine::camera::ArCamera;
use crate::engine::loading::model_loader::ModelExtent;
use crate::engine::render::transform_sync::ViewerModel;
use crate::tools::gesture::GestureController;

/// Screen rectangle covered by the model, in logical pixels. `None` while
/// hidden, missing or partly behind the camera.
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq)]
pub struct ModelScreenRect(pub Option<Rect>);

/// Wireframe box shown around the model while it is selected.
#[derive(Component)]
pub struct SelectionOutline;

/// Bounding rectangle of projected points; `None` if any failed to project.
pub fn screen_rect(points: impl IntoIterator<Item = Option<Vec2>>) -> Option<Rect> {
    let mut points = points.into_iter();
    let first = points.next()??;
    points.try_fold(Rect::from_corners(first, first), |rect, point| {
        point.map(|p| rect.union_point(p))
    })
}

pub fn update_model_screen_rect(
    cameras: Query<(&Camera, &GlobalTransform), With<ArCamera>>,
    models: Query<(&GlobalTransform, &Visibility, &ModelExtent), With<ViewerModel>>,
    mut rect: ResMut<ModelScreenRect>,
) {
    let next = cameras.single().ok().and_then(|(camera, camera_transform)| {
        let (model_transform, visibility, extent) = models.iter().next()?;
        if *visibility == Visibility::Hidden {
            return None;
        }
        screen_rect(extent.0.corners().map(|corner| {
            camera
                .world_to_viewport(camera_transform, model_transform.transform_point(corner))
                .ok()
        }))
    });

    if rect.0 != next {
        rect.0 = next;
    }
}

/// Attach the selection outline to newly spawned models.
pub fn attach_selection_outline(
    mut commands: Commands,
    models: Query<(Entity, &ModelExtent), Added<ModelExtent>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    for (entity, extent) in &models {
        let outline = commands
            .spawn((
                create_wireframe_mesh_bundle(&mut meshes, &mut materials, &extent.0),
                Visibility::Hidden,
                SelectionOutline,
            ))
            .id();
        commands.entity(entity).add_child(outline);
    }
}

/// Show the outline exactly while the model is selected.
pub fn update_selection_outline(
    gestures: Res<GestureController>,
    mut outlines: Query<&mut Visibility, With<SelectionOutline>>,
) {
    let wanted = if gestures.selected() {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
    for mut visibility in &mut outlines {
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}

/// Twelve box edges as a line list around `bounds`.
fn create_wireframe_mesh_bundle(
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    bounds: &ModelBounds,
) -> (Mesh3d, MeshMaterial3d<StandardMaterial>, Transform) {
    let half = bounds.size() / 2.0;
    let corner = |x: f32, y: f32, z: f32| [x * half.x, y * half.y, z * half.z];
    let edges = [
        // bottom
        ((-1.0, -1.0, -1.0), (1.0, -1.0, -1.0)),
        ((1.0, -1.0, -1.0), (1.0, -1.0, 1.0)),
        ((1.0, -1.0, 1.0), (-1.0, -1.0, 1.0)),
        ((-1.0, -1.0, 1.0), (-1.0, -1.0, -1.0)),
        // top
        ((-1.0, 1.0, -1.0), (1.0, 1.0, -1.0)),
        ((1.0, 1.0, -1.0), (1.0, 1.0, 1.0)),
        ((1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)),
        ((-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0)),
        // verticals
        ((-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0)),
        ((1.0, -1.0, -1.0), (1.0, 1.0, -1.0)),
        ((1.0, -1.0, 1.0), (1.0, 1.0, 1.0)),
        ((-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0)),
    ];
    let vertices: Vec<[f32; 3]> = edges
        .iter()
        .flat_map(|&((ax, ay, az), (bx, by, bz))| [corner(ax, ay, az), corner(bx, by, bz)])
        .collect();

    let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
    let count = vertices.len() as u32;
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, vertices);
    mesh.insert_indices(Indices::U32((0..count).collect()));

    let material = StandardMaterial {
        base_color: Color::srgba(0.2, 0.6, 1.0, 0.9),
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        ..default()
    };

    (
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(material)),
        Transform::from_translation(bounds.center()),
    )
}
