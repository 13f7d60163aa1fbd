//! Multi-touch gesture recognition for the viewed model.
//!
//! Touch and mouse input is normalised into [`PointerEvent`]s, fed through
//! [`GestureController::handle_pointer`], and the accumulated delta is
//! committed to [`ModelState`] once per frame.
//!
//! | Pointers | Gesture | Needs selection |
//! |---|---|---|
//! | 1 | tap (toggle selection), double tap (reset) | no |
//! | 1 | pan in the camera plane | yes |
//! | 2 | pinch (scale) and rotate (yaw), together | no |

use bevy::prelude::*;

use crate::engine::camera::ArCamera;
use crate::engine::render::transform_sync::{SnapTransform, SyncTargetState};
use crate::engine::spatial::ModelState;
use crate::rpc::web_rpc::WebRpcInterface;

pub mod controller;
pub mod input;
pub mod pointer;

pub use controller::{GestureController, GestureEvent, GestureKind, PanBasis, TapClaim};
pub use input::{MousePointer, collect_pointer_input};
pub use pointer::{PointerEvent, PointerPhase};

/// A tap the session layer claimed as a placement gesture.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlacementRequest {
    pub screen_position: Vec2,
}

/// Run pointer events through the controller and forward its results.
pub fn process_pointer_events(
    mut pointers: EventReader<PointerEvent>,
    mut controller: ResMut<GestureController>,
    model: Res<ModelState>,
    mut placements: EventWriter<PlacementRequest>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for pointer in pointers.read() {
        let Some(event) = controller.handle_pointer(pointer, &model) else {
            continue;
        };

        match event {
            GestureEvent::Started(kind) => debug!("Gesture started: {:?}", kind),
            GestureEvent::SelectionChanged { selected } => {
                rpc_interface.send_notification(
                    "selection_changed",
                    serde_json::json!({ "selected": selected }),
                );
            }
            GestureEvent::Place { position } => {
                placements.write(PlacementRequest {
                    screen_position: position,
                });
            }
            GestureEvent::DoubleTap => {
                info!("Double tap: model transform reset");
                rpc_interface.send_notification(
                    "selection_changed",
                    serde_json::json!({ "selected": false }),
                );
            }
        }
    }
}

/// Commit this frame's gesture delta. Pan follows the camera plane,
/// expressed relative to the anchor while one is attached.
pub fn commit_gestures(
    mut controller: ResMut<GestureController>,
    mut model: ResMut<ModelState>,
    cameras: Query<&GlobalTransform, With<ArCamera>>,
    target: Res<SyncTargetState>,
    mut snaps: EventWriter<SnapTransform>,
) {
    if !controller.has_pending() {
        return;
    }

    if controller.reset_pending() {
        snaps.write(SnapTransform);
    }
    let basis = cameras.single().map_or_else(
        |_| PanBasis::default(),
        |camera| PanBasis::from_view(camera, target.0.anchor.as_ref()),
    );
    controller.apply_pending(&mut model, basis);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::render::transform_sync::{
        TransformSynchronizer, ViewerModel, sync_model_transform,
    };

    fn pipeline_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<GestureController>()
            .init_resource::<ModelState>()
            .init_resource::<SyncTargetState>()
            .init_resource::<WebRpcInterface>()
            .insert_resource(TransformSynchronizer::new(1.0))
            .add_event::<PointerEvent>()
            .add_event::<PlacementRequest>()
            .add_event::<SnapTransform>()
            .add_systems(
                Update,
                (process_pointer_events, commit_gestures, sync_model_transform).chain(),
            );
        app.world_mut()
            .spawn((ViewerModel, Transform::default(), Visibility::Hidden));
        app
    }

    fn send(app: &mut App, id: u64, phase: PointerPhase, x: f32, y: f32, time: f64) {
        app.world_mut()
            .send_event(PointerEvent::new(id, phase, Vec2::new(x, y), time));
    }

    fn model_transform(app: &mut App) -> (Transform, Visibility) {
        let mut query = app
            .world_mut()
            .query_filtered::<(&Transform, &Visibility), With<ViewerModel>>();
        let (transform, visibility) = query.single(app.world()).unwrap();
        (*transform, *visibility)
    }

    fn pinch_to_double(app: &mut App) {
        send(app, 0, PointerPhase::Down, 100.0, 100.0, 0.0);
        send(app, 1, PointerPhase::Down, 200.0, 100.0, 0.01);
        send(app, 1, PointerPhase::Move, 300.0, 100.0, 0.05);
        app.update();
    }

    #[test]
    fn pinch_reaches_the_rendered_model() {
        let mut app = pipeline_app();
        pinch_to_double(&mut app);

        assert!((app.world().resource::<ModelState>().scale() - 2.0).abs() < 1e-4);
        let (transform, visibility) = model_transform(&mut app);
        assert!((transform.scale - Vec3::splat(2.0)).length() < 1e-4);
        assert_eq!(visibility, Visibility::Inherited);
    }

    #[test]
    fn double_tap_resets_the_rendered_model() {
        let mut app = pipeline_app();
        pinch_to_double(&mut app);

        send(&mut app, 1, PointerPhase::Up, 300.0, 100.0, 0.1);
        send(&mut app, 0, PointerPhase::Up, 100.0, 100.0, 0.12);
        send(&mut app, 2, PointerPhase::Down, 50.0, 50.0, 1.0);
        send(&mut app, 2, PointerPhase::Up, 50.0, 50.0, 1.05);
        send(&mut app, 3, PointerPhase::Down, 52.0, 50.0, 1.1);
        send(&mut app, 3, PointerPhase::Up, 52.0, 50.0, 1.15);
        app.update();

        assert!(!app.world().resource::<GestureController>().selected());
        assert!((app.world().resource::<ModelState>().scale() - 1.0).abs() < 1e-6);
        let (transform, _) = model_transform(&mut app);
        assert!((transform.scale - Vec3::ONE).length() < 1e-6);

        let notifications = app
            .world()
            .resource::<WebRpcInterface>()
            .pending_notifications();
        let selections: Vec<bool> = notifications
            .iter()
            .filter(|n| n.method == "selection_changed")
            .filter_map(|n| n.params["selected"].as_bool())
            .collect();
        assert_eq!(selections, vec![true, false]);
    }
}
