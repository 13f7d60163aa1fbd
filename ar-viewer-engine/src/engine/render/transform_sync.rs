use bevy::prelude::*;

use crate::engine::capability::Strategy;
use crate::engine::spatial::{ModelState, Pose};

/// Root entity of the displayed model. Its `Transform` is written only by
/// [`sync_model_transform`].
#[derive(Component, Debug, Default)]
pub struct ViewerModel;

/// Snap the next synchronised transform instead of easing into it.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct SnapTransform;

/// Where the model is attached this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncTarget {
    /// Active AR strategy, `None` for the plain 3D preview.
    pub strategy: Option<Strategy>,
    /// Pose the model state is relative to: the tracked anchor, or the
    /// fixed camera offset in fallback mode. Without one the model state is
    /// used as is, except that tracked strategies hide the model.
    pub anchor: Option<Pose>,
    pub anchor_generation: u64,
}

impl SyncTarget {
    pub fn preview() -> Self {
        Self {
            strategy: None,
            anchor: None,
            anchor_generation: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutput {
    Hidden,
    Visible(Transform),
}

/// Anchor pose composed with the user transform.
///
/// The model lives in the anchor's space: its offset is rotated and scaled by
/// the anchor, rotations multiply and scales multiply.
pub fn compose(anchor: &Pose, model: &ModelState) -> Transform {
    let scale = anchor.scale * model.scale();
    Transform {
        translation: anchor.position + anchor.orientation * (anchor.scale * model.position),
        rotation: (anchor.orientation * model.rotation()).normalize(),
        scale,
    }
}

fn is_finite(transform: &Transform) -> bool {
    transform.translation.is_finite()
        && transform.rotation.is_finite()
        && transform.scale.is_finite()
}

/// Combines anchor pose and model state into the rendered transform.
#[derive(Resource, Debug, Clone)]
pub struct TransformSynchronizer {
    easing: f32,
    current: Option<Transform>,
    strategy: Option<Strategy>,
    anchor_generation: u64,
    snap_requested: bool,
}

impl Default for TransformSynchronizer {
    fn default() -> Self {
        Self::new(constants::render_settings::TRANSFORM_EASING)
    }
}

impl TransformSynchronizer {
    /// `easing` is the fraction of the remaining distance covered per
    /// frame; 1.0 disables smoothing.
    pub fn new(easing: f32) -> Self {
        Self {
            easing: sanitize_easing(easing),
            current: None,
            strategy: None,
            anchor_generation: 0,
            snap_requested: false,
        }
    }

    pub fn set_easing(&mut self, easing: f32) {
        self.easing = sanitize_easing(easing);
    }

    pub fn request_snap(&mut self) {
        self.snap_requested = true;
    }

    pub fn current(&self) -> Option<Transform> {
        self.current
    }

    /// Compute this frame's model transform.
    pub fn step(&mut self, target: &SyncTarget, model: &ModelState) -> SyncOutput {
        let tracked = target.strategy.is_some_and(|strategy| strategy.is_tracked());
        let desired = match target.anchor {
            Some(anchor) => compose(&anchor, model),
            None if tracked => return SyncOutput::Hidden,
            None => model.to_transform(),
        };

        if !is_finite(&desired) {
            warn!("Rejected non-finite model transform {:?}", desired);
            return self.current.map_or(SyncOutput::Hidden, SyncOutput::Visible);
        }

        let snap = self.snap_requested
            || target.strategy != self.strategy
            || (tracked && target.anchor_generation != self.anchor_generation);
        self.snap_requested = false;
        self.strategy = target.strategy;
        self.anchor_generation = target.anchor_generation;

        let next = match self.current {
            Some(current) if !snap => ease(&current, &desired, self.easing),
            _ => desired,
        };
        self.current = Some(next);
        SyncOutput::Visible(next)
    }
}

fn sanitize_easing(easing: f32) -> f32 {
    if easing.is_finite() && easing > 0.0 {
        easing.min(1.0)
    } else {
        1.0
    }
}

fn ease(from: &Transform, to: &Transform, t: f32) -> Transform {
    Transform {
        translation: from.translation.lerp(to.translation, t),
        rotation: from.rotation.slerp(to.rotation, t),
        scale: from.scale.lerp(to.scale, t),
    }
}

/// Write the synchronised transform and visibility of the model root.
pub fn sync_model_transform(
    mut synchronizer: ResMut<TransformSynchronizer>,
    mut snaps: EventReader<SnapTransform>,
    target: Res<SyncTargetState>,
    model: Res<ModelState>,
    mut roots: Query<(&mut Transform, &mut Visibility), With<ViewerModel>>,
) {
    if snaps.read().count() > 0 {
        synchronizer.request_snap();
    }

    let output = synchronizer.step(&target.0, &model);
    for (mut transform, mut visibility) in &mut roots {
        match output {
            SyncOutput::Hidden => *visibility = Visibility::Hidden,
            SyncOutput::Visible(next) => {
                *transform = next;
                *visibility = Visibility::Inherited;
            }
        }
    }
}

/// This frame's [`SyncTarget`], published by the mode manager.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SyncTargetState(pub SyncTarget);

impl Default for SyncTargetState {
    fn default() -> Self {
        Self(SyncTarget::preview())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spatial::ScaleLimits;
    use std::f32::consts::FRAC_PI_2;

    fn anchored(anchor: Pose, generation: u64) -> SyncTarget {
        SyncTarget {
            strategy: Some(Strategy::ImmersiveTracking),
            anchor: Some(anchor),
            anchor_generation: generation,
        }
    }

    fn model_at(position: Vec3, scale: f32) -> ModelState {
        let mut model = ModelState::new(Vec3::ZERO, 1.0, ScaleLimits::default());
        model.translate(position);
        model.set_scale(scale);
        model
    }

    #[test]
    fn composition_is_multiplicative() {
        let mut anchor = Pose::new(Vec3::new(1.0, 0.0, -2.0), Quat::from_rotation_y(FRAC_PI_2));
        anchor.scale = Vec3::splat(2.0);
        let mut model = model_at(Vec3::new(0.5, 0.0, 0.0), 1.5);
        model.rotate_yaw(FRAC_PI_2);

        let composed = compose(&anchor, &model);
        assert!(composed.translation.abs_diff_eq(Vec3::new(1.0, 0.0, -3.0), 1e-5));
        assert!(composed.scale.abs_diff_eq(Vec3::splat(3.0), 1e-5));
        // Two quarter turns about Y face the model backwards.
        assert!((composed.rotation * Vec3::X).abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn preview_applies_model_state_directly() {
        let mut sync = TransformSynchronizer::new(0.5);
        let model = model_at(Vec3::new(0.0, 0.2, 0.0), 2.0);
        assert_eq!(
            sync.step(&SyncTarget::preview(), &model),
            SyncOutput::Visible(model.to_transform())
        );
    }

    #[test]
    fn fallback_offsets_the_model_in_front_of_the_camera() {
        let mut sync = TransformSynchronizer::new(0.5);
        let model = model_at(Vec3::new(0.1, 0.0, 0.0), 1.0);
        let target = SyncTarget {
            strategy: Some(Strategy::FallbackCamera),
            anchor: Some(Pose::from_translation(Vec3::new(0.0, 0.0, -1.5))),
            anchor_generation: 0,
        };
        let SyncOutput::Visible(next) = sync.step(&target, &model) else {
            panic!("model should be visible");
        };
        assert!(next.translation.abs_diff_eq(Vec3::new(0.1, 0.0, -1.5), 1e-6));
    }

    #[test]
    fn tracked_without_anchor_is_hidden() {
        let mut sync = TransformSynchronizer::default();
        let target = SyncTarget {
            strategy: Some(Strategy::MarkerTracking),
            anchor: None,
            anchor_generation: 0,
        };
        assert_eq!(sync.step(&target, &ModelState::default()), SyncOutput::Hidden);
    }

    #[test]
    fn first_frame_snaps_then_eases() {
        let mut sync = TransformSynchronizer::new(0.5);
        let anchor = Pose::from_translation(Vec3::ZERO);
        let mut model = model_at(Vec3::ZERO, 1.0);

        assert_eq!(
            sync.step(&anchored(anchor, 1), &model),
            SyncOutput::Visible(Transform::IDENTITY)
        );

        model.translate(Vec3::X);
        let SyncOutput::Visible(eased) = sync.step(&anchored(anchor, 1), &model) else {
            panic!("model should be visible");
        };
        assert!(eased.translation.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn reanchor_and_reset_snap() {
        let mut sync = TransformSynchronizer::new(0.1);
        let model = model_at(Vec3::ZERO, 1.0);
        sync.step(&anchored(Pose::from_translation(Vec3::ZERO), 1), &model);

        let moved = Pose::from_translation(Vec3::new(0.0, 0.0, -4.0));
        let SyncOutput::Visible(next) = sync.step(&anchored(moved, 2), &model) else {
            panic!("model should be visible");
        };
        assert_eq!(next.translation, moved.position);

        let elsewhere = Pose::from_translation(Vec3::new(3.0, 0.0, 0.0));
        sync.request_snap();
        let SyncOutput::Visible(next) = sync.step(&anchored(elsewhere, 2), &model) else {
            panic!("model should be visible");
        };
        assert_eq!(next.translation, elsewhere.position);
    }

    #[test]
    fn strategy_change_snaps() {
        let mut sync = TransformSynchronizer::new(0.1);
        let model = model_at(Vec3::new(0.0, 0.0, -1.5), 1.0);
        sync.step(&SyncTarget::preview(), &model);

        let anchor = Pose::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let SyncOutput::Visible(next) = sync.step(&anchored(anchor, 0), &model) else {
            panic!("model should be visible");
        };
        assert_eq!(next, compose(&anchor, &model));
    }

    #[test]
    fn non_finite_targets_keep_the_previous_transform() {
        let mut sync = TransformSynchronizer::new(1.0);
        let model = model_at(Vec3::ZERO, 1.0);
        let good = sync.step(&anchored(Pose::IDENTITY, 1), &model);

        let broken = Pose::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(sync.step(&anchored(broken, 1), &model), good);
    }
}
