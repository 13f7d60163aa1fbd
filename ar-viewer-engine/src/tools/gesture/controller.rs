use bevy::prelude::*;

use super::pointer::{PointerEvent, PointerPhase, span};
use crate::engine::assets::viewer_config::GestureConfig;
use crate::engine::spatial::{ModelState, Pose};
use crate::engine::spatial::model_state::wrap_angle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Pan,
    Pinch,
    Rotate,
    Tap,
    DoubleTap,
}

/// Result of one pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// A continuous gesture crossed its threshold.
    Started(GestureKind),
    /// A tap toggled selection.
    SelectionChanged { selected: bool },
    /// A tap claimed as a placement gesture.
    Place { position: Vec2 },
    /// Double tap: transform reset and selection cleared.
    DoubleTap,
}

/// Which taps the session layer takes as placement gestures.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum TapClaim {
    #[default]
    None,
    All,
    /// Taps outside the model's screen rectangle.
    Outside(Rect),
}

impl TapClaim {
    pub fn claims(&self, position: Vec2) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Outside(rect) => !rect.contains(position),
        }
    }
}

/// Model-parent-space directions for one screen pixel of pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanBasis {
    pub right: Vec3,
    pub up: Vec3,
}

impl PanBasis {
    /// Camera right and up expressed in the space of `parent`, or in world
    /// space when the model has no parent pose.
    pub fn from_view(camera: &GlobalTransform, parent: Option<&Pose>) -> Self {
        let right = camera.right().as_vec3();
        let up = camera.up().as_vec3();
        let Some(parent) = parent else {
            return Self { right, up };
        };
        let inverse = parent.orientation.inverse();
        let scale = parent.scale.max(Vec3::splat(f32::EPSILON));
        Self {
            right: inverse * right / scale,
            up: inverse * up / scale,
        }
    }
}

impl Default for PanBasis {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            up: Vec3::Y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TrackedPointer {
    id: u64,
    start: Vec2,
    current: Vec2,
}

/// The single in-flight gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    pointers: Vec<TrackedPointer>,
    started_at: f64,
    start_pointers: usize,
    max_pointers: usize,
    pan: bool,
    pinch: bool,
    rotate: bool,
    last_pan: Vec2,
    start_distance: f32,
    start_angle: f32,
    last_angle: f32,
    scale_at_start: f32,
    current_delta: Vec2,
}

impl GestureSession {
    fn new(pointer: TrackedPointer, time: f64) -> Self {
        Self {
            pointers: vec![pointer],
            started_at: time,
            start_pointers: 1,
            max_pointers: 1,
            pan: false,
            pinch: false,
            rotate: false,
            last_pan: pointer.current,
            start_distance: 0.0,
            start_angle: 0.0,
            last_angle: 0.0,
            scale_at_start: 1.0,
            current_delta: Vec2::ZERO,
        }
    }

    /// The dominant recognised gesture, if any.
    pub fn kind(&self) -> Option<GestureKind> {
        if self.pinch {
            Some(GestureKind::Pinch)
        } else if self.rotate {
            Some(GestureKind::Rotate)
        } else if self.pan {
            Some(GestureKind::Pan)
        } else {
            None
        }
    }

    pub fn is_active(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.pan,
            GestureKind::Pinch => self.pinch,
            GestureKind::Rotate => self.rotate,
            GestureKind::Tap | GestureKind::DoubleTap => false,
        }
    }

    pub fn start_pointers(&self) -> usize {
        self.start_pointers
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Pixel offset of the primary pointer from where it went down.
    pub fn current_delta(&self) -> Vec2 {
        self.current_delta
    }

    fn pointer_mut(&mut self, id: u64) -> Option<&mut TrackedPointer> {
        self.pointers.iter_mut().find(|p| p.id == id)
    }

    fn begin_two_pointer(&mut self, scale: f32) {
        self.pan = false;
        self.max_pointers = 2;
        if let [a, b] = self.pointers.as_slice() {
            let (distance, angle) = span(a.current, b.current);
            self.start_distance = distance;
            self.start_angle = angle;
            self.last_angle = angle;
        }
        self.scale_at_start = scale;
    }
}

/// Accumulated between frames, committed by [`GestureController::apply_pending`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct PendingDelta {
    reset: bool,
    pan_pixels: Vec2,
    yaw: f32,
    scale: Option<f32>,
}

impl PendingDelta {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy)]
struct LastTap {
    position: Vec2,
    time: f64,
}

/// Turns pointer events into model transform changes.
///
/// The only writer of [`ModelState`]: gestures accumulate a pending delta
/// that is committed once per frame.
#[derive(Resource, Debug, Clone)]
pub struct GestureController {
    config: GestureConfig,
    allow_interaction: bool,
    selected: bool,
    tap_claim: TapClaim,
    session: Option<GestureSession>,
    /// Pointers that are down but take no part in any gesture.
    ignored: Vec<u64>,
    last_tap: Option<LastTap>,
    pending: PendingDelta,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            allow_interaction: true,
            selected: false,
            tap_claim: TapClaim::None,
            session: None,
            ignored: Vec::new(),
            last_tap: None,
            pending: PendingDelta::default(),
        }
    }

    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn allow_interaction(&self) -> bool {
        self.allow_interaction
    }

    /// Disabling interaction cancels any gesture in progress.
    pub fn set_allow_interaction(&mut self, allow: bool) {
        if self.allow_interaction && !allow {
            self.cancel();
        }
        self.allow_interaction = allow;
    }

    pub fn set_tap_claim(&mut self, claim: TapClaim) {
        self.tap_claim = claim;
    }

    /// Clear the selection. Returns whether it changed.
    pub fn unselect(&mut self) -> bool {
        std::mem::replace(&mut self.selected, false)
    }

    /// Schedule a reset to the initial transform. Deltas accumulated
    /// earlier in the frame are dropped.
    pub fn request_reset(&mut self) {
        self.pending = PendingDelta {
            reset: true,
            ..default()
        };
    }

    /// Drop the gesture and its pending delta. The model state is untouched.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            self.ignored
                .extend(session.pointers.iter().map(|pointer| pointer.id));
        }
        self.pending = PendingDelta::default();
        self.last_tap = None;
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Whether the next commit restores the initial transform.
    pub fn reset_pending(&self) -> bool {
        self.pending.reset
    }

    /// Feed one pointer event through the gesture state machine.
    pub fn handle_pointer(&mut self, event: &PointerEvent, model: &ModelState) -> Option<GestureEvent> {
        if !self.allow_interaction || self.ignored.contains(&event.id) {
            if matches!(event.phase, PointerPhase::Up | PointerPhase::Cancel) {
                self.ignored.retain(|id| *id != event.id);
            }
            return None;
        }

        match event.phase {
            PointerPhase::Down => self.pointer_down(event, model),
            PointerPhase::Move => self.pointer_move(event),
            PointerPhase::Up => self.pointer_up(event),
            PointerPhase::Cancel => {
                let in_session = self
                    .session
                    .as_ref()
                    .is_some_and(|session| session.pointers.iter().any(|p| p.id == event.id));
                if in_session {
                    self.cancel();
                    self.ignored.retain(|id| *id != event.id);
                }
                None
            }
        }
    }

    /// Commit the accumulated delta to the model. Returns whether anything changed.
    pub fn apply_pending(&mut self, model: &mut ModelState, basis: PanBasis) -> bool {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return false;
        }

        if pending.reset {
            model.reset();
        }
        if pending.pan_pixels != Vec2::ZERO {
            let metres = pending.pan_pixels * self.config.pan_sensitivity;
            // Screen y grows downwards.
            model.translate(basis.right * metres.x - basis.up * metres.y);
        }
        if pending.yaw != 0.0 {
            model.rotate_yaw(pending.yaw);
        }
        if let Some(scale) = pending.scale {
            model.set_scale(scale);
        }
        true
    }

    fn pointer_down(&mut self, event: &PointerEvent, model: &ModelState) -> Option<GestureEvent> {
        let pointer = TrackedPointer {
            id: event.id,
            start: event.position,
            current: event.position,
        };

        let Some(session) = self.session.as_mut() else {
            if !self.ignored.is_empty() {
                self.ignored.push(event.id);
                return None;
            }
            self.session = Some(GestureSession::new(pointer, event.time));
            return None;
        };

        if session.pointers.len() >= 2 {
            self.ignored.push(event.id);
            return None;
        }

        session.pointers.push(pointer);
        session.begin_two_pointer(model.scale());
        None
    }

    fn pointer_move(&mut self, event: &PointerEvent) -> Option<GestureEvent> {
        let config = &self.config;
        let selected = self.selected;
        let session = self.session.as_mut()?;
        let pointer = session.pointer_mut(event.id)?;
        pointer.current = event.position;
        let start = pointer.start;

        if session.pointers.len() == 1 {
            session.current_delta = event.position - start;
            if session.max_pointers > 1 || !selected {
                return None;
            }

            if !session.pan {
                if session.current_delta.length() <= config.pan_min_distance {
                    return None;
                }
                session.pan = true;
                session.last_pan = event.position;
                return Some(GestureEvent::Started(GestureKind::Pan));
            }

            self.pending.pan_pixels += event.position - session.last_pan;
            session.last_pan = event.position;
            return None;
        }

        let [a, b] = session.pointers.as_slice() else {
            return None;
        };
        let (distance, angle) = span(a.current, b.current);
        session.current_delta = a.current - a.start;
        let mut started = None;

        if !session.pinch
            && session.start_distance > f32::EPSILON
            && (distance - session.start_distance).abs() > config.pinch_threshold
        {
            session.pinch = true;
            started = Some(GestureEvent::Started(GestureKind::Pinch));
        }
        if session.pinch && session.start_distance > f32::EPSILON {
            let ratio = distance / session.start_distance;
            self.pending.scale = Some(config_scale(config, ratio * session.scale_at_start));
        }

        if !session.rotate && wrap_angle(angle - session.start_angle).abs() > config.rotate_threshold {
            session.rotate = true;
            session.last_angle = session.start_angle;
            started = started.or(Some(GestureEvent::Started(GestureKind::Rotate)));
        }
        if session.rotate {
            let step = wrap_angle(angle - session.last_angle);
            // Clockwise on screen turns the model clockwise seen from above.
            self.pending.yaw -= step * config.rotate_damping;
            session.last_angle = angle;
        }

        started
    }

    fn pointer_up(&mut self, event: &PointerEvent) -> Option<GestureEvent> {
        let session = self.session.as_ref()?;
        let pointer = *session.pointers.iter().find(|p| p.id == event.id)?;

        if session.pointers.len() > 1 {
            // Lifting one of two pointers ends the session; the other
            // pointer is ignored until it lifts too.
            self.ignored.extend(
                session
                    .pointers
                    .iter()
                    .filter(|p| p.id != event.id)
                    .map(|p| p.id),
            );
            self.session = None;
            return None;
        }

        let is_tap = session.max_pointers == 1
            && !session.pan
            && event.time - session.started_at <= self.config.tap_max_secs
            && event.position.distance(pointer.start) <= self.config.tap_max_distance;
        self.session = None;

        if !is_tap {
            return None;
        }
        self.on_tap(event.position, event.time)
    }

    fn on_tap(&mut self, position: Vec2, time: f64) -> Option<GestureEvent> {
        let double = self.last_tap.is_some_and(|last| {
            time - last.time <= self.config.double_tap_secs
                && position.distance(last.position) <= self.config.double_tap_radius
        });

        if double {
            self.last_tap = None;
            self.selected = false;
            self.request_reset();
            return Some(GestureEvent::DoubleTap);
        }

        // A placement still opens the double-tap window, so a quick second
        // tap resets instead of placing again.
        if self.tap_claim.claims(position) {
            self.last_tap = Some(LastTap { position, time });
            return Some(GestureEvent::Place { position });
        }

        self.last_tap = Some(LastTap { position, time });
        self.selected = !self.selected;
        Some(GestureEvent::SelectionChanged {
            selected: self.selected,
        })
    }
}

fn config_scale(config: &GestureConfig, scale: f32) -> f32 {
    config.scale_limits().unwrap_or_default().clamp(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::spatial::ScaleLimits;
    use proptest::prelude::*;

    fn ev(id: u64, phase: PointerPhase, x: f32, y: f32, time: f64) -> PointerEvent {
        PointerEvent::new(id, phase, Vec2::new(x, y), time)
    }

    fn model() -> ModelState {
        ModelState::new(Vec3::new(0.0, 0.0, -1.5), 1.0, ScaleLimits::default())
    }

    fn tap(
        controller: &mut GestureController,
        model: &ModelState,
        x: f32,
        time: f64,
    ) -> Option<GestureEvent> {
        controller.handle_pointer(&ev(1, PointerPhase::Down, x, 100.0, time), model);
        controller.handle_pointer(&ev(1, PointerPhase::Up, x, 100.0, time + 0.1), model)
    }

    /// Two pointers 100 px apart on a horizontal line.
    fn two_pointers(controller: &mut GestureController, model: &ModelState) {
        controller.handle_pointer(&ev(1, PointerPhase::Down, 100.0, 100.0, 0.0), model);
        controller.handle_pointer(&ev(2, PointerPhase::Down, 200.0, 100.0, 0.0), model);
    }

    #[test]
    fn tap_toggles_selection() {
        let mut controller = GestureController::default();
        let model = model();

        assert_eq!(
            tap(&mut controller, &model, 100.0, 0.0),
            Some(GestureEvent::SelectionChanged { selected: true })
        );
        assert_eq!(
            tap(&mut controller, &model, 100.0, 1.0),
            Some(GestureEvent::SelectionChanged { selected: false })
        );
        assert!(controller.session().is_none());
    }

    #[test]
    fn slow_or_moving_press_is_not_a_tap() {
        let mut controller = GestureController::default();
        let model = model();

        controller.handle_pointer(&ev(1, PointerPhase::Down, 0.0, 0.0, 0.0), &model);
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Up, 0.0, 0.0, 0.5), &model),
            None
        );

        controller.handle_pointer(&ev(1, PointerPhase::Down, 0.0, 0.0, 1.0), &model);
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Up, 30.0, 0.0, 1.1), &model),
            None
        );
        assert!(!controller.selected());
    }

    #[test]
    fn double_tap_resets_and_unselects() {
        let mut controller = GestureController::default();
        let mut model = model();
        model.translate(Vec3::X);
        model.set_scale(2.0);

        tap(&mut controller, &model, 100.0, 0.0);
        assert!(controller.selected());
        assert_eq!(
            tap(&mut controller, &model, 110.0, 0.25),
            Some(GestureEvent::DoubleTap)
        );
        assert!(!controller.selected());

        assert!(controller.apply_pending(&mut model, PanBasis::default()));
        assert!(model.is_initial());
    }

    #[test]
    fn distant_second_tap_is_a_single_tap() {
        let mut controller = GestureController::default();
        let model = model();
        tap(&mut controller, &model, 100.0, 0.0);
        assert_eq!(
            tap(&mut controller, &model, 300.0, 0.2),
            Some(GestureEvent::SelectionChanged { selected: false })
        );
    }

    #[test]
    fn claimed_taps_become_placements() {
        let mut controller = GestureController::default();
        let model = model();
        let rect = Rect::new(50.0, 50.0, 150.0, 150.0);
        controller.set_tap_claim(TapClaim::Outside(rect));

        assert_eq!(
            tap(&mut controller, &model, 100.0, 0.0),
            Some(GestureEvent::SelectionChanged { selected: true })
        );
        assert_eq!(
            tap(&mut controller, &model, 400.0, 1.0),
            Some(GestureEvent::Place {
                position: Vec2::new(400.0, 100.0)
            })
        );
        assert!(controller.selected());

        controller.set_tap_claim(TapClaim::All);
        assert!(matches!(
            tap(&mut controller, &model, 100.0, 2.0),
            Some(GestureEvent::Place { .. })
        ));
    }

    #[test]
    fn double_tap_resets_while_taps_are_claimed() {
        let mut controller = GestureController::default();
        let mut model = model();
        model.set_scale(2.0);
        controller.set_tap_claim(TapClaim::All);

        assert!(matches!(
            tap(&mut controller, &model, 100.0, 0.0),
            Some(GestureEvent::Place { .. })
        ));
        assert_eq!(
            tap(&mut controller, &model, 105.0, 0.25),
            Some(GestureEvent::DoubleTap)
        );
        assert!(controller.reset_pending());
        assert!(controller.apply_pending(&mut model, PanBasis::default()));
        assert!(model.is_initial());

        // The window is consumed: a third tap places again.
        assert!(matches!(
            tap(&mut controller, &model, 105.0, 0.5),
            Some(GestureEvent::Place { .. })
        ));
    }

    #[test]
    fn pan_needs_selection_and_distance() {
        let mut controller = GestureController::default();
        let mut model = model();
        let start = model.position;

        controller.handle_pointer(&ev(1, PointerPhase::Down, 0.0, 0.0, 0.0), &model);
        controller.handle_pointer(&ev(1, PointerPhase::Move, 100.0, 0.0, 0.1), &model);
        controller.handle_pointer(&ev(1, PointerPhase::Up, 100.0, 0.0, 0.2), &model);
        assert!(!controller.apply_pending(&mut model, PanBasis::default()));

        tap(&mut controller, &model, 0.0, 1.0);
        controller.handle_pointer(&ev(1, PointerPhase::Down, 0.0, 0.0, 2.0), &model);
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Move, 5.0, 0.0, 2.1), &model),
            None
        );
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Move, 20.0, 0.0, 2.2), &model),
            Some(GestureEvent::Started(GestureKind::Pan))
        );
        controller.handle_pointer(&ev(1, PointerPhase::Move, 120.0, -50.0, 2.3), &model);
        controller.apply_pending(&mut model, PanBasis::default());

        let moved = model.position - start;
        assert!((moved.x - 0.2).abs() < 1e-5);
        assert!((moved.y - 0.1).abs() < 1e-5);
        assert_eq!(moved.z, 0.0);
    }

    #[test]
    fn pinch_ratio_two_doubles_scale_within_limits() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);

        assert_eq!(
            controller.handle_pointer(&ev(2, PointerPhase::Move, 300.0, 100.0, 0.1), &model),
            Some(GestureEvent::Started(GestureKind::Pinch))
        );
        controller.apply_pending(&mut model, PanBasis::default());
        assert!((model.scale() - 2.0).abs() < 1e-5);

        let mut config = GestureConfig::default();
        config.max_scale = 1.5;
        let limits = config.scale_limits().unwrap();
        let mut controller = GestureController::new(config);
        let mut model = ModelState::new(Vec3::ZERO, 1.0, limits);
        two_pointers(&mut controller, &model);
        controller.handle_pointer(&ev(2, PointerPhase::Move, 300.0, 100.0, 0.1), &model);
        controller.apply_pending(&mut model, PanBasis::default());
        assert_eq!(model.scale(), 1.5);
    }

    #[test]
    fn rotate_is_damped_yaw() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);

        // Second pointer swings a quarter turn clockwise around the first.
        let event = controller.handle_pointer(&ev(2, PointerPhase::Move, 100.0, 200.0, 0.1), &model);
        assert_eq!(event, Some(GestureEvent::Started(GestureKind::Rotate)));
        controller.apply_pending(&mut model, PanBasis::default());
        assert!((model.rotation_euler.y + std::f32::consts::FRAC_PI_4).abs() < 1e-5);
        assert_eq!(model.scale(), 1.0);
    }

    #[test]
    fn pinch_and_rotate_share_a_session() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);
        controller.handle_pointer(&ev(2, PointerPhase::Move, 100.0, 300.0, 0.1), &model);

        let session = controller.session().unwrap();
        assert!(session.is_active(GestureKind::Pinch));
        assert!(session.is_active(GestureKind::Rotate));
        assert_eq!(session.start_pointers(), 1);

        controller.apply_pending(&mut model, PanBasis::default());
        assert!((model.scale() - 2.0).abs() < 1e-5);
        assert!(model.rotation_euler.y < 0.0);
    }

    #[test]
    fn lifting_one_of_two_pointers_ends_the_session() {
        let mut controller = GestureController::default();
        let mut model = model();
        tap(&mut controller, &model, 500.0, 0.0);
        two_pointers(&mut controller, &model);

        controller.handle_pointer(&ev(2, PointerPhase::Up, 200.0, 100.0, 1.0), &model);
        assert!(controller.session().is_none());

        // The remaining pointer does not start a pan.
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Move, 300.0, 100.0, 1.1), &model),
            None
        );
        assert_eq!(
            controller.handle_pointer(&ev(1, PointerPhase::Up, 300.0, 100.0, 1.2), &model),
            None
        );
        assert!(!controller.apply_pending(&mut model, PanBasis::default()));

        // Afterwards new gestures work again.
        assert!(tap(&mut controller, &model, 0.0, 5.0).is_some());
    }

    #[test]
    fn third_pointer_is_ignored() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);
        controller.handle_pointer(&ev(3, PointerPhase::Down, 500.0, 500.0, 0.0), &model);
        controller.handle_pointer(&ev(3, PointerPhase::Move, 900.0, 900.0, 0.1), &model);
        assert_eq!(controller.session().unwrap().pointer_count(), 2);
        assert!(!controller.apply_pending(&mut model, PanBasis::default()));
    }

    #[test]
    fn cancel_drops_pending_without_touching_the_model() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);
        controller.handle_pointer(&ev(2, PointerPhase::Move, 400.0, 100.0, 0.1), &model);
        assert!(controller.has_pending());

        let before = model;
        controller.cancel();
        assert!(controller.session().is_none());
        assert!(!controller.apply_pending(&mut model, PanBasis::default()));
        assert_eq!(model, before);
    }

    #[test]
    fn reset_drops_earlier_deltas() {
        let mut controller = GestureController::default();
        let mut model = model();
        two_pointers(&mut controller, &model);
        controller.handle_pointer(&ev(2, PointerPhase::Move, 400.0, 100.0, 0.1), &model);
        controller.request_reset();
        controller.apply_pending(&mut model, PanBasis::default());
        assert!(model.is_initial());
    }

    #[test]
    fn disabled_interaction_ignores_input() {
        let mut controller = GestureController::default();
        let model = model();
        controller.set_allow_interaction(false);
        assert_eq!(tap(&mut controller, &model, 0.0, 0.0), None);
        assert!(!controller.selected());

        controller.set_allow_interaction(true);
        assert!(tap(&mut controller, &model, 0.0, 1.0).is_some());
        assert!(controller.unselect());
        assert!(!controller.unselect());
    }

    #[test]
    fn pan_basis_follows_the_anchor() {
        let camera = GlobalTransform::IDENTITY;
        assert_eq!(PanBasis::from_view(&camera, None), PanBasis::default());

        let mut anchor = Pose::new(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        anchor.scale = Vec3::splat(2.0);
        let basis = PanBasis::from_view(&camera, Some(&anchor));
        assert!(basis.right.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-5));
        assert!(basis.up.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-5));
    }

    proptest! {
        #[test]
        fn pinch_scale_stays_within_limits(
            distances in prop::collection::vec(0.0f32..5000.0, 1..40),
            commit_every in 1usize..5,
        ) {
            let mut controller = GestureController::default();
            let mut model = model();
            let limits = model.limits();
            two_pointers(&mut controller, &model);

            for (i, distance) in distances.iter().enumerate() {
                let event = ev(2, PointerPhase::Move, 100.0 + distance, 100.0, 0.01 * i as f64);
                controller.handle_pointer(&event, &model);
                if i % commit_every == 0 {
                    controller.apply_pending(&mut model, PanBasis::default());
                }
                prop_assert!(model.scale() >= limits.min());
                prop_assert!(model.scale() <= limits.max());
            }
            controller.apply_pending(&mut model, PanBasis::default());
            prop_assert!(model.scale() >= limits.min() && model.scale() <= limits.max());
        }
    }
}
