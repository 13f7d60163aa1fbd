use bevy::prelude::*;

use super::backend::{AnchorResolution, HitSample, TrackingBackend};
use super::session::{
    AnchorBinding, AnchorKind, SessionId, SessionMode, TrackingSession, TrackingStatus,
};
use crate::engine::error::{AnchorError, PlacementError, TrackingError};
use crate::engine::spatial::Pose;

/// What the rest of the frame sees of the tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackingFrame {
    pub status: TrackingStatus,
    /// Pose the model is attached to, present while anchored.
    pub anchor_pose: Option<Pose>,
    /// Reticle pose, present while a surface is found and nothing is anchored.
    pub reticle: Option<Pose>,
    /// Debounced surface under the reticle, in any status.
    pub surface_under_reticle: bool,
    /// Bumped on every placement or re-anchor.
    pub anchor_generation: u64,
    /// Device camera pose in the session's reference space.
    pub viewer_pose: Option<Pose>,
}

/// Drives one [`TrackingSession`] per AR visit and owns the anchor pose.
#[derive(Resource)]
pub struct SpatialAnchorEngine {
    backend: Box<dyn TrackingBackend>,
    debounce_frames: u32,
    session: Option<TrackingSession>,
    next_session: u64,
    hit_streak: u32,
    last_hit: Option<Pose>,
    viewer: Option<Pose>,
    frame: TrackingFrame,
}

impl SpatialAnchorEngine {
    pub fn new(backend: Box<dyn TrackingBackend>, debounce_frames: u32) -> Self {
        Self {
            backend,
            debounce_frames: debounce_frames.max(1),
            session: None,
            next_session: 1,
            hit_streak: 0,
            last_hit: None,
            viewer: None,
            frame: TrackingFrame::default(),
        }
    }

    pub fn set_debounce_frames(&mut self, frames: u32) {
        self.debounce_frames = frames.max(1);
    }

    pub fn session(&self) -> Option<&TrackingSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> TrackingStatus {
        self.session
            .as_ref()
            .map_or(TrackingStatus::Idle, |session| session.status)
    }

    pub fn frame(&self) -> &TrackingFrame {
        &self.frame
    }

    /// Start a fresh session, ending any previous one.
    pub fn begin(&mut self, mode: SessionMode) -> SessionId {
        if self.status().is_active() {
            self.end();
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;
        self.session = Some(TrackingSession::new(id, mode));
        self.hit_streak = 0;
        self.last_hit = None;
        self.viewer = None;

        info!("Tracking session {:?} requested ({:?})", id, mode);
        self.backend.request_session(id, mode);
        self.publish();
        id
    }

    /// Advance the session by one frame.
    ///
    /// Returns the error that ended the session during this frame, if any.
    pub fn update(&mut self) -> Option<TrackingError> {
        let status = self.status();
        if !status.is_active() {
            return None;
        }

        if let Some(error) = self.backend.take_termination() {
            self.terminate(&error);
            return Some(error);
        }

        let result = if status == TrackingStatus::RequestingCapability {
            self.await_grant()
        } else {
            self.viewer = self.backend.viewer_pose().filter(Pose::is_finite);
            match self.session.as_ref().map(|session| session.mode) {
                Some(SessionMode::Immersive) => {
                    self.update_immersive();
                    None
                }
                Some(SessionMode::Marker) => {
                    self.update_marker();
                    None
                }
                None => None,
            }
        };

        let next = self.status();
        if next != status {
            debug!("Tracking status {:?} -> {:?}", status, next);
        }
        self.publish();
        result
    }

    /// Anchor the model at the current hit pose.
    ///
    /// While already anchored this re-anchors. The new anchor is created
    /// before the old one is deleted, so a failed move keeps the placement.
    pub fn place(&mut self) -> Result<Pose, PlacementError> {
        let surface_found = self.surface_found();
        let Self {
            backend,
            session,
            last_hit,
            frame,
            ..
        } = self;

        let session = session
            .as_mut()
            .filter(|session| {
                session.mode == SessionMode::Immersive
                    && session.status.is_active()
                    && session.status != TrackingStatus::RequestingCapability
            })
            .ok_or(PlacementError::NotPlaceable)?;
        let pose = last_hit
            .filter(|_| surface_found)
            .ok_or(PlacementError::NoSurface)?;

        let kind = if session.anchors_supported {
            match backend.create_anchor(&pose) {
                Ok(id) => AnchorKind::Platform(id),
                Err(AnchorError::Unsupported) => {
                    info!("Anchors unsupported, locking model to placement pose");
                    session.anchors_supported = false;
                    AnchorKind::PoseLocked
                }
                Err(error) => {
                    warn!("Anchor creation failed: {}", error);
                    return Err(error.into());
                }
            }
        } else {
            AnchorKind::PoseLocked
        };

        if let Some(previous) = session.anchor.replace(AnchorBinding::new(kind, pose)) {
            if let Some(id) = previous.platform_id() {
                backend.delete_anchor(id);
            }
            info!("Re-anchoring model");
        }
        session.status = TrackingStatus::Anchored;
        frame.anchor_generation += 1;
        info!("Model placed at {:?} ({:?})", pose.position, kind);

        self.publish();
        Ok(pose)
    }

    /// Leave AR: cancel the hit test, drop the anchor and end the session.
    pub fn end(&mut self) {
        let Some(session) = self.session.as_mut().filter(|s| s.status.is_active()) else {
            return;
        };

        if let Some(hit_test) = session.hit_test.take() {
            self.backend.cancel_hit_test(hit_test);
        }
        if let Some(id) = session.anchor.take().and_then(|anchor| anchor.platform_id()) {
            self.backend.delete_anchor(id);
        }
        self.backend.end_session();
        session.status = TrackingStatus::Ended;
        info!("Tracking session {:?} ended", session.id);

        self.hit_streak = 0;
        self.last_hit = None;
        self.viewer = None;
        self.publish();
    }

    fn surface_found(&self) -> bool {
        self.hit_streak >= self.debounce_frames
    }

    fn await_grant(&mut self) -> Option<TrackingError> {
        let outcome = self.backend.poll_session()?;
        let session = self.session.as_mut()?;

        match outcome {
            Ok(grant) => {
                session.hit_test = grant.hit_test;
                session.reference_frame = Some(grant.reference_frame);
                session.anchors_supported = grant.anchors_supported;
                session.status = TrackingStatus::Tracking;
                info!(
                    "Tracking session {:?} granted (reference {:?}, anchors {})",
                    session.id, grant.reference_frame, grant.anchors_supported
                );
                None
            }
            Err(error) => {
                warn!("Tracking session {:?} refused: {}", session.id, error);
                session.status = TrackingStatus::Ended;
                Some(error)
            }
        }
    }

    fn update_immersive(&mut self) {
        match self.backend.hit_test() {
            HitSample::NoNewFrame => {}
            HitSample::Hit(pose) if pose.is_finite() => {
                self.hit_streak = self.hit_streak.saturating_add(1);
                self.last_hit = Some(pose);
            }
            HitSample::Hit(_) | HitSample::Miss => {
                self.hit_streak = 0;
                self.last_hit = None;
            }
        }
        let surface_found = self.surface_found();

        let Self {
            backend, session, ..
        } = self;
        let Some(session) = session.as_mut() else {
            return;
        };

        session.status = match session.status {
            TrackingStatus::Tracking | TrackingStatus::SurfaceFound => {
                if surface_found {
                    TrackingStatus::SurfaceFound
                } else {
                    TrackingStatus::Tracking
                }
            }
            TrackingStatus::Anchored | TrackingStatus::Lost => {
                resolve_anchor(session, backend.as_mut(), surface_found)
            }
            other => other,
        };
    }

    fn update_marker(&mut self) {
        let marker = self.backend.marker_pose().filter(Pose::is_finite);
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.status = match (marker, session.anchor.as_mut()) {
            (Some(pose), Some(anchor)) => {
                anchor.pose = pose;
                TrackingStatus::Anchored
            }
            (Some(pose), None) => {
                session.anchor = Some(AnchorBinding::new(AnchorKind::Marker, pose));
                self.frame.anchor_generation += 1;
                info!("Marker found");
                TrackingStatus::Anchored
            }
            (None, Some(_)) => TrackingStatus::Lost,
            (None, None) => TrackingStatus::Tracking,
        };
    }

    fn terminate(&mut self, error: &TrackingError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.status == TrackingStatus::SurfaceFound {
            warn!(
                "Tracking session {:?} terminated before the model was placed: {}",
                session.id, error
            );
        } else {
            info!("Tracking session {:?} terminated: {}", session.id, error);
        }
        session.status = TrackingStatus::Ended;
        session.hit_test = None;
        session.anchor = None;
        self.hit_streak = 0;
        self.last_hit = None;
        self.viewer = None;
        self.publish();
    }

    fn publish(&mut self) {
        let status = self.status();
        let immersive = self
            .session
            .as_ref()
            .is_some_and(|session| session.mode == SessionMode::Immersive);
        let surface = immersive && status.is_active() && self.surface_found();

        self.frame = TrackingFrame {
            status,
            anchor_pose: self
                .session
                .as_ref()
                .filter(|_| status == TrackingStatus::Anchored)
                .and_then(|session| session.anchor)
                .map(|anchor| anchor.pose),
            reticle: self.last_hit.filter(|_| surface && !status.has_anchor()),
            surface_under_reticle: surface,
            anchor_generation: self.frame.anchor_generation,
            viewer_pose: self.viewer.filter(|_| status.is_active()),
        };
    }
}

/// Per-frame anchor resolution for an anchored immersive session.
fn resolve_anchor(
    session: &mut TrackingSession,
    backend: &mut dyn TrackingBackend,
    surface_found: bool,
) -> TrackingStatus {
    let Some(anchor) = session.anchor.as_mut() else {
        return if surface_found {
            TrackingStatus::SurfaceFound
        } else {
            TrackingStatus::Tracking
        };
    };

    let AnchorKind::Platform(id) = anchor.kind else {
        return TrackingStatus::Anchored;
    };

    match backend.resolve_anchor(id) {
        AnchorResolution::Resolved(pose) if pose.is_finite() => {
            anchor.pose = pose;
            anchor.confirmed = true;
            TrackingStatus::Anchored
        }
        AnchorResolution::Resolved(_) => {
            warn!("Ignoring non-finite pose for anchor {:?}", id);
            TrackingStatus::Lost
        }
        AnchorResolution::Pending if !anchor.confirmed => TrackingStatus::Anchored,
        AnchorResolution::Pending | AnchorResolution::Unresolved => TrackingStatus::Lost,
        AnchorResolution::Failed(AnchorError::Unsupported) => {
            info!("Anchors unsupported, locking model to placement pose");
            anchor.kind = AnchorKind::PoseLocked;
            anchor.pose = anchor.placement_pose;
            anchor.confirmed = true;
            session.anchors_supported = false;
            TrackingStatus::Anchored
        }
        AnchorResolution::Failed(error) => {
            warn!("Anchor {:?} failed: {}", id, error);
            session.anchor = None;
            if surface_found {
                TrackingStatus::SurfaceFound
            } else {
                TrackingStatus::Tracking
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::engine::tracking::backend::SessionGrant;
    use crate::engine::tracking::session::{AnchorId, HitTestHandle, ReferenceFrame};

    #[derive(Default)]
    pub(crate) struct Script {
        pub(crate) requested: Vec<(SessionId, SessionMode)>,
        pub(crate) grant: Option<Result<SessionGrant, TrackingError>>,
        pub(crate) hit: Option<Pose>,
        pub(crate) marker: Option<Pose>,
        pub(crate) anchors: HashMap<AnchorId, AnchorResolution>,
        pub(crate) create_error: Option<AnchorError>,
        pub(crate) created: Vec<(AnchorId, Pose)>,
        pub(crate) deleted: Vec<AnchorId>,
        pub(crate) cancelled: Vec<HitTestHandle>,
        pub(crate) ended: u32,
        pub(crate) termination: Option<TrackingError>,
        next_anchor: u64,
    }

    #[derive(Clone, Default)]
    pub(crate) struct ScriptedBackend(pub(crate) Arc<Mutex<Script>>);

    impl ScriptedBackend {
        pub(crate) fn script(&self) -> std::sync::MutexGuard<'_, Script> {
            self.0.lock().unwrap()
        }

        pub(crate) fn grant(&self, anchors_supported: bool) {
            self.script().grant = Some(Ok(SessionGrant {
                hit_test: Some(HitTestHandle(9)),
                reference_frame: ReferenceFrame::LocalFloor,
                anchors_supported,
            }));
        }
    }

    impl TrackingBackend for ScriptedBackend {
        fn request_session(&mut self, session: SessionId, mode: SessionMode) {
            self.script().requested.push((session, mode));
        }

        fn poll_session(&mut self) -> Option<Result<SessionGrant, TrackingError>> {
            self.script().grant.take()
        }

        fn hit_test(&mut self) -> HitSample {
            self.script().hit.map_or(HitSample::Miss, HitSample::Hit)
        }

        fn marker_pose(&mut self) -> Option<Pose> {
            self.script().marker
        }

        fn create_anchor(&mut self, pose: &Pose) -> Result<AnchorId, AnchorError> {
            let mut script = self.script();
            if let Some(error) = script.create_error.clone() {
                return Err(error);
            }
            script.next_anchor += 1;
            let id = AnchorId(script.next_anchor);
            script.created.push((id, *pose));
            Ok(id)
        }

        fn resolve_anchor(&mut self, anchor: AnchorId) -> AnchorResolution {
            self.script()
                .anchors
                .get(&anchor)
                .cloned()
                .unwrap_or(AnchorResolution::Pending)
        }

        fn delete_anchor(&mut self, anchor: AnchorId) {
            self.script().deleted.push(anchor);
        }

        fn cancel_hit_test(&mut self, hit_test: HitTestHandle) {
            self.script().cancelled.push(hit_test);
        }

        fn end_session(&mut self) {
            self.script().ended += 1;
        }

        fn take_termination(&mut self) -> Option<TrackingError> {
            self.script().termination.take()
        }
    }

    fn hit(x: f32) -> Pose {
        Pose::from_translation(Vec3::new(x, 0.0, -1.0))
    }

    fn engine() -> (SpatialAnchorEngine, ScriptedBackend) {
        let backend = ScriptedBackend::default();
        (SpatialAnchorEngine::new(Box::new(backend.clone()), 3), backend)
    }

    /// Engine with a granted immersive session and a found surface.
    fn surface_found(anchors_supported: bool) -> (SpatialAnchorEngine, ScriptedBackend) {
        let (mut engine, backend) = engine();
        engine.begin(SessionMode::Immersive);
        backend.grant(anchors_supported);
        engine.update();
        backend.script().hit = Some(hit(0.0));
        for _ in 0..3 {
            engine.update();
        }
        assert_eq!(engine.status(), TrackingStatus::SurfaceFound);
        (engine, backend)
    }

    #[test]
    fn surface_is_debounced() {
        let (mut engine, backend) = engine();
        engine.begin(SessionMode::Immersive);
        assert_eq!(engine.status(), TrackingStatus::RequestingCapability);

        backend.grant(true);
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Tracking);

        backend.script().hit = Some(hit(0.0));
        engine.update();
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Tracking);
        assert_eq!(engine.frame().reticle, None);
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::SurfaceFound);
        assert_eq!(engine.frame().reticle, Some(hit(0.0)));

        // A miss resets the counter.
        backend.script().hit = None;
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Tracking);
        backend.script().hit = Some(hit(0.0));
        engine.update();
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Tracking);
    }

    #[test]
    fn placement_needs_a_surface() {
        let (mut engine, backend) = engine();
        assert_eq!(engine.place(), Err(PlacementError::NotPlaceable));

        engine.begin(SessionMode::Immersive);
        backend.grant(true);
        engine.update();
        assert_eq!(engine.place(), Err(PlacementError::NoSurface));
        assert!(backend.script().created.is_empty());
    }

    #[test]
    fn unconfirmed_anchor_uses_placement_pose() {
        let (mut engine, backend) = surface_found(true);
        assert_eq!(engine.place(), Ok(hit(0.0)));
        assert_eq!(engine.status(), TrackingStatus::Anchored);

        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.0)));
        assert_eq!(engine.frame().reticle, None);
        assert_eq!(backend.script().created.len(), 1);
    }

    #[test]
    fn lost_anchor_keeps_its_handle() {
        let (mut engine, backend) = surface_found(true);
        engine.place().unwrap();
        let id = backend.script().created[0].0;
        let generation = engine.frame().anchor_generation;

        backend.script().anchors.insert(id, AnchorResolution::Resolved(hit(0.5)));
        engine.update();
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.5)));

        backend.script().anchors.insert(id, AnchorResolution::Unresolved);
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Lost);
        assert_eq!(engine.frame().anchor_pose, None);

        backend.script().anchors.insert(id, AnchorResolution::Resolved(hit(0.7)));
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.7)));

        let binding = engine.session().and_then(|s| s.anchor).unwrap();
        assert_eq!(binding.platform_id(), Some(id));
        assert_eq!(backend.script().created.len(), 1);
        assert!(backend.script().deleted.is_empty());
        assert_eq!(engine.frame().anchor_generation, generation);
    }

    #[test]
    fn reanchoring_replaces_the_anchor() {
        let (mut engine, backend) = surface_found(true);
        engine.place().unwrap();
        let first = backend.script().created[0].0;
        let generation = engine.frame().anchor_generation;

        backend.script().hit = Some(hit(2.0));
        engine.update();
        assert!(engine.frame().surface_under_reticle);
        assert_eq!(engine.place(), Ok(hit(2.0)));

        let script = backend.script();
        assert_eq!(script.deleted, vec![first]);
        assert_eq!(script.created.len(), 2);
        drop(script);
        assert_eq!(engine.frame().anchor_generation, generation + 1);
    }

    #[test]
    fn failed_reanchor_keeps_the_placement() {
        let (mut engine, backend) = surface_found(true);
        engine.place().unwrap();
        let first = backend.script().created[0].0;
        let generation = engine.frame().anchor_generation;

        backend.script().hit = Some(hit(2.0));
        engine.update();
        let refused = AnchorError::Failed("anchor limit reached".to_string());
        backend.script().create_error = Some(refused.clone());
        assert_eq!(engine.place(), Err(PlacementError::Anchor(refused)));

        assert_eq!(engine.status(), TrackingStatus::Anchored);
        let binding = engine.session().and_then(|s| s.anchor).unwrap();
        assert_eq!(binding.platform_id(), Some(first));
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.0)));
        assert_eq!(engine.frame().anchor_generation, generation);
        assert!(backend.script().deleted.is_empty());
    }

    #[test]
    fn missing_anchor_support_locks_the_pose() {
        let (mut engine, backend) = surface_found(false);
        engine.place().unwrap();
        assert!(backend.script().created.is_empty());

        backend.script().hit = Some(hit(3.0));
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.0)));
    }

    #[test]
    fn late_unsupported_report_locks_the_pose() {
        let (mut engine, backend) = surface_found(true);
        engine.place().unwrap();
        let id = backend.script().created[0].0;

        backend
            .script()
            .anchors
            .insert(id, AnchorResolution::Failed(AnchorError::Unsupported));
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(
            engine.session().and_then(|s| s.anchor).map(|a| a.kind),
            Some(AnchorKind::PoseLocked)
        );
        assert_eq!(engine.frame().anchor_pose, Some(hit(0.0)));
    }

    #[test]
    fn synchronous_unsupported_locks_the_pose() {
        let (mut engine, backend) = surface_found(true);
        backend.script().create_error = Some(AnchorError::Unsupported);
        assert_eq!(engine.place(), Ok(hit(0.0)));
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert!(!engine.session().unwrap().anchors_supported);
    }

    #[test]
    fn exit_cancels_hit_test_and_releases_anchor() {
        let (mut engine, backend) = surface_found(true);
        engine.place().unwrap();
        let id = backend.script().created[0].0;
        let first_session = engine.session().unwrap().id;

        engine.end();
        assert_eq!(engine.status(), TrackingStatus::Ended);
        {
            let script = backend.script();
            assert_eq!(script.cancelled, vec![HitTestHandle(9)]);
            assert_eq!(script.deleted, vec![id]);
            assert_eq!(script.ended, 1);
        }

        // Ending twice is a no-op.
        engine.end();
        assert_eq!(backend.script().ended, 1);

        let second_session = engine.begin(SessionMode::Immersive);
        assert_ne!(second_session, first_session);
        let session = engine.session().unwrap();
        assert_eq!(session.anchor, None);
        assert_eq!(session.hit_test, None);
    }

    #[test]
    fn marker_pose_acts_as_anchor() {
        let (mut engine, backend) = engine();
        engine.begin(SessionMode::Marker);
        backend.grant(false);
        engine.update();
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Tracking);
        assert_eq!(engine.place(), Err(PlacementError::NotPlaceable));

        let mut marker = hit(1.0);
        marker.scale = Vec3::splat(0.5);
        backend.script().marker = Some(marker);
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(engine.frame().anchor_pose, Some(marker));

        backend.script().marker = None;
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Lost);

        backend.script().marker = Some(marker);
        engine.update();
        assert_eq!(engine.status(), TrackingStatus::Anchored);
        assert_eq!(engine.frame().anchor_generation, 1);
    }

    #[test]
    fn refused_and_terminated_sessions_end() {
        let (mut engine, backend) = engine();
        engine.begin(SessionMode::Immersive);
        backend.script().grant = Some(Err(TrackingError::PermissionDenied));
        assert_eq!(engine.update(), Some(TrackingError::PermissionDenied));
        assert_eq!(engine.status(), TrackingStatus::Ended);

        let (mut engine, backend) = surface_found(true);
        backend.script().termination = Some(TrackingError::Terminated);
        assert_eq!(engine.update(), Some(TrackingError::Terminated));
        assert_eq!(engine.status(), TrackingStatus::Ended);
        assert_eq!(engine.update(), None);
    }
}
