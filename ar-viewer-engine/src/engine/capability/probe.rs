use bevy::prelude::*;

use super::Strategy;
use super::query::{CapabilityQuery, QueryResult, platform_query};
use crate::engine::assets::viewer_config::TrackingConfig;
use crate::engine::core::async_slot::AsyncSlot;
use crate::engine::error::CapabilityError;

struct PendingQuery {
    slot: AsyncSlot<QueryResult>,
    started_at: f64,
}

/// Decides the AR strategy.
///
/// A definitive platform answer and a strategy chosen by degradation are
/// kept for the rest of the page's lifetime. Timeouts and failed queries
/// only decide the current visit; the next one asks again.
#[derive(Resource)]
pub struct CapabilityProbe {
    query: Box<dyn CapabilityQuery>,
    timeout_secs: f64,
    marker_tracking: bool,
    pending: Option<PendingQuery>,
    decided: Option<Strategy>,
}

impl Default for CapabilityProbe {
    fn default() -> Self {
        Self::new(platform_query(), &TrackingConfig::default())
    }
}

impl CapabilityProbe {
    pub fn new(query: Box<dyn CapabilityQuery>, config: &TrackingConfig) -> Self {
        Self {
            query,
            timeout_secs: config.capability_timeout_secs,
            marker_tracking: config.marker_tracking,
            pending: None,
            decided: None,
        }
    }

    /// Apply reloaded configuration. A decision already made is kept.
    pub fn configure(&mut self, config: &TrackingConfig) {
        self.timeout_secs = config.capability_timeout_secs;
        self.marker_tracking = config.marker_tracking;
    }

    /// Launch the platform query unless one is running or a strategy is known.
    pub fn start(&mut self, now: f64) {
        if self.pending.is_some() || self.decided.is_some() {
            return;
        }
        debug!("Querying immersive AR support");
        self.pending = Some(PendingQuery {
            slot: self.query.immersive_supported(),
            started_at: now,
        });
    }

    /// Check the running query; call once per frame.
    pub fn poll(&mut self, now: f64) -> Option<Strategy> {
        if self.decided.is_some() {
            return self.decided;
        }
        let pending = self.pending.as_ref()?;

        let result = match pending.slot.take() {
            Some(result) => result,
            None if now - pending.started_at >= self.timeout_secs => {
                Err(CapabilityError::TimedOut(self.timeout_secs))
            }
            None => return None,
        };

        // Dropping the slot discards a late answer.
        self.pending = None;
        let definitive = result.is_ok();
        let strategy = self.resolve(result);
        if definitive {
            self.decided = Some(strategy);
        }
        Some(strategy)
    }

    /// Drop a running query, e.g. when AR is left during detection. A late
    /// answer is discarded and the next `start` launches a fresh query.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            debug!("Capability query cancelled");
        }
    }

    /// Start if needed and report the strategy once known.
    pub fn detect_strategy(&mut self, now: f64) -> Option<Strategy> {
        self.start(now);
        self.poll(now)
    }

    pub fn decided(&self) -> Option<Strategy> {
        self.decided
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Next strategy to try after `from` turned out to be unusable.
    pub fn degrade(&self, from: Strategy) -> Option<Strategy> {
        match from {
            Strategy::ImmersiveTracking if self.marker_tracking => Some(Strategy::MarkerTracking),
            Strategy::ImmersiveTracking | Strategy::MarkerTracking => Some(Strategy::FallbackCamera),
            Strategy::FallbackCamera => None,
        }
    }

    /// Record a strategy chosen by degradation, replacing the probed one.
    pub fn override_strategy(&mut self, strategy: Strategy) {
        info!("AR strategy changed to {:?}", strategy);
        self.pending = None;
        self.decided = Some(strategy);
    }

    fn resolve(&self, result: QueryResult) -> Strategy {
        let strategy = match result {
            Ok(true) => Strategy::ImmersiveTracking,
            Ok(false) if self.marker_tracking => Strategy::MarkerTracking,
            Ok(false) => Strategy::FallbackCamera,
            Err(error) => {
                info!("Capability query gave no answer ({}), using camera fallback", error);
                Strategy::FallbackCamera
            }
        };
        info!("AR strategy: {:?}", strategy);
        strategy
    }
}
