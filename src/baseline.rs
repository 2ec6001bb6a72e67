//! Baseline temperature derived from the heatmap feed.
//!
//! The tracker adopts `metadata.avg_temperature` from the first usable
//! heatmap and, if no simulation has completed yet, seeds the session's
//! current metrics from it. Whether a simulation has completed is read from
//! the session's explicit flag, never inferred from how many interventions are
//! stored, so clearing the map after a simulation does not reseed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::heatmap::{HeatmapData, FALLBACK_AVG_TEMPERATURE};
use crate::session::{SeedOutcome, Session};

/// What a tracker observation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineUpdate {
    /// Baseline set and current metrics seeded.
    Seeded,
    /// Baseline set; a simulation had already completed.
    BaselineOnly,
    /// The heatmap carried no usable average temperature.
    NoTemperature,
    /// The tracker already applied a baseline earlier.
    AlreadyApplied,
}

/// One-shot bridge from the heatmap feed to the session baseline.
#[derive(Debug)]
pub struct HeatmapBaselineTracker {
    session: Arc<Session>,
    applied: AtomicBool,
}

impl HeatmapBaselineTracker {
    /// Creates a tracker for `session`.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            applied: AtomicBool::new(false),
        }
    }

    /// Offers a freshly fetched heatmap to the tracker.
    pub fn observe(&self, heatmap: &HeatmapData) -> BaselineUpdate {
        let Some(avg) = heatmap.avg_temperature() else {
            return BaselineUpdate::NoTemperature;
        };
        if self.applied.swap(true, Ordering::AcqRel) {
            return BaselineUpdate::AlreadyApplied;
        }

        match self.session.seed_baseline(avg, true) {
            SeedOutcome::Seeded => {
                info!(baseline = avg, "seeded metrics from heatmap baseline");
                BaselineUpdate::Seeded
            }
            SeedOutcome::BaselineOnly => {
                info!(baseline = avg, "adopted heatmap baseline; keeping simulated metrics");
                BaselineUpdate::BaselineOnly
            }
        }
    }

    /// Adopts the fallback baseline after the heatmap could not be fetched.
    ///
    /// Current metrics are left untouched.
    pub fn observe_failure(&self) -> BaselineUpdate {
        if self.applied.swap(true, Ordering::AcqRel) {
            return BaselineUpdate::AlreadyApplied;
        }
        self.session.seed_baseline(FALLBACK_AVG_TEMPERATURE, false);
        info!(baseline = FALLBACK_AVG_TEMPERATURE, "heatmap unavailable; using fallback baseline");
        BaselineUpdate::BaselineOnly
    }

    /// True once a baseline has been applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::Acquire)
    }
}
