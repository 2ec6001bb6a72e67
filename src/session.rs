//! Session context: the only mutable domain state.
//!
//! A `Session` owns the intervention store and the metrics pair. It is shared
//! as `Arc<Session>` between the simulation controller, the baseline tracker
//! and the presentation layer. Every write to the metrics happens under one
//! mutex, so baseline seeding and simulation results are totally ordered.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::delta::{self, DeltaStrings, HeadlineValues};
use crate::metrics::{ImpactMetrics, SimulationResponse};
use crate::store::InterventionStore;

/// Outcome of offering a baseline temperature to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Baseline set and `current` metrics seeded from it.
    Seeded,
    /// Baseline set; metrics untouched because a simulation already completed
    /// or seeding was not requested.
    BaselineOnly,
}

#[derive(Debug)]
struct MetricsState {
    current: ImpactMetrics,
    previous: Option<ImpactMetrics>,
    baseline: f64,
    simulated: bool,
    simulated_revision: Option<u64>,
}

/// Point-in-time copy of the metrics state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsView {
    /// Latest metrics.
    pub current: ImpactMetrics,
    /// Metrics before the latest simulation.
    pub previous: Option<ImpactMetrics>,
    /// Baseline temperature used for request and response defaults.
    pub baseline: f64,
    /// True once any simulation has completed in this session.
    pub simulated: bool,
}

impl MetricsView {
    /// Change strings between `current` and `previous`.
    #[must_use]
    pub fn deltas(&self) -> DeltaStrings {
        delta::delta(&self.current, self.previous.as_ref())
    }

    /// Headline card values for `current`.
    #[must_use]
    pub fn headline(&self) -> HeadlineValues {
        delta::format_value(&self.current)
    }
}

/// Session-scoped interventions and metrics.
#[derive(Debug)]
pub struct Session {
    interventions: InterventionStore,
    metrics: Mutex<MetricsState>,
}

impl Session {
    /// Creates a session whose metrics start at `initial_baseline`.
    #[must_use]
    pub fn new(initial_baseline: f64) -> Self {
        Self {
            interventions: InterventionStore::new(),
            metrics: Mutex::new(MetricsState {
                current: ImpactMetrics::baseline(initial_baseline),
                previous: None,
                baseline: initial_baseline,
                simulated: false,
                simulated_revision: None,
            }),
        }
    }

    /// The intervention store.
    #[must_use]
    pub const fn interventions(&self) -> &InterventionStore {
        &self.interventions
    }

    /// Copy of the metrics state.
    #[must_use]
    pub fn metrics(&self) -> MetricsView {
        let state = self.lock();
        MetricsView {
            current: state.current,
            previous: state.previous,
            baseline: state.baseline,
            simulated: state.simulated,
        }
    }

    /// Current baseline temperature.
    #[must_use]
    pub fn baseline(&self) -> f64 {
        self.lock().baseline
    }

    /// True once any simulation has completed.
    #[must_use]
    pub fn has_simulated(&self) -> bool {
        self.lock().simulated
    }

    /// True when the store changed since the metrics were last simulated.
    #[must_use]
    pub fn metrics_stale(&self) -> bool {
        let simulated_revision = self.lock().simulated_revision;
        match simulated_revision {
            Some(rev) => rev != self.interventions.revision(),
            None => !self.interventions.is_empty(),
        }
    }

    /// Records a successful simulation.
    ///
    /// `current` is copied into `previous`, then replaced by `response`
    /// resolved against the baseline. The session is marked as simulated in
    /// the same critical section.
    pub fn apply_simulation(&self, response: &SimulationResponse, revision: u64) -> ImpactMetrics {
        let mut state = self.lock();
        let resolved = response.resolve(state.baseline);
        state.previous = Some(state.current);
        state.current = resolved;
        state.simulated = true;
        state.simulated_revision = Some(revision);
        resolved
    }

    /// Adopts `baseline` and, if `seed_metrics` is set and no simulation has
    /// completed yet, resets `current` to the baseline metrics.
    pub fn seed_baseline(&self, baseline: f64, seed_metrics: bool) -> SeedOutcome {
        let mut state = self.lock();
        state.baseline = baseline;
        if seed_metrics && !state.simulated {
            state.current = ImpactMetrics::baseline(baseline);
            SeedOutcome::Seeded
        } else {
            SeedOutcome::BaselineOnly
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds valid metrics.
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_INITIAL_BASELINE)
    }
}
