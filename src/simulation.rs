//! Simulation controller.
//!
//! Turns the session's interventions into one simulation request and applies
//! the result to the session metrics. At most one simulation is in flight:
//! the latch is a compare-and-set on an `AtomicBool`, released by an RAII
//! guard, and a second caller is rejected immediately rather than queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use tracing::{info, warn};

use crate::client::{RemoteDataClient, SimulationItem};
use crate::error::{SimulationError, UhiError, UhiResult, ValidationError};
use crate::intervention::Intervention;
use crate::metrics::ImpactMetrics;
use crate::session::Session;

/// Result of a completed simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationOutcome {
    /// Metrics now stored as `current`.
    pub metrics: ImpactMetrics,
    /// Number of request items sent.
    pub items: usize,
    /// Store revision the request was built from.
    pub revision: u64,
}

/// Builds request items, applying the per-field defaults.
///
/// `count` and `area` default to zero; `base_temperature` defaults to
/// `baseline`.
#[must_use]
pub fn build_request(interventions: &[Intervention], baseline: f64) -> Vec<SimulationItem> {
    interventions
        .iter()
        .map(|iv| SimulationItem {
            kind: iv.kind,
            count: iv.count.unwrap_or(0),
            area: iv.area.unwrap_or(0.0),
            location: iv.location,
            base_temperature: iv.base_temperature.unwrap_or(baseline),
        })
        .collect()
}

struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives simulation requests for a session.
#[derive(Debug, Clone)]
pub struct SimulationController {
    client: RemoteDataClient,
    in_flight: Arc<AtomicBool>,
}

impl SimulationController {
    /// Creates a controller over `client`.
    #[must_use]
    pub fn new(client: RemoteDataClient) -> Self {
        Self {
            client,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a simulation request is outstanding.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Runs a simulation on the calling thread.
    ///
    /// # Errors
    ///
    /// - `ValidationError::NoInterventions` if the store is empty; no request is made.
    /// - `SimulationError::AlreadyRunning` if another simulation is in flight; no request is made.
    /// - `SimulationError::Request` if the request fails; metrics are untouched.
    pub fn run_simulation(&self, session: &Session) -> UhiResult<SimulationOutcome> {
        let (items, revision) = prepare(session)?;
        let guard = self.acquire()?;
        let outcome = execute(&self.client, session, &items, revision);
        drop(guard);
        outcome
    }

    /// Runs a simulation on a worker thread.
    ///
    /// Validation and the single-flight check happen synchronously, so a
    /// rejected call returns before this function does.
    ///
    /// # Errors
    ///
    /// Same synchronous errors as [`Self::run_simulation`], plus
    /// `UhiError::Internal` if the worker cannot be spawned.
    pub fn run_simulation_async(&self, session: Arc<Session>) -> UhiResult<SimulationHandle> {
        let (items, revision) = prepare(&session)?;
        let guard = self.acquire()?;

        let (tx, rx) = bounded::<UhiResult<SimulationOutcome>>(1);
        let client = self.client.clone();
        thread::Builder::new()
            .name("uhi-simulation".to_string())
            .spawn(move || {
                let result = execute(&client, &session, &items, revision);
                drop(guard);
                let _ = tx.send(result);
            })
            .map_err(|e| UhiError::internal(format!("failed to spawn simulation worker: {e}")))?;

        Ok(SimulationHandle { rx })
    }

    fn acquire(&self) -> UhiResult<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| UhiError::Simulation(SimulationError::AlreadyRunning))?;
        Ok(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }
}

fn prepare(session: &Session) -> UhiResult<(Vec<SimulationItem>, u64)> {
    let baseline = session.baseline();
    let store = session.interventions();
    let (items, revision) = store.read(|ivs| (build_request(ivs, baseline), store.revision()));
    if items.is_empty() {
        return Err(UhiError::Validation(ValidationError::NoInterventions));
    }
    Ok((items, revision))
}

fn execute(
    client: &RemoteDataClient,
    session: &Session,
    items: &[SimulationItem],
    revision: u64,
) -> UhiResult<SimulationOutcome> {
    match client.post_simulation(items) {
        Ok(response) => {
            let metrics = session.apply_simulation(&response, revision);
            info!(
                items = items.len(),
                average_temperature = metrics.average_temperature,
                reduction = metrics.temperature_reduction,
                "simulation completed"
            );
            Ok(SimulationOutcome {
                metrics,
                items: items.len(),
                revision,
            })
        }
        Err(err) => {
            warn!(items = items.len(), error = %err, "simulation request failed");
            Err(UhiError::Simulation(SimulationError::Request(err)))
        }
    }
}

/// Handle returned by [`SimulationController::run_simulation_async`].
#[derive(Debug)]
pub struct SimulationHandle {
    rx: Receiver<UhiResult<SimulationOutcome>>,
}

impl SimulationHandle {
    /// Waits for the simulation to finish.
    ///
    /// # Errors
    ///
    /// The simulation's own error, or `SimulationError::Disconnected` if the
    /// worker died without reporting.
    pub fn join(self) -> UhiResult<SimulationOutcome> {
        self.rx
            .recv()
            .map_err(|_| UhiError::Simulation(SimulationError::Disconnected))?
    }

    /// Waits at most `timeout` for the simulation to finish.
    ///
    /// # Errors
    ///
    /// As [`Self::join`], plus `SimulationError::Timeout`. A timed-out
    /// simulation keeps running and still applies its result.
    pub fn join_timeout(self, timeout: Duration) -> UhiResult<SimulationOutcome> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => UhiError::Simulation(SimulationError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => UhiError::Simulation(SimulationError::Disconnected),
        })?
    }
}
