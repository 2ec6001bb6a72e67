//! Auto-refreshing remote feeds.
//!
//! A `PollingFeed` owns one worker thread. On activation it performs a loud
//! fetch, then a silent fetch on every tick of its interval. State lives
//! behind a mutex; deactivation flips the `active` flag under that same mutex,
//! so once `deactivate` returns no fetch result, success hook, or update
//! notification can land.

/// Feed state machine.
pub mod state;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, never, select, tick, Receiver, Sender, TrySendError};
use tracing::{debug, error};

use crate::config::{FeedConfig, DEFAULT_BASE_URL};
use crate::error::{NetworkError, UhiError, UhiResult};

pub use state::{FailureOutcome, FeedError, FeedPhase, FeedState, FetchMode};

type FetchFn<T> = Box<dyn Fn() -> Result<T, NetworkError> + Send>;
type SuccessHook<T> = Box<dyn Fn(&T) + Send + Sync>;
type FailureHook = Box<dyn Fn(&NetworkError) + Send + Sync>;

/// Notification sent to subscribers after every applied fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    /// Feed label.
    pub feed: &'static str,
    /// Phase after the fetch was applied.
    pub phase: FeedPhase,
    /// Mode of the fetch that produced this update.
    pub mode: FetchMode,
    /// When the update was applied.
    pub at: DateTime<Utc>,
}

enum Control {
    Refresh,
}

struct Shared<T> {
    label: &'static str,
    base_url: String,
    show_error_if_empty: bool,
    update_capacity: usize,
    active: AtomicBool,
    state: Mutex<FeedState<T>>,
    subscribers: Mutex<Vec<Sender<FeedUpdate>>>,
    on_success: Option<SuccessHook<T>>,
    on_failure: Option<FailureHook>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, FeedState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn fetch_once(&self, fetch: &FetchFn<T>, mode: FetchMode) {
        {
            let mut state = self.lock();
            if !self.is_active() {
                return;
            }
            state.begin(mode);
        }

        let result = fetch();

        let phase = {
            let mut state = self.lock();
            if !self.is_active() {
                debug!(feed = self.label, "feed deactivated during fetch; discarding result");
                return;
            }
            match result {
                Ok(value) => {
                    if let Some(hook) = &self.on_success {
                        hook(&value);
                    }
                    state.succeed(mode, value, Utc::now());
                }
                Err(err) => {
                    if let Some(hook) = &self.on_failure {
                        hook(&err);
                    }
                    let message = err.user_message(&self.base_url, self.label);
                    match state.fail(mode, &err, message, self.show_error_if_empty) {
                        FailureOutcome::Surfaced => {
                            error!(feed = self.label, error = %err, ?mode, "feed fetch failed");
                        }
                        FailureOutcome::Suppressed => {
                            debug!(
                                feed = self.label,
                                error = %err,
                                "silent refresh failed; keeping stale data"
                            );
                        }
                    }
                }
            }
            state.phase
        };

        self.notify(FeedUpdate {
            feed: self.label,
            phase,
            mode,
            at: Utc::now(),
        });
    }

    fn notify(&self, update: FeedUpdate) {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        // Never block the poller on a slow subscriber.
        subs.retain(|tx| match tx.try_send(update.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

/// Generic auto-refreshing data source.
pub struct PollingFeed<T> {
    shared: Arc<Shared<T>>,
    interval: Option<std::time::Duration>,
    fetch: Option<FetchFn<T>>,
    control_tx: Option<Sender<Control>>,
    worker: Option<JoinHandle<()>>,
}

impl<T> fmt::Debug for PollingFeed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingFeed")
            .field("label", &self.shared.label)
            .field("interval", &self.interval)
            .field("active", &self.shared.is_active())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> PollingFeed<T> {
    /// Creates an idle feed.
    ///
    /// `label` names the feed in logs and operator messages
    /// (e.g. "recommendations").
    pub fn new<F>(label: &'static str, config: &FeedConfig, fetch: F) -> Self
    where
        F: Fn() -> Result<T, NetworkError> + Send + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                label,
                base_url: DEFAULT_BASE_URL.to_string(),
                show_error_if_empty: config.show_error_if_empty,
                update_capacity: config.update_capacity.max(1),
                active: AtomicBool::new(false),
                state: Mutex::new(FeedState::default()),
                subscribers: Mutex::new(Vec::new()),
                on_success: None,
                on_failure: None,
            }),
            interval: config.interval,
            fetch: Some(Box::new(fetch)),
            control_tx: None,
            worker: None,
        }
    }

    /// Base address quoted in "server not running" messages.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.base_url = base_url.into();
        }
        self
    }

    /// Hook run with every successfully fetched value, before it is stored.
    ///
    /// The hook runs under the feed lock and never after deactivation.
    #[must_use]
    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.on_success = Some(Box::new(hook));
        }
        self
    }

    /// Hook run with every failed fetch, loud or silent.
    ///
    /// Same locking guarantees as [`Self::on_success`].
    #[must_use]
    pub fn on_failure(mut self, hook: impl Fn(&NetworkError) + Send + Sync + 'static) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.on_failure = Some(Box::new(hook));
        }
        self
    }

    /// Registers for update notifications.
    ///
    /// Updates are dropped for a subscriber whose buffer is full.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<FeedUpdate> {
        let (tx, rx) = bounded(self.shared.update_capacity);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Starts the worker: one loud fetch, then silent refreshes.
    ///
    /// # Errors
    ///
    /// Fails if the feed was already activated or the worker thread cannot
    /// be spawned.
    pub fn activate(&mut self) -> UhiResult<()> {
        let Some(fetch) = self.fetch.take() else {
            return Err(UhiError::internal(format!(
                "feed '{}' was already activated",
                self.shared.label
            )));
        };

        let (control_tx, control_rx) = bounded::<Control>(1);
        self.shared.active.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name(format!("uhi-feed-{}", self.shared.label.replace(' ', "-")))
            .spawn(move || worker_loop(&shared, &fetch, interval, &control_rx));

        match spawned {
            Ok(handle) => {
                self.control_tx = Some(control_tx);
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.active.store(false, Ordering::Release);
                Err(UhiError::internal(format!(
                    "failed to spawn feed worker '{}': {e}",
                    self.shared.label
                )))
            }
        }
    }

    /// Requests an immediate loud fetch. No-op if one is already queued or the
    /// feed is inactive.
    pub fn refresh(&self) {
        if let Some(tx) = &self.control_tx {
            let _ = tx.try_send(Control::Refresh);
        }
    }

    /// Stops refreshing. Any in-flight fetch result is discarded.
    pub fn deactivate(&mut self) {
        {
            let _state = self.shared.lock();
            self.shared.active.store(false, Ordering::Release);
        }
        // Closing the control channel wakes the worker out of `select!`.
        self.control_tx = None;
        // Do not join: an in-flight fetch may hold the worker for up to the
        // request timeout. The worker exits on its own once it observes the
        // closed channel.
        drop(self.worker.take());
    }

    /// True between `activate` and `deactivate`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Feed label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.shared.label
    }

    /// Runs `f` against the current state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&FeedState<T>) -> R) -> R {
        f(&self.shared.lock())
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        self.with_state(|s| s.phase)
    }
}

impl<T: Clone + Send + 'static> PollingFeed<T> {
    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> FeedState<T> {
        self.with_state(Clone::clone)
    }
}

impl<T> Drop for PollingFeed<T> {
    fn drop(&mut self) {
        {
            let _state = self.shared.lock();
            self.shared.active.store(false, Ordering::Release);
        }
        self.control_tx = None;
    }
}

fn worker_loop<T>(
    shared: &Shared<T>,
    fetch: &FetchFn<T>,
    interval: Option<std::time::Duration>,
    control_rx: &Receiver<Control>,
) {
    shared.fetch_once(fetch, FetchMode::Loud);

    let ticker = interval.map_or_else(never, tick);
    loop {
        if !shared.is_active() {
            break;
        }
        select! {
            recv(control_rx) -> msg => match msg {
                Ok(Control::Refresh) => shared.fetch_once(fetch, FetchMode::Loud),
                Err(_) => break,
            },
            recv(ticker) -> _ => shared.fetch_once(fetch, FetchMode::Silent),
        }
    }
    debug!(feed = shared.label, "feed worker stopped");
}
