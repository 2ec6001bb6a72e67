//! Feed state machine.
//!
//! Transitions are plain methods on [`FeedState`] so the loud/silent error
//! policy can be exercised without threads or timers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{NetworkError, NetworkErrorKind};

/// Visible lifecycle phase of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    /// Not activated yet.
    Idle,
    /// Loud fetch in progress.
    Loading,
    /// Holding fresh data.
    Ready,
    /// Holding data from an earlier fetch; the latest silent refresh failed
    /// and its error was suppressed.
    ReadyStale,
    /// An error is visible to the operator.
    Failed,
}

/// How a fetch reports itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Toggles `loading` and always surfaces failures.
    Loud,
    /// Leaves `loading` alone; surfaces failures only while no data exists.
    Silent,
}

/// An error the operator should see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedError {
    /// Whether the service was unreachable or answered badly.
    #[serde(skip)]
    pub kind: NetworkErrorKind,
    /// Operator-facing text.
    pub message: String,
    /// Underlying cause, for diagnostics.
    pub detail: String,
}

/// Whether a failure reached the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The error is now visible.
    Surfaced,
    /// Stale data stays on screen; the error was swallowed.
    Suppressed,
}

/// Everything the presentation needs to render a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedState<T> {
    /// Lifecycle phase.
    pub phase: FeedPhase,
    /// Last successfully fetched value.
    pub data: Option<T>,
    /// A loud fetch is running.
    pub loading: bool,
    /// Visible error, if any.
    pub error: Option<FeedError>,
    /// When `data` was last replaced.
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of successful fetches.
    pub successes: u64,
    /// Number of failures that were swallowed.
    pub suppressed_failures: u64,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            phase: FeedPhase::Idle,
            data: None,
            loading: false,
            error: None,
            last_updated: None,
            successes: 0,
            suppressed_failures: 0,
        }
    }
}

impl<T> FeedState<T> {
    /// True once any fetch has succeeded.
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Marks a fetch as started.
    pub fn begin(&mut self, mode: FetchMode) {
        if mode == FetchMode::Loud {
            self.loading = true;
            self.error = None;
            self.phase = FeedPhase::Loading;
        }
    }

    /// Replaces the data with `value`.
    pub fn succeed(&mut self, mode: FetchMode, value: T, at: DateTime<Utc>) {
        self.data = Some(value);
        self.error = None;
        self.last_updated = Some(at);
        self.successes += 1;
        self.phase = FeedPhase::Ready;
        if mode == FetchMode::Loud {
            self.loading = false;
        }
    }

    /// Applies the error-visibility policy to a failed fetch.
    ///
    /// Loud failures are always surfaced. Silent failures are surfaced only
    /// when no data exists and `show_error_if_empty` is set.
    pub fn fail(
        &mut self,
        mode: FetchMode,
        cause: &NetworkError,
        message: String,
        show_error_if_empty: bool,
    ) -> FailureOutcome {
        let surface = match mode {
            FetchMode::Loud => {
                self.loading = false;
                true
            }
            FetchMode::Silent => !self.has_data() && show_error_if_empty,
        };

        if surface {
            self.error = Some(FeedError {
                kind: cause.kind,
                message,
                detail: cause.to_string(),
            });
            self.phase = FeedPhase::Failed;
            FailureOutcome::Surfaced
        } else {
            self.suppressed_failures += 1;
            if self.has_data() {
                self.phase = FeedPhase::ReadyStale;
            }
            FailureOutcome::Suppressed
        }
    }
}
