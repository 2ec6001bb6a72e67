//! Error types for the UHI sync core.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the failure class. Remote failures are classified once, at the transport
//! boundary, and carried unchanged up to the presentation layer.

use std::fmt;

use thiserror::Error;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// Connection refused, DNS failure, or timeout.
    Unreachable,
    /// Non-2xx status or a body that is not JSON.
    Protocol,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("unreachable"),
            Self::Protocol => f.write_str("protocol"),
        }
    }
}

/// A failed request against the analytics service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct NetworkError {
    /// Failure class.
    pub kind: NetworkErrorKind,
    /// Human-readable cause.
    pub message: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
}

impl NetworkError {
    /// Creates an `Unreachable` error.
    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Unreachable,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a `Protocol` error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Protocol,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a `Protocol` error for a non-2xx response.
    #[must_use]
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: NetworkErrorKind::Protocol,
            message: message.into(),
            status: Some(code),
        }
    }

    /// Returns true if the server could not be reached at all.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self.kind, NetworkErrorKind::Unreachable)
    }

    /// Message suitable for the operator.
    ///
    /// `subject` names what failed to load, e.g. "recommendations".
    #[must_use]
    pub fn user_message(&self, base_url: &str, subject: &str) -> String {
        match self.kind {
            NetworkErrorKind::Unreachable => format!(
                "Backend server is not running. Please start the backend server at {base_url}"
            ),
            NetworkErrorKind::Protocol => {
                format!("Failed to load {subject}. Please try again later.")
            }
        }
    }
}

/// Input validation errors raised before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no interventions to simulate")]
    NoInterventions,
}

/// Failures of a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("a simulation is already in flight")]
    AlreadyRunning,

    #[error("simulation request failed: {0}")]
    Request(#[source] NetworkError),

    #[error("simulation worker disconnected")]
    Disconnected,

    #[error("simulation did not finish within {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

impl SimulationError {
    /// Message suitable for the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyRunning => "A simulation is already running.".to_string(),
            Self::Request(cause) => format!("Failed to simulate interventions: {}", cause.message),
            Self::Disconnected | Self::Timeout { .. } => {
                "Failed to simulate interventions: Please ensure the backend server is running."
                    .to_string()
            }
        }
    }
}

/// A payload that is valid JSON but not the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected {feed} payload: {message}")]
pub struct DecodeError {
    /// Feed or endpoint the payload came from.
    pub feed: String,
    /// Decoder message.
    pub message: String,
}

/// Top-level error type for the sync core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UhiError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl UhiError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a network error.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true if this is a simulation error.
    #[must_use]
    pub const fn is_simulation(&self) -> bool {
        matches!(self, Self::Simulation(_))
    }

    /// Returns true if a later retry could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Decode(_) | Self::Internal { .. } => false,
            Self::Network(e) => e.is_unreachable() || e.status.is_some_and(|s| s >= 500),
            Self::Simulation(e) => match e {
                SimulationError::AlreadyRunning | SimulationError::Timeout { .. } => true,
                SimulationError::Request(cause) => {
                    cause.is_unreachable() || cause.status.is_some_and(|s| s >= 500)
                }
                SimulationError::Disconnected => false,
            },
        }
    }
}

/// Result type alias for sync core operations.
pub type UhiResult<T> = Result<T, UhiError>;
