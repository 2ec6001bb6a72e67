//! # uhi-sync - state and feed synchronization for a heat island dashboard
//!
//! `uhi-sync` is the client-side core of an urban heat island mitigation
//! dashboard. It keeps a session of planned interventions, sends them to an
//! analytics service for simulation, and keeps three remote feeds (heatmap,
//! recommendations, health precautions) fresh in the background.
//!
//! ## Core Concepts
//!
//! - **Intervention**: a planned mitigation (trees, cool roof, park, green roof) at a location
//! - **Session**: the intervention store plus the current/previous impact metrics
//! - **PollingFeed**: an auto-refreshing remote data source with loud and silent fetches
//! - **SimulationController**: single-flight simulation requests against the session
//! - **HeatmapBaselineTracker**: seeds the metrics from the heatmap's average temperature
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uhi_sync::{Dashboard, DashboardConfig, InterventionType};
//!
//! let mut dashboard = Dashboard::new(DashboardConfig::from_env())?;
//! dashboard.start()?;
//!
//! dashboard.place_intervention(InterventionType::Trees, 18.52, 73.85);
//! let outcome = dashboard.simulate()?;
//! println!("{}", dashboard.metrics().deltas().temperature);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Domain types
pub mod error;
pub mod health;
pub mod heatmap;
pub mod intervention;
pub mod metrics;
pub mod recommendation;
mod wire;

// Configuration
pub mod config;

// State
pub mod session;
pub mod store;

// Remote access
pub mod client;
pub mod feed;

// Orchestration
pub mod baseline;
pub mod dashboard;
pub mod delta;
pub mod simulation;

// Re-export primary types at crate root for convenience
pub use baseline::{BaselineUpdate, HeatmapBaselineTracker};
pub use client::{HttpTransport, RemoteDataClient, SimulationItem, Transport};
pub use config::{ClientConfig, DashboardConfig, FeedConfig};
pub use dashboard::Dashboard;
pub use delta::{delta, format_value, DeltaStrings, HeadlineValues};
pub use error::{
    DecodeError, NetworkError, NetworkErrorKind, SimulationError, UhiError, UhiResult,
    ValidationError,
};
pub use feed::{FeedError, FeedPhase, FeedState, FeedUpdate, FetchMode, PollingFeed};
pub use health::{HealthPrecaution, Severity};
pub use heatmap::HeatmapData;
pub use intervention::{Intervention, InterventionId, InterventionType, Location};
pub use metrics::{ImpactMetrics, SimulationResponse};
pub use recommendation::{Priority, Recommendation};
pub use session::{MetricsView, Session};
pub use simulation::{SimulationController, SimulationHandle, SimulationOutcome};
pub use store::InterventionStore;
