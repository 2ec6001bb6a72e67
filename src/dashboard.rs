//! Composition root.
//!
//! A `Dashboard` owns one session, one simulation controller, and the three
//! feeds (heatmap, recommendations, health precautions), all sharing a single
//! [`RemoteDataClient`]. The heatmap feed is wired to the baseline tracker
//! through its success and failure hooks.

use std::sync::Arc;

use tracing::info;

use crate::baseline::HeatmapBaselineTracker;
use crate::client::RemoteDataClient;
use crate::config::DashboardConfig;
use crate::error::UhiResult;
use crate::feed::{FeedPhase, FeedState, PollingFeed};
use crate::health::{self, HealthPrecaution};
use crate::heatmap::HeatmapData;
use crate::intervention::{Intervention, InterventionId, InterventionType};
use crate::recommendation::Recommendation;
use crate::session::{MetricsView, Session};
use crate::simulation::{SimulationController, SimulationHandle, SimulationOutcome};

const HEATMAP_LABEL: &str = "heatmap data";
const RECOMMENDATIONS_LABEL: &str = "recommendations";
const HEALTH_LABEL: &str = "health precautions";

/// Headless dashboard: session state plus live feeds.
#[derive(Debug)]
pub struct Dashboard {
    base_url: String,
    session: Arc<Session>,
    controller: SimulationController,
    tracker: Arc<HeatmapBaselineTracker>,
    heatmap: PollingFeed<HeatmapData>,
    recommendations: PollingFeed<Vec<Recommendation>>,
    health: PollingFeed<Vec<HealthPrecaution>>,
}

impl Dashboard {
    /// Builds a dashboard talking HTTP to `config.client.base_url`.
    ///
    /// Feeds stay idle until [`Self::start`].
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: DashboardConfig) -> UhiResult<Self> {
        let client = RemoteDataClient::http(config.client.clone())?;
        Ok(Self::with_client(client, &config))
    }

    /// Builds a dashboard over an existing client.
    #[must_use]
    pub fn with_client(client: RemoteDataClient, config: &DashboardConfig) -> Self {
        let session = Arc::new(Session::new(config.initial_baseline));
        let tracker = Arc::new(HeatmapBaselineTracker::new(Arc::clone(&session)));
        let base_url = client.base_url().to_string();

        let heatmap = {
            let fetch_client = client.clone();
            let on_data = Arc::clone(&tracker);
            let on_error = Arc::clone(&tracker);
            PollingFeed::new(HEATMAP_LABEL, &config.heatmap, move || fetch_client.fetch_heatmap())
                .with_base_url(base_url.clone())
                .on_success(move |data| {
                    on_data.observe(data);
                })
                .on_failure(move |_| {
                    on_error.observe_failure();
                })
        };

        let recommendations = {
            let fetch_client = client.clone();
            PollingFeed::new(RECOMMENDATIONS_LABEL, &config.recommendations, move || {
                fetch_client.fetch_recommendations()
            })
            .with_base_url(base_url.clone())
        };

        let health = {
            let fetch_client = client.clone();
            let (lat, lon) = (config.health_lat, config.health_lon);
            PollingFeed::new(HEALTH_LABEL, &config.health, move || {
                fetch_client.fetch_health_precautions(lat, lon)
            })
            .with_base_url(base_url)
        };

        Self {
            base_url: client.base_url().to_string(),
            session,
            controller: SimulationController::new(client),
            tracker,
            heatmap,
            recommendations,
            health,
        }
    }

    /// Activates every feed.
    ///
    /// # Errors
    ///
    /// Fails if a feed was already started or its worker cannot be spawned.
    pub fn start(&mut self) -> UhiResult<()> {
        self.heatmap.activate()?;
        self.recommendations.activate()?;
        self.health.activate()?;
        info!(base_url = %self.base_url, "dashboard started");
        Ok(())
    }

    /// Deactivates every feed. Responses still in flight are discarded.
    pub fn shutdown(&mut self) {
        self.heatmap.deactivate();
        self.recommendations.deactivate();
        self.health.deactivate();
        info!("dashboard stopped");
    }

    /// Base address of the analytics service.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared session state.
    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Heatmap baseline tracker.
    #[must_use]
    pub fn baseline_tracker(&self) -> &HeatmapBaselineTracker {
        &self.tracker
    }

    /// Heatmap feed.
    #[must_use]
    pub fn heatmap_feed(&self) -> &PollingFeed<HeatmapData> {
        &self.heatmap
    }

    /// Recommendations feed.
    #[must_use]
    pub fn recommendations_feed(&self) -> &PollingFeed<Vec<Recommendation>> {
        &self.recommendations
    }

    /// Health precautions feed.
    #[must_use]
    pub fn health_feed(&self) -> &PollingFeed<Vec<HealthPrecaution>> {
        &self.health
    }

    /// Appends an intervention and returns its id.
    pub fn add_intervention(&self, intervention: Intervention) -> InterventionId {
        let id = intervention.id;
        self.session.interventions().add(intervention);
        id
    }

    /// Places an intervention at a map position with the placement defaults.
    pub fn place_intervention(&self, kind: InterventionType, lat: f64, lon: f64) -> InterventionId {
        self.add_intervention(Intervention::place(kind, lat, lon))
    }

    /// Adds the intervention a recommendation describes.
    pub fn apply_recommendation(&self, recommendation: &Recommendation) -> InterventionId {
        let id = self.add_intervention(Intervention::from_recommendation(recommendation));
        info!(
            recommendation = recommendation.id,
            kind = %recommendation.kind,
            "applied recommendation"
        );
        id
    }

    /// Removes the intervention at `index`. Out of range is a no-op.
    pub fn remove_intervention(&self, index: usize) -> Option<Intervention> {
        self.session.interventions().remove_at(index)
    }

    /// Snapshot of the placed interventions.
    #[must_use]
    pub fn interventions(&self) -> Vec<Intervention> {
        self.session.interventions().list()
    }

    /// True when there is something to simulate and nothing in flight.
    #[must_use]
    pub fn can_simulate(&self) -> bool {
        !self.session.interventions().is_empty() && !self.controller.is_running()
    }

    /// Runs a simulation on the calling thread.
    ///
    /// # Errors
    ///
    /// See [`SimulationController::run_simulation`].
    pub fn simulate(&self) -> UhiResult<SimulationOutcome> {
        self.controller.run_simulation(&self.session)
    }

    /// Runs a simulation on a worker thread.
    ///
    /// # Errors
    ///
    /// See [`SimulationController::run_simulation_async`].
    pub fn simulate_async(&self) -> UhiResult<SimulationHandle> {
        self.controller.run_simulation_async(Arc::clone(&self.session))
    }

    /// Copy of the metrics state.
    #[must_use]
    pub fn metrics(&self) -> MetricsView {
        self.session.metrics()
    }

    /// Heatmap to render.
    ///
    /// Once the one-shot fetch has failed without ever producing data, this
    /// is [`HeatmapData::fallback`]. `None` while the fetch is pending.
    #[must_use]
    pub fn heatmap(&self) -> Option<HeatmapData> {
        self.heatmap.with_state(|s| match (&s.data, s.phase) {
            (Some(data), _) => Some(data.clone()),
            (None, FeedPhase::Failed) => Some(HeatmapData::fallback()),
            (None, _) => None,
        })
    }

    /// Recommendations feed state.
    #[must_use]
    pub fn recommendations(&self) -> FeedState<Vec<Recommendation>> {
        self.recommendations.snapshot()
    }

    /// Health precautions feed state.
    #[must_use]
    pub fn health_precautions(&self) -> FeedState<Vec<HealthPrecaution>> {
        self.health.snapshot()
    }

    /// Number of high-severity precautions currently held.
    #[must_use]
    pub fn active_alerts(&self) -> usize {
        self.health
            .with_state(|s| s.data.as_deref().map_or(0, health::active_alerts))
    }

    /// Requests a loud refetch of recommendations.
    pub fn refresh_recommendations(&self) {
        self.recommendations.refresh();
    }

    /// Requests a loud refetch of health precautions.
    pub fn refresh_health_precautions(&self) {
        self.health.refresh();
    }
}
