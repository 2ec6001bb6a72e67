//! Configuration for the client, feeds and dashboard.
//!
//! Every struct has a `Default` matching the production dashboard. `from_env`
//! overlays environment variables on top of the defaults; unparsable values are
//! logged and ignored.

use std::time::Duration;

use tracing::warn;

/// Default analytics service address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Baseline temperature used before the heatmap arrives.
pub const DEFAULT_INITIAL_BASELINE: f64 = 38.5;

/// Remote client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address, without trailing slash.
    pub base_url: String,
    /// Bound applied to every request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `UHI_API_URL` and `UHI_API_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(url) = env_string("UHI_API_URL") {
            cfg.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = env_parse::<u64>("UHI_API_TIMEOUT_MS") {
            cfg.timeout = Duration::from_millis(ms.max(1));
        }
        cfg
    }

    /// Joins `path` onto the base address.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Polling feed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Refresh period. `None` fetches once.
    pub interval: Option<Duration>,
    /// Surface silent-refresh failures while no data has ever loaded.
    pub show_error_if_empty: bool,
    /// Per-subscriber update buffer.
    pub update_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval: None,
            show_error_if_empty: true,
            update_capacity: 64,
        }
    }
}

impl FeedConfig {
    /// A feed refreshed every `interval`.
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::default()
        }
    }

    /// A feed fetched exactly once.
    #[must_use]
    pub fn once() -> Self {
        Self::default()
    }

    /// Recommendations cadence: 60 seconds.
    #[must_use]
    pub fn recommendations() -> Self {
        Self::every(Duration::from_secs(60))
    }

    /// Health precautions cadence: 90 seconds.
    #[must_use]
    pub fn health_precautions() -> Self {
        Self::every(Duration::from_secs(90))
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Remote client.
    pub client: ClientConfig,
    /// Heatmap feed (one-shot by default).
    pub heatmap: FeedConfig,
    /// Recommendations feed.
    pub recommendations: FeedConfig,
    /// Health precautions feed.
    pub health: FeedConfig,
    /// Baseline temperature before the heatmap is known.
    pub initial_baseline: f64,
    /// Optional latitude passed to the health precautions endpoint.
    pub health_lat: Option<f64>,
    /// Optional longitude passed to the health precautions endpoint.
    pub health_lon: Option<f64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            heatmap: FeedConfig::once(),
            recommendations: FeedConfig::recommendations(),
            health: FeedConfig::health_precautions(),
            initial_baseline: DEFAULT_INITIAL_BASELINE,
            health_lat: None,
            health_lon: None,
        }
    }
}

impl DashboardConfig {
    /// Defaults overlaid with the `UHI_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self {
            client: ClientConfig::from_env(),
            ..Self::default()
        };
        if let Some(secs) = env_parse::<u64>("UHI_RECOMMENDATIONS_REFRESH_SECS") {
            cfg.recommendations.interval = Some(Duration::from_secs(secs.max(1)));
        }
        if let Some(secs) = env_parse::<u64>("UHI_HEALTH_REFRESH_SECS") {
            cfg.health.interval = Some(Duration::from_secs(secs.max(1)));
        }
        cfg.health_lat = env_parse::<f64>("UHI_HEALTH_LAT");
        cfg.health_lon = env_parse::<f64>("UHI_HEALTH_LON");
        cfg
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
