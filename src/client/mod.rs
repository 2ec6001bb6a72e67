//! Typed client for the analytics service.
//!
//! `RemoteDataClient` wraps a [`Transport`] with one method per endpoint.
//! Every method issues exactly one request and never retries; retry policy
//! belongs to the feeds and the simulation controller.

/// Feed payload decoding.
pub mod decode;
/// Transport seam and HTTP implementation.
pub mod transport;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ClientConfig;
use crate::error::{NetworkError, UhiResult};
use crate::health::HealthPrecaution;
use crate::heatmap::HeatmapData;
use crate::intervention::{InterventionType, Location};
use crate::metrics::SimulationResponse;
use crate::recommendation::Recommendation;

pub use transport::{HttpTransport, Transport};

/// Heatmap endpoint.
pub const HEATMAP_PATH: &str = "/api/v1/heatmap_data";
/// Simulation endpoint.
pub const SIMULATE_PATH: &str = "/api/v1/simulate_intervention";
/// Recommendations endpoint.
pub const RECOMMENDATIONS_PATH: &str = "/api/v1/recommendations";
/// Health precautions endpoint.
pub const HEALTH_PRECAUTIONS_PATH: &str = "/api/v1/health_precautions";

/// One intervention as sent to the simulation endpoint.
///
/// Unlike [`crate::Intervention`], every field is concrete: defaults are
/// applied before the request is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationItem {
    /// Mitigation kind.
    #[serde(rename = "type")]
    pub kind: InterventionType,
    /// Tree count, 0 when unset.
    pub count: u32,
    /// Covered area, 0 when unset.
    pub area: f64,
    /// `[lat, lon]`.
    pub location: Location,
    /// Local temperature, the session baseline when unset.
    pub base_temperature: f64,
}

/// Typed request wrapper over the four analytics endpoints.
#[derive(Clone)]
pub struct RemoteDataClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RemoteDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDataClient")
            .field("base_url", &self.transport.base_url())
            .finish_non_exhaustive()
    }
}

impl RemoteDataClient {
    /// Wraps an arbitrary transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Client over HTTP with the given configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn http(config: ClientConfig) -> UhiResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    /// Base address of the service.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// `GET /api/v1/heatmap_data`.
    ///
    /// A payload of the wrong shape yields an empty collection.
    ///
    /// # Errors
    ///
    /// Returns the transport's `NetworkError` unchanged.
    pub fn fetch_heatmap(&self) -> Result<HeatmapData, NetworkError> {
        let body = self.transport.get(HEATMAP_PATH, &[])?;
        Ok(decode::decode_or_else("heatmap", body, HeatmapData::empty))
    }

    /// `POST /api/v1/simulate_intervention`.
    ///
    /// Missing or non-numeric fields in the response are left as `None` for
    /// the caller to resolve.
    ///
    /// # Errors
    ///
    /// Returns the transport's `NetworkError`, or a `Protocol` error if the
    /// body is not a JSON object.
    pub fn post_simulation(
        &self,
        items: &[SimulationItem],
    ) -> Result<SimulationResponse, NetworkError> {
        let body = json!({ "interventions": items });
        let resp = self.transport.post(SIMULATE_PATH, &body)?;
        if !resp.is_object() {
            return Err(NetworkError::protocol(format!(
                "{SIMULATE_PATH} returned {}, expected an object",
                json_kind(&resp)
            )));
        }
        decode::decode("simulation", resp).map_err(|e| NetworkError::protocol(e.to_string()))
    }

    /// `GET /api/v1/recommendations`.
    ///
    /// A payload that is not a list yields an empty list; malformed items are
    /// dropped individually.
    ///
    /// # Errors
    ///
    /// Returns the transport's `NetworkError` unchanged.
    pub fn fetch_recommendations(&self) -> Result<Vec<Recommendation>, NetworkError> {
        let body = self.transport.get(RECOMMENDATIONS_PATH, &[])?;
        Ok(decode::decode_list("recommendations", body))
    }

    /// `GET /api/v1/health_precautions`, with `lat`/`lon` only when given.
    ///
    /// A payload that is not a list yields an empty list; malformed items are
    /// dropped individually.
    ///
    /// # Errors
    ///
    /// Returns the transport's `NetworkError` unchanged.
    pub fn fetch_health_precautions(
        &self,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Vec<HealthPrecaution>, NetworkError> {
        let mut query = Vec::with_capacity(2);
        if let Some(lat) = lat {
            query.push(("lat", lat.to_string()));
        }
        if let Some(lon) = lon {
            query.push(("lon", lon.to_string()));
        }
        let body = self.transport.get(HEALTH_PRECAUTIONS_PATH, &query)?;
        Ok(decode::decode_list("health precautions", body))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
