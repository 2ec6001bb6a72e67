//! Citywide impact metrics.
//!
//! `ImpactMetrics` is the resolved, always-complete snapshot the dashboard
//! shows. `SimulationResponse` is the raw wire shape, where every field may be
//! missing; [`SimulationResponse::resolve`] applies the fallback table.

use serde::{Deserialize, Serialize};

use crate::wire::{lenient_f64, lenient_u32};

/// Health index assumed when the service does not report one.
pub const DEFAULT_HEALTH_SCORE: f64 = 7.2;

/// One simulation outcome, or the live baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactMetrics {
    /// Citywide mean temperature in °C.
    pub average_temperature: f64,
    /// Reduction versus baseline in °C.
    pub temperature_reduction: f64,
    /// Energy saved in MWh.
    pub energy_saving: f64,
    /// CO2 avoided in kg.
    pub co2_reduction: f64,
    /// Public health index out of 10.
    pub health_score: f64,
}

impl ImpactMetrics {
    /// Metrics for a city with no interventions at `baseline` °C.
    #[must_use]
    pub const fn baseline(baseline: f64) -> Self {
        Self {
            average_temperature: baseline,
            temperature_reduction: 0.0,
            energy_saving: 0.0,
            co2_reduction: 0.0,
            health_score: DEFAULT_HEALTH_SCORE,
        }
    }
}

/// Raw `/simulate_intervention` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    /// Simulated city-wide mean in °C.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_temperature: Option<f64>,
    /// Cooling relative to the baseline in °C.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temperature_reduction: Option<f64>,
    /// Energy saved in MWh.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub energy_saving: Option<f64>,
    /// CO₂ avoided in kg.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub co2_reduction: Option<f64>,
    /// Health score on a 0-10 scale.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub health_score: Option<f64>,
    /// Number of interventions the service accounted for.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub intervention_count: Option<u32>,
}

impl SimulationResponse {
    /// Fills every missing field from the fallback table.
    ///
    /// `average_temperature` falls back to `baseline`, `health_score` to
    /// [`DEFAULT_HEALTH_SCORE`], and the rest to zero.
    #[must_use]
    pub fn resolve(&self, baseline: f64) -> ImpactMetrics {
        ImpactMetrics {
            average_temperature: self.average_temperature.unwrap_or(baseline),
            temperature_reduction: self.temperature_reduction.unwrap_or(0.0),
            energy_saving: self.energy_saving.unwrap_or(0.0),
            co2_reduction: self.co2_reduction.unwrap_or(0.0),
            health_score: self.health_score.unwrap_or(DEFAULT_HEALTH_SCORE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn complete_response_resolves_verbatim() {
        let resp: SimulationResponse = serde_json::from_value(json!({
            "average_temperature": 36.1,
            "temperature_reduction": 1.4,
            "energy_saving": 12.5,
            "co2_reduction": 430.0,
            "health_score": 7.9,
            "intervention_count": 2
        }))
        .unwrap();

        let m = resp.resolve(37.5);
        assert_eq!(m.average_temperature, 36.1);
        assert_eq!(m.co2_reduction, 430.0);
        assert_eq!(m.health_score, 7.9);
        assert_eq!(resp.intervention_count, Some(2));
    }

    #[test]
    fn partial_response_uses_fallbacks() {
        let resp: SimulationResponse = serde_json::from_value(json!({
            "temperature_reduction": "oops",
            "energy_saving": null,
            "co2_reduction": 12
        }))
        .unwrap();

        let m = resp.resolve(37.5);
        assert_eq!(m.average_temperature, 37.5);
        assert_eq!(m.temperature_reduction, 0.0);
        assert_eq!(m.energy_saving, 0.0);
        assert_eq!(m.co2_reduction, 12.0);
        assert_eq!(m.health_score, DEFAULT_HEALTH_SCORE);
    }

    #[test]
    fn baseline_snapshot() {
        let m = ImpactMetrics::baseline(38.5);
        assert_eq!(m.average_temperature, 38.5);
        assert_eq!(m.energy_saving, 0.0);
        assert_eq!(m.health_score, 7.2);
    }
}
