//! AI-generated mitigation recommendations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intervention::InterventionType;
use crate::wire::{lenient_f64, lenient_u32};

/// Urgency of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Critical hotspot.
    High,
    /// Moderately hot area.
    Medium,
    /// Opportunistic.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("High"),
            Self::Medium => f.write_str("Medium"),
            Self::Low => f.write_str("Low"),
        }
    }
}

/// Where a recommendation applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationLocation {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Human-readable place name.
    #[serde(default)]
    pub address: Option<String>,
}

/// Projected effect of following a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedImpact {
    /// Expected local reduction in °C.
    #[serde(default, deserialize_with = "lenient_f64_or_zero")]
    pub temp_reduction: f64,
    /// Cost band, e.g. "Medium".
    #[serde(default)]
    pub cost: Option<String>,
    /// Expected delivery time, e.g. "6-12 months".
    #[serde(default)]
    pub timeframe: Option<String>,
}

/// A read-only recommendation from the analytics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Service-assigned id.
    pub id: i64,
    /// Mitigation kind.
    #[serde(rename = "type")]
    pub kind: InterventionType,
    /// Target location.
    pub location: RecommendationLocation,
    /// Suggested tree count.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub count: Option<u32>,
    /// Suggested area in square metres.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub area: Option<f64>,
    /// Urgency.
    pub priority: Priority,
    /// Short action title.
    #[serde(default)]
    pub action: String,
    /// Longer explanation.
    #[serde(default)]
    pub description: String,
    /// Projected effect.
    pub estimated_impact: EstimatedImpact,
}

fn lenient_f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.unwrap_or(0.0))
}

/// Count of recommendations at each priority, in High/Medium/Low order.
#[must_use]
pub fn priority_counts(recs: &[Recommendation]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for rec in recs {
        let slot = match rec.priority {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        };
        counts[slot] += 1;
    }
    counts
}
