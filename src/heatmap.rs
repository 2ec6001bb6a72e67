//! Thermal heatmap feature collection.
//!
//! Features are kept as opaque JSON: the core never inspects or mutates them,
//! it only forwards them to the renderer. The metadata block is typed because
//! the baseline tracker reads `avg_temperature` from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire::lenient_f64;

/// City assumed when the heatmap cannot be fetched.
pub const FALLBACK_CITY: &str = "Pune";

/// Average temperature assumed when the heatmap cannot be fetched.
pub const FALLBACK_AVG_TEMPERATURE: f64 = 35.0;

/// Summary statistics attached to a heatmap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapMetadata {
    /// City name.
    #[serde(default)]
    pub city: Option<String>,
    /// Mean temperature across all features.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_temperature: Option<f64>,
    /// Remaining metadata fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// GeoJSON-like feature collection with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    /// Collection type, normally "FeatureCollection".
    #[serde(rename = "type", default = "feature_collection")]
    pub kind: String,
    /// Opaque features.
    #[serde(default)]
    pub features: Vec<Value>,
    /// Summary statistics.
    #[serde(default)]
    pub metadata: HeatmapMetadata,
}

fn feature_collection() -> String {
    "FeatureCollection".to_string()
}

impl HeatmapData {
    /// Empty collection shown when the service is down.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            kind: feature_collection(),
            features: Vec::new(),
            metadata: HeatmapMetadata {
                city: Some(FALLBACK_CITY.to_string()),
                avg_temperature: Some(FALLBACK_AVG_TEMPERATURE),
                extra: Map::new(),
            },
        }
    }

    /// Collection with no features and no metadata.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            kind: feature_collection(),
            features: Vec::new(),
            metadata: HeatmapMetadata::default(),
        }
    }

    /// Mean temperature, if the service reported a usable one.
    #[must_use]
    pub fn avg_temperature(&self) -> Option<f64> {
        self.metadata.avg_temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_metadata_and_keeps_extras() {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"temperature": 39.1}}],
            "metadata": {"city": "Pune", "avg_temperature": 37.4, "total_points": 225}
        });

        let data: HeatmapData = serde_json::from_value(payload).unwrap();
        assert_eq!(data.features.len(), 1);
        assert_eq!(data.avg_temperature(), Some(37.4));
        assert_eq!(data.metadata.extra["total_points"], json!(225));
    }

    #[test]
    fn missing_metadata_is_tolerated() {
        let data: HeatmapData = serde_json::from_value(json!({"features": []})).unwrap();
        assert_eq!(data.kind, "FeatureCollection");
        assert_eq!(data.avg_temperature(), None);
    }

    #[test]
    fn fallback_reports_default_city() {
        let data = HeatmapData::fallback();
        assert!(data.features.is_empty());
        assert_eq!(data.metadata.city.as_deref(), Some("Pune"));
        assert_eq!(data.avg_temperature(), Some(35.0));
    }
}
