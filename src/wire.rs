//! Lenient field decoding for the analytics service payloads.
//!
//! The service contract is external and not guaranteed complete. Numeric
//! fields decode to `None` when absent, `null`, non-numeric, or non-finite,
//! and callers substitute their own defaults.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decodes an optional float, mapping anything unusable to `None`.
///
/// Numeric strings are accepted since some upstream services quote numbers.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

/// Decodes an optional non-negative integer, mapping anything unusable to `None`.
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
        .map(|v| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = v.round() as u32;
            n
        }))
}

fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_f64")]
        x: Option<f64>,
        #[serde(default, deserialize_with = "lenient_u32")]
        n: Option<u32>,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_and_null_are_none() {
        let p = sample("{}");
        assert_eq!(p.x, None);
        assert_eq!(p.n, None);

        let p = sample(r#"{"x": null, "n": null}"#);
        assert_eq!(p.x, None);
        assert_eq!(p.n, None);
    }

    #[test]
    fn wrong_types_are_none() {
        let p = sample(r#"{"x": [1], "n": {"a": 1}}"#);
        assert_eq!(p.x, None);
        assert_eq!(p.n, None);
    }

    #[test]
    fn numbers_and_numeric_strings_decode() {
        let p = sample(r#"{"x": "34.5", "n": 20}"#);
        assert_eq!(p.x, Some(34.5));
        assert_eq!(p.n, Some(20));
    }

    #[test]
    fn negative_count_is_none() {
        let p = sample(r#"{"n": -3}"#);
        assert_eq!(p.n, None);
    }
}
