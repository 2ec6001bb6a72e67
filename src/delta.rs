//! Human-readable change indicators between two metrics snapshots.
//!
//! Temperature is reported as `previous - current` with the sign flipped, so a
//! cooler city shows a negative change. Energy, CO2 and health are reported as
//! `current - previous`, where growth is the good direction.
//!
//! Numbers are rounded like JavaScript's `toFixed`: an exact half rounds away
//! from zero, where `{:.N}` would round it to even.

use serde::Serialize;

use crate::config::DEFAULT_INITIAL_BASELINE;
use crate::metrics::{ImpactMetrics, DEFAULT_HEALTH_SCORE};

const SUFFIX: &str = "vs last simulation";

/// Change strings for the four headline cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaStrings {
    /// Average temperature change.
    pub temperature: String,
    /// Energy saving change.
    pub energy: String,
    /// CO2 reduction change.
    pub co2: String,
    /// Health score change.
    pub health: String,
}

/// Headline values and trend flags for the four cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadlineValues {
    /// e.g. "34.2°C".
    pub temperature: String,
    /// e.g. "12.3 MWh".
    pub energy: String,
    /// e.g. "450 kg".
    pub co2: String,
    /// e.g. "7.5/10".
    pub health: String,
    /// Temperature reduced versus baseline.
    pub temperature_trending_up: bool,
    /// Any energy saved.
    pub energy_trending_up: bool,
    /// Any CO2 avoided.
    pub co2_trending_up: bool,
    /// Health index above 7.
    pub health_trending_up: bool,
}

/// Computes change strings between `current` and `previous`.
///
/// With no previous snapshot every card shows its placeholder text.
#[must_use]
pub fn delta(current: &ImpactMetrics, previous: Option<&ImpactMetrics>) -> DeltaStrings {
    let Some(prev) = previous else {
        return DeltaStrings {
            temperature: "No change".to_string(),
            energy: "vs baseline".to_string(),
            co2: "Estimated".to_string(),
            health: "Health index".to_string(),
        };
    };

    let cur = sanitize(current);
    let prev = sanitize(prev);

    DeltaStrings {
        temperature: temperature_change(prev.average_temperature - cur.average_temperature),
        energy: signed_change(cur.energy_saving - prev.energy_saving, 1, " MWh"),
        co2: signed_change(cur.co2_reduction - prev.co2_reduction, 0, " kg"),
        health: signed_change(cur.health_score - prev.health_score, 1, ""),
    }
}

/// Formats the headline value of each card.
#[must_use]
pub fn format_value(metrics: &ImpactMetrics) -> HeadlineValues {
    let m = sanitize(metrics);
    HeadlineValues {
        temperature: format!("{}°C", to_fixed(m.average_temperature, 1)),
        energy: format!("{} MWh", to_fixed(m.energy_saving, 1)),
        co2: format!("{} kg", to_fixed(m.co2_reduction, 0)),
        health: format!("{}/10", to_fixed(m.health_score, 1)),
        temperature_trending_up: m.temperature_reduction > 0.0,
        energy_trending_up: m.energy_saving > 0.0,
        co2_trending_up: m.co2_reduction > 0.0,
        health_trending_up: m.health_score > 7.0,
    }
}

// A cooling of `cooled` degrees reads as "-x.x°C".
fn temperature_change(cooled: f64) -> String {
    if cooled > 0.0 {
        format!("-{}°C {SUFFIX}", to_fixed(cooled, 1))
    } else if cooled < 0.0 {
        format!("+{}°C {SUFFIX}", to_fixed(-cooled, 1))
    } else {
        "No change".to_string()
    }
}

fn signed_change(change: f64, decimals: usize, unit: &str) -> String {
    if change > 0.0 {
        format!("+{}{unit} {SUFFIX}", to_fixed(change, decimals))
    } else if change < 0.0 {
        format!("-{}{unit} {SUFFIX}", to_fixed(-change, decimals))
    } else {
        SUFFIX.to_string()
    }
}

/// Formats `value` with `decimals` fraction digits, rounding an exact half
/// away from zero.
fn to_fixed(value: f64, decimals: usize) -> String {
    if value < 0.0 {
        return format!("-{}", to_fixed(-value, decimals));
    }
    // `{:.1100}` prints the exact binary value, so a tie is visible as a
    // trailing "5" followed only by zeros.
    let exact = format!("{value:.1100}");
    let tail = exact
        .split_once('.')
        .map_or("", |(_, frac)| &frac[decimals.min(frac.len())..]);
    let is_tie = tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0');
    if is_tie {
        let scale = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
        let up = (value * scale).floor() + 1.0;
        format!("{:.decimals$}", up / scale)
    } else {
        format!("{value:.decimals$}")
    }
}

fn sanitize(m: &ImpactMetrics) -> ImpactMetrics {
    let safe = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
    ImpactMetrics {
        average_temperature: safe(m.average_temperature, DEFAULT_INITIAL_BASELINE),
        temperature_reduction: safe(m.temperature_reduction, 0.0),
        energy_saving: safe(m.energy_saving, 0.0),
        co2_reduction: safe(m.co2_reduction, 0.0),
        health_score: safe(m.health_score, DEFAULT_HEALTH_SCORE),
    }
}
