//! Health precautions derived from current climate conditions.

use serde::{Deserialize, Serialize};

/// How urgent a precaution is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Active alert.
    High,
    /// Advisory.
    Medium,
    /// Informational.
    Low,
}

/// A read-only health precaution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPrecaution {
    /// Service-assigned id.
    pub id: i64,
    /// Short title, e.g. "Heat Advisory".
    pub title: String,
    /// Guidance text.
    pub message: String,
    /// Urgency.
    pub severity: Severity,
}

/// Number of precautions that count as active alerts (`high` severity).
#[must_use]
pub fn active_alerts(precautions: &[HealthPrecaution]) -> usize {
    precautions
        .iter()
        .filter(|p| p.severity == Severity::High)
        .count()
}
