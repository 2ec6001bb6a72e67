//! Mitigation interventions placed on the map.
//!
//! An `Intervention` is immutable once built. Its identity is a monotonic
//! integer derived from the creation timestamp, so two interventions created in
//! the same millisecond still receive distinct ids.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::recommendation::Recommendation;

/// Trees placed per map click.
pub const DEFAULT_TREE_COUNT: u32 = 20;

/// Square metres covered per map click for area-based interventions.
pub const DEFAULT_AREA_M2: f64 = 500.0;

/// Local temperature assumed for a freshly placed intervention.
pub const DEFAULT_BASE_TEMPERATURE: f64 = 35.0;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Unique, monotonic intervention identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterventionId(i64);

impl InterventionId {
    /// Allocates the next id: the current time in ms, bumped past the last issued id.
    #[must_use]
    pub fn next() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut prev = LAST_ID.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match LAST_ID.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(candidate),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Wraps an existing raw id.
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for InterventionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of mitigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    /// Tree planting, sized by `count`.
    Trees,
    /// Reflective roof coating, sized by `area`.
    CoolRoof,
    /// New park, sized by `area`.
    Park,
    /// Vegetated roof, sized by `area`.
    GreenRoof,
}

impl InterventionType {
    /// All variants in toolbar order.
    pub const ALL: [Self; 4] = [Self::Trees, Self::CoolRoof, Self::Park, Self::GreenRoof];

    /// True when the intervention is sized by area rather than count.
    #[must_use]
    pub const fn is_area_based(self) -> bool {
        !matches!(self, Self::Trees)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trees => "trees",
            Self::CoolRoof => "cool_roof",
            Self::Park => "park",
            Self::GreenRoof => "green_roof",
        }
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InterventionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trees" | "tree" => Ok(Self::Trees),
            "cool_roof" | "cool-roof" => Ok(Self::CoolRoof),
            "park" => Ok(Self::Park),
            "green_roof" | "green-roof" => Ok(Self::GreenRoof),
            other => Err(format!("unknown intervention type '{other}'")),
        }
    }
}

/// A point on the map. Serialized as `[lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for Location {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Location> for [f64; 2] {
    fn from(loc: Location) -> Self {
        [loc.lat, loc.lon]
    }
}

/// A proposed mitigation at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    /// Identity.
    pub id: InterventionId,
    /// Mitigation kind.
    #[serde(rename = "type")]
    pub kind: InterventionType,
    /// Where it is placed.
    pub location: Location,
    /// Number of trees.
    #[serde(default)]
    pub count: Option<u32>,
    /// Covered area in square metres.
    #[serde(default)]
    pub area: Option<f64>,
    /// Local temperature before mitigation.
    #[serde(default)]
    pub base_temperature: Option<f64>,
}

impl Intervention {
    /// A bare intervention; sizing and temperature left unset.
    #[must_use]
    pub fn new(kind: InterventionType, location: Location) -> Self {
        Self {
            id: InterventionId::next(),
            kind,
            location,
            count: None,
            area: None,
            base_temperature: None,
        }
    }

    /// An intervention placed by clicking the map with a tool selected.
    ///
    /// Trees get [`DEFAULT_TREE_COUNT`], area types get [`DEFAULT_AREA_M2`], and
    /// both start at [`DEFAULT_BASE_TEMPERATURE`].
    #[must_use]
    pub fn place(kind: InterventionType, lat: f64, lon: f64) -> Self {
        let (count, area) = if kind.is_area_based() {
            (0, DEFAULT_AREA_M2)
        } else {
            (DEFAULT_TREE_COUNT, 0.0)
        };
        Self::new(kind, Location::new(lat, lon))
            .with_count(count)
            .with_area(area)
            .with_base_temperature(DEFAULT_BASE_TEMPERATURE)
    }

    /// Copies a recommendation into a fresh intervention.
    ///
    /// The new id is independent of the recommendation id. Missing sizing
    /// becomes zero and the base temperature is [`DEFAULT_BASE_TEMPERATURE`].
    #[must_use]
    pub fn from_recommendation(rec: &Recommendation) -> Self {
        Self::new(rec.kind, Location::new(rec.location.lat, rec.location.lon))
            .with_count(rec.count.unwrap_or(0))
            .with_area(rec.area.unwrap_or(0.0))
            .with_base_temperature(DEFAULT_BASE_TEMPERATURE)
    }

    /// Sets the tree count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the covered area; negative values clamp to zero.
    #[must_use]
    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(if area.is_finite() { area.max(0.0) } else { 0.0 });
        self
    }

    /// Sets the local base temperature.
    #[must_use]
    pub fn with_base_temperature(mut self, temperature: f64) -> Self {
        self.base_temperature = temperature.is_finite().then_some(temperature);
        self
    }
}
