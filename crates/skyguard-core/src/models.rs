//! Core data models for the conflict detection engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in airspace: degrees latitude/longitude, altitude in feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
}

/// Ordinal priority of an aircraft. The lower tier gives way.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
    #[default]
    Normal,
    Priority,
    Emergency,
}

/// Kinematic snapshot of one aircraft at an observation time.
///
/// Values are never mutated in place; a new detection cycle receives a
/// new set of states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicState {
    pub aircraft_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    /// Ground speed in knots
    pub ground_speed_kt: f64,
    /// Track over ground, degrees clockwise from north
    pub heading_deg: f64,
    /// Feet per minute, positive when climbing
    #[serde(default)]
    pub vertical_rate_fpm: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub priority: PriorityTier,
}

impl KinematicState {
    /// Create a stationary state with only the required position fields.
    pub fn new(
        aircraft_id: impl Into<String>,
        lat: f64,
        lon: f64,
        altitude_ft: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            lat,
            lon,
            altitude_ft,
            ground_speed_kt: 0.0,
            heading_deg: 0.0,
            vertical_rate_fpm: 0.0,
            timestamp,
            priority: PriorityTier::Normal,
        }
    }

    /// Set heading, ground speed and vertical rate.
    pub fn with_velocity(mut self, heading_deg: f64, ground_speed_kt: f64, vertical_rate_fpm: f64) -> Self {
        self.heading_deg = heading_deg;
        self.ground_speed_kt = ground_speed_kt;
        self.vertical_rate_fpm = vertical_rate_fpm;
        self
    }

    pub fn with_priority(mut self, priority: PriorityTier) -> Self {
        self.priority = priority;
        self
    }

    pub fn position(&self) -> Position {
        Position {
            lat: self.lat,
            lon: self.lon,
            altitude_ft: self.altitude_ft,
        }
    }
}

/// Aircraft record as delivered by a data feed.
///
/// Kinematic fields are optional because live feeds routinely omit them;
/// ingestion turns complete records into [`KinematicState`] values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftReport {
    pub aircraft_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub altitude_ft: Option<f64>,
    #[serde(default)]
    pub ground_speed_kt: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub vertical_rate_fpm: Option<f64>,
    /// Observation time; the snapshot epoch when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<PriorityTier>,
}

impl From<&KinematicState> for AircraftReport {
    fn from(state: &KinematicState) -> Self {
        Self {
            aircraft_id: state.aircraft_id.clone(),
            lat: Some(state.lat),
            lon: Some(state.lon),
            altitude_ft: Some(state.altitude_ft),
            ground_speed_kt: Some(state.ground_speed_kt),
            heading_deg: Some(state.heading_deg),
            vertical_rate_fpm: Some(state.vertical_rate_fpm),
            timestamp: Some(state.timestamp),
            priority: Some(state.priority),
        }
    }
}
