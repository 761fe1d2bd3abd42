//! Conflict zones (restricted volumes) and predicted incursions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::models::Position;
use crate::risk::Severity;
use crate::trajectory::PredictedTrajectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Warzone,
    Military,
    Restricted,
    Temporary,
    Emergency,
}

impl ZoneKind {
    pub fn default_severity(self) -> Severity {
        match self {
            ZoneKind::Warzone | ZoneKind::Emergency => Severity::Critical,
            ZoneKind::Military => Severity::High,
            ZoneKind::Restricted | ZoneKind::Temporary => Severity::Medium,
        }
    }
}

/// A polygonal airspace volume aircraft should not enter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictZone {
    pub id: String,
    pub name: String,
    pub kind: ZoneKind,
    /// Polygon vertices as [lat, lon] pairs (closed ring - first == last)
    pub polygon: Vec<[f64; 2]>,
    #[serde(default)]
    pub floor_ft: f64,
    #[serde(default = "default_ceiling_ft")]
    pub ceiling_ft: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Overrides the kind's default severity
    #[serde(default)]
    pub severity: Option<Severity>,
}

fn default_ceiling_ft() -> f64 {
    60_000.0
}

fn default_active() -> bool {
    true
}

impl ConflictZone {
    pub fn severity(&self) -> Severity {
        self.severity.unwrap_or_else(|| self.kind.default_severity())
    }

    /// Point-in-volume test. Uses ray casting on the polygon.
    pub fn contains(&self, position: &Position) -> bool {
        if position.altitude_ft < self.floor_ft || position.altitude_ft > self.ceiling_ft {
            return false;
        }

        let n = self.polygon.len();
        if n < 3 {
            return false;
        }

        let (lat, lon) = (position.lat, position.lon);
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [yi, xi] = self.polygon[i];
            let [yj, xj] = self.polygon[j];
            if ((yi > lat) != (yj > lat)) && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.polygon.len() < 3 {
            errors.push(format!("zone {}: polygon must have at least 3 vertices", self.id));
        }
        if let (Some(first), Some(last)) = (self.polygon.first(), self.polygon.last()) {
            if self.polygon.len() >= 3
                && ((first[0] - last[0]).abs() > 1e-4 || (first[1] - last[1]).abs() > 1e-4)
            {
                errors.push(format!("zone {}: polygon must be closed", self.id));
            }
        }
        if self
            .polygon
            .iter()
            .any(|[lat, lon]| !(-90.0..=90.0).contains(lat) || !(-180.0..=180.0).contains(lon))
        {
            errors.push(format!("zone {}: vertex out of range", self.id));
        }
        if self.floor_ft >= self.ceiling_ft {
            errors.push(format!(
                "zone {}: floor ({}) must be below ceiling ({})",
                self.id, self.floor_ft, self.ceiling_ft
            ));
        }
        errors
    }
}

/// Lookup of zones containing a position.
pub trait ZoneChecker: Send + Sync {
    /// Active zones whose volume contains `position`.
    fn zones_containing(&self, position: &Position) -> Vec<&ConflictZone>;

    fn zones(&self) -> &[ConflictZone];
}

/// In-memory zone list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneSet {
    zones: Vec<ConflictZone>,
}

impl ZoneSet {
    pub fn from_zones(zones: Vec<ConflictZone>) -> Result<Self, ConfigError> {
        let errors: Vec<String> = zones.iter().flat_map(ConflictZone::validate).collect();
        if errors.is_empty() {
            Ok(Self { zones })
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    /// Parse a JSON array of zones.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let zones: Vec<ConflictZone> = serde_json::from_str(json)?;
        Self::from_zones(zones)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl ZoneChecker for ZoneSet {
    fn zones_containing(&self, position: &Position) -> Vec<&ConflictZone> {
        self.zones
            .iter()
            .filter(|zone| zone.active && zone.contains(position))
            .collect()
    }

    fn zones(&self) -> &[ConflictZone] {
        &self.zones
    }
}

/// Predicted entry of one aircraft into one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneIncursion {
    pub aircraft_id: String,
    pub zone_id: String,
    pub zone_name: String,
    pub kind: ZoneKind,
    pub severity: Severity,
    pub time_to_entry_s: f64,
    pub already_inside: bool,
    pub entry_position: Position,
}

/// First sample of the trajectory inside each active zone.
pub fn find_incursions(checker: &dyn ZoneChecker, trajectory: &PredictedTrajectory<'_>) -> Vec<ZoneIncursion> {
    let mut first_entry: BTreeMap<&str, ZoneIncursion> = BTreeMap::new();

    for sample in &trajectory.samples {
        for zone in checker.zones_containing(&sample.position) {
            first_entry.entry(zone.id.as_str()).or_insert_with(|| ZoneIncursion {
                aircraft_id: trajectory.aircraft_id().to_string(),
                zone_id: zone.id.clone(),
                zone_name: zone.name.clone(),
                kind: zone.kind,
                severity: zone.severity(),
                time_to_entry_s: sample.t_s,
                already_inside: sample.t_s == 0.0,
                entry_position: sample.position,
            });
        }
    }

    let mut incursions: Vec<ZoneIncursion> = first_entry.into_values().collect();
    incursions.sort_by(|a, b| {
        a.time_to_entry_s
            .total_cmp(&b.time_to_entry_s)
            .then_with(|| a.zone_id.cmp(&b.zone_id))
    });
    incursions
}
