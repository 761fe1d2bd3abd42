//! Detected conflict records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::Position;
use crate::risk::Severity;
use crate::separation::{AirspaceClass, SeparationMinima};

/// Predicted loss of separation between two aircraft.
///
/// `aircraft_1` always sorts before `aircraft_2` so each unordered pair has
/// exactly one record per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub aircraft_1: String,
    pub aircraft_2: String,
    pub probability: f64,
    pub severity: Severity,
    pub confidence: f64,
    /// Seconds until closest approach, within `[0, horizon]`
    pub time_to_closest_approach_s: f64,
    pub min_horizontal_separation_nm: f64,
    pub min_vertical_separation_ft: f64,
    pub current_horizontal_separation_nm: f64,
    pub current_vertical_separation_ft: f64,
    pub relative_speed_kt: f64,
    pub airspace: AirspaceClass,
    pub minima: SeparationMinima,
    /// Both minima are predicted to be infringed at closest approach
    pub minima_violated: bool,
    /// Midpoint of the pair at closest approach
    pub closest_approach: Position,
    pub detected_at: DateTime<Utc>,
}

impl Conflict {
    pub fn involves(&self, aircraft_id: &str) -> bool {
        self.aircraft_1 == aircraft_id || self.aircraft_2 == aircraft_id
    }

    /// The other aircraft of the pair, if `aircraft_id` is part of it.
    pub fn other(&self, aircraft_id: &str) -> Option<&str> {
        if self.aircraft_1 == aircraft_id {
            Some(&self.aircraft_2)
        } else if self.aircraft_2 == aircraft_id {
            Some(&self.aircraft_1)
        } else {
            None
        }
    }

    /// Report ordering: highest probability first, then soonest, then ids.
    pub fn report_order(&self, other: &Conflict) -> Ordering {
        other
            .probability
            .total_cmp(&self.probability)
            .then_with(|| {
                self.time_to_closest_approach_s
                    .total_cmp(&other.time_to_closest_approach_s)
            })
            .then_with(|| self.aircraft_1.cmp(&other.aircraft_1))
            .then_with(|| self.aircraft_2.cmp(&other.aircraft_2))
    }
}

/// Sort into report order and keep at most `limit` entries.
pub fn rank_conflicts(conflicts: &mut Vec<Conflict>, limit: usize) {
    conflicts.sort_by(|a, b| a.report_order(b));
    conflicts.truncate(limit);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(a: &str, b: &str, probability: f64, time_s: f64) -> Conflict {
        Conflict {
            aircraft_1: a.to_string(),
            aircraft_2: b.to_string(),
            probability,
            severity: Severity::Medium,
            confidence: (probability + 0.1).min(0.95),
            time_to_closest_approach_s: time_s,
            min_horizontal_separation_nm: 2.0,
            min_vertical_separation_ft: 0.0,
            current_horizontal_separation_nm: 20.0,
            current_vertical_separation_ft: 0.0,
            relative_speed_kt: 400.0,
            airspace: AirspaceClass::EnRoute,
            minima: SeparationMinima {
                horizontal_nm: 5.0,
                vertical_ft: 1000.0,
            },
            minima_violated: true,
            closest_approach: Position {
                lat: 0.0,
                lon: 0.0,
                altitude_ft: 35_000.0,
            },
            detected_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn ranks_by_probability_then_time() {
        let mut conflicts = vec![
            conflict("A", "B", 0.4, 100.0),
            conflict("C", "D", 0.9, 500.0),
            conflict("E", "F", 0.4, 50.0),
        ];
        rank_conflicts(&mut conflicts, 2);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].aircraft_1, "C");
        assert_eq!(conflicts[1].aircraft_1, "E");
    }

    #[test]
    fn other_side_of_pair() {
        let c = conflict("A", "B", 0.5, 10.0);
        assert!(c.involves("B"));
        assert_eq!(c.other("A"), Some("B"));
        assert_eq!(c.other("B"), Some("A"));
        assert_eq!(c.other("Z"), None);
    }
}
