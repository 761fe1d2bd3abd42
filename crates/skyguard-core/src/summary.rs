//! Aggregate statistics over one cycle's conflicts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::conflict::Conflict;
use crate::risk::Severity;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub mean_time_to_closest_approach_s: Option<f64>,
    pub min_horizontal_separation_nm: Option<f64>,
    pub min_vertical_separation_ft: Option<f64>,
    pub aircraft_involved: usize,
}

impl ConflictSummary {
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        if conflicts.is_empty() {
            return Self::default();
        }

        let mut counts = SeverityCounts::default();
        let mut aircraft = BTreeSet::new();
        let mut time_sum = 0.0;
        let mut min_h = f64::INFINITY;
        let mut min_v = f64::INFINITY;

        for conflict in conflicts {
            match conflict.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
            }
            aircraft.insert(conflict.aircraft_1.as_str());
            aircraft.insert(conflict.aircraft_2.as_str());
            time_sum += conflict.time_to_closest_approach_s;
            min_h = min_h.min(conflict.min_horizontal_separation_nm);
            min_v = min_v.min(conflict.min_vertical_separation_ft);
        }

        Self {
            total: conflicts.len(),
            by_severity: counts,
            mean_time_to_closest_approach_s: Some(time_sum / conflicts.len() as f64),
            min_horizontal_separation_nm: Some(min_h),
            min_vertical_separation_ft: Some(min_v),
            aircraft_involved: aircraft.len(),
        }
    }
}
