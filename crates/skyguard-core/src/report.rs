//! Output of one detection cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::advisory::{Advisory, AvoidanceAction};
use crate::conflict::Conflict;
use crate::error::IngestError;
use crate::summary::ConflictSummary;
use crate::zones::ZoneIncursion;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub aircraft_evaluated: usize,
    pub pairs_evaluated: usize,
    /// Pairs skipped because their geometry could not be solved
    pub pairs_failed: usize,
    /// Conflicts found before truncation to the report limit
    pub conflicts_found: usize,
    pub elapsed_ms: f64,
}

/// Everything one cycle produced. Replaced wholesale by the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub sequence: u64,
    pub epoch: DateTime<Utc>,
    /// Sorted by descending probability, then ascending time to CPA
    pub conflicts: Vec<Conflict>,
    /// One per conflict, same order
    pub advisories: Vec<Advisory>,
    pub incursions: Vec<ZoneIncursion>,
    pub rejections: Vec<IngestError>,
    pub summary: ConflictSummary,
    pub stats: CycleStats,
}

impl CycleReport {
    /// Actions addressed to one aircraft, in report order.
    pub fn actions_for(&self, aircraft_id: &str) -> Vec<&AvoidanceAction> {
        self.advisories
            .iter()
            .flat_map(|advisory| advisory.actions.iter())
            .filter(|action| action.aircraft_id == aircraft_id)
            .collect()
    }

    /// Flat action list keyed by aircraft identifier.
    pub fn actions_by_aircraft(&self) -> BTreeMap<String, Vec<AvoidanceAction>> {
        let mut by_aircraft: BTreeMap<String, Vec<AvoidanceAction>> = BTreeMap::new();
        for action in self.advisories.iter().flat_map(|a| a.actions.iter()) {
            by_aircraft
                .entry(action.aircraft_id.clone())
                .or_default()
                .push(action.clone());
        }
        by_aircraft
    }

    pub fn conflicts_for(&self, aircraft_id: &str) -> Vec<&Conflict> {
        self.conflicts.iter().filter(|c| c.involves(aircraft_id)).collect()
    }
}
