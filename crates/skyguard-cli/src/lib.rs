//! SkyGuard CLI - command line tools for the conflict detection engine.
//!
//! Binaries:
//! - detect: run one detection cycle offline over a snapshot file
//! - send_snapshot: submit a snapshot file to a running server

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use skyguard_core::{AircraftReport, ConflictEngine, CycleReport, EngineConfig, ZoneSet};

/// Snapshot file contents: either `{ "epoch": ..., "aircraft": [...] }` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SnapshotFile {
    Document {
        #[serde(default)]
        epoch: Option<DateTime<Utc>>,
        aircraft: Vec<AircraftReport>,
    },
    Aircraft(Vec<AircraftReport>),
}

impl SnapshotFile {
    pub fn epoch(&self) -> Option<DateTime<Utc>> {
        match self {
            SnapshotFile::Document { epoch, .. } => *epoch,
            SnapshotFile::Aircraft(_) => None,
        }
    }

    pub fn into_aircraft(self) -> Vec<AircraftReport> {
        match self {
            SnapshotFile::Document { aircraft, .. } | SnapshotFile::Aircraft(aircraft) => aircraft,
        }
    }
}

pub fn parse_snapshot(json: &str) -> Result<SnapshotFile> {
    serde_json::from_str(json).context("parsing snapshot")
}

pub fn load_snapshot(path: &Path) -> Result<SnapshotFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    parse_snapshot(&json)
}

/// Build an engine from optional config and zone files.
pub fn load_engine(config: Option<&Path>, zones: Option<&Path>) -> Result<ConflictEngine> {
    let engine_config = match config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading engine config {}", path.display()))?;
            EngineConfig::from_json(&json)?
        }
        None => EngineConfig::default(),
    };

    let engine = ConflictEngine::new(engine_config)?;
    match zones {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading zones {}", path.display()))?;
            Ok(engine.with_zones(Arc::new(ZoneSet::from_json(&json)?)))
        }
        None => Ok(engine),
    }
}

/// Plain-text rendering of a cycle report.
pub fn render_report(report: &CycleReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cycle {} @ {} - {} aircraft, {} pairs, {} conflict(s)",
        report.sequence,
        report.epoch.to_rfc3339(),
        report.stats.aircraft_evaluated,
        report.stats.pairs_evaluated,
        report.conflicts.len()
    );

    if !report.conflicts.is_empty() {
        let _ = writeln!(
            out,
            "\n{:<10} {:<10} {:<9} {:>5} {:>8} {:>9} {:>8}",
            "AIRCRAFT", "TRAFFIC", "SEVERITY", "P", "CPA(s)", "H(nm)", "V(ft)"
        );
        for c in &report.conflicts {
            let _ = writeln!(
                out,
                "{:<10} {:<10} {:<9} {:>5.2} {:>8.0} {:>9.2} {:>8.0}",
                c.aircraft_1,
                c.aircraft_2,
                c.severity.to_string(),
                c.probability,
                c.time_to_closest_approach_s,
                c.min_horizontal_separation_nm,
                c.min_vertical_separation_ft
            );
        }
    }

    for advisory in &report.advisories {
        let _ = writeln!(out, "\n{} / {}:", advisory.aircraft_1, advisory.aircraft_2);
        if let Some(notice) = advisory.notice {
            let _ = writeln!(out, "  ! {:?}", notice);
        }
        for action in &advisory.actions {
            let _ = writeln!(out, "  [{:?}] {}: {}", action.urgency, action.aircraft_id, action.rationale);
        }
    }

    for incursion in &report.incursions {
        let _ = writeln!(
            out,
            "\nZone {} ({}): {} {} in {:.0}s",
            incursion.zone_id,
            incursion.severity,
            incursion.aircraft_id,
            if incursion.already_inside { "inside" } else { "enters" },
            incursion.time_to_entry_s
        );
    }

    for rejection in &report.rejections {
        let _ = writeln!(out, "\nDropped: {}", rejection);
    }

    out
}
