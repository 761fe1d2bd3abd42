//! Snapshot ingestion at the data-feed boundary.
//!
//! Feed records are validated, de-duplicated and aligned to the snapshot
//! epoch before anything reaches geometry code. Bad records are dropped
//! with a diagnostic; they never fail the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::models::{AircraftReport, KinematicState};
use crate::spatial::normalize_heading;
use crate::trajectory::extrapolate;

const MIN_ALTITUDE_FT: f64 = -2_000.0;
const MAX_ALTITUDE_FT: f64 = 100_000.0;
const MAX_GROUND_SPEED_KT: f64 = 2_500.0;
const MAX_VERTICAL_RATE_FPM: f64 = 30_000.0;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

fn next_serial() -> u64 {
    NEXT_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// Validated, immutable set of aircraft states for one detection cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Process-unique identity; two ingests never share one
    #[serde(skip, default = "next_serial")]
    serial: u64,
    sequence: u64,
    epoch: DateTime<Utc>,
    states: Vec<KinematicState>,
    rejections: Vec<IngestError>,
}

impl Snapshot {
    /// Validate feed records and align accepted ones to `epoch`.
    pub fn ingest(
        sequence: u64,
        epoch: DateTime<Utc>,
        reports: Vec<AircraftReport>,
        max_state_age_s: f64,
    ) -> Self {
        let mut states = Vec::with_capacity(reports.len());
        let mut rejections = Vec::new();
        let mut seen = HashSet::with_capacity(reports.len());

        for report in reports {
            match validate(report, epoch, max_state_age_s, &seen) {
                Ok(state) => {
                    seen.insert(state.aircraft_id.clone());
                    states.push(state);
                }
                Err(err) => {
                    warn!(sequence, aircraft_id = %err.aircraft_id(), "Dropping aircraft: {}", err);
                    rejections.push(err);
                }
            }
        }

        debug!(
            sequence,
            accepted = states.len(),
            rejected = rejections.len(),
            "Snapshot ingested"
        );

        Self {
            serial: next_serial(),
            sequence,
            epoch,
            states,
            rejections,
        }
    }

    /// Build a snapshot from already-typed states, applying the same checks.
    pub fn from_states(
        sequence: u64,
        epoch: DateTime<Utc>,
        states: &[KinematicState],
        max_state_age_s: f64,
    ) -> Self {
        let reports = states.iter().map(AircraftReport::from).collect();
        Self::ingest(sequence, epoch, reports, max_state_age_s)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Identity of this ingest, distinct even between snapshots that share a sequence.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn states(&self) -> &[KinematicState] {
        &self.states
    }

    pub fn rejections(&self) -> &[IngestError] {
        &self.rejections
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn find(&self, aircraft_id: &str) -> Option<&KinematicState> {
        self.states.iter().find(|s| s.aircraft_id == aircraft_id)
    }

    /// Number of unordered aircraft pairs.
    pub fn pair_count(&self) -> usize {
        let n = self.states.len();
        n * n.saturating_sub(1) / 2
    }
}

fn validate(
    report: AircraftReport,
    epoch: DateTime<Utc>,
    max_state_age_s: f64,
    seen: &HashSet<String>,
) -> Result<KinematicState, IngestError> {
    let id = report.aircraft_id.trim().to_string();
    let missing = |field: &str| IngestError::MissingField {
        aircraft_id: id.clone(),
        field: field.to_string(),
    };

    if id.is_empty() {
        return Err(missing("aircraft_id"));
    }
    let lat = report.lat.ok_or_else(|| missing("lat"))?;
    let lon = report.lon.ok_or_else(|| missing("lon"))?;
    let altitude_ft = report.altitude_ft.ok_or_else(|| missing("altitude_ft"))?;
    let ground_speed_kt = report.ground_speed_kt.ok_or_else(|| missing("ground_speed_kt"))?;
    let heading_deg = report.heading_deg.ok_or_else(|| missing("heading_deg"))?;
    let vertical_rate_fpm = report.vertical_rate_fpm.unwrap_or(0.0);

    check_range(&id, "lat", lat, -90.0, 90.0)?;
    check_range(&id, "lon", lon, -180.0, 180.0)?;
    check_range(&id, "altitude_ft", altitude_ft, MIN_ALTITUDE_FT, MAX_ALTITUDE_FT)?;
    check_range(&id, "ground_speed_kt", ground_speed_kt, 0.0, MAX_GROUND_SPEED_KT)?;
    check_range(&id, "heading_deg", heading_deg, f64::MIN, f64::MAX)?;
    check_range(
        &id,
        "vertical_rate_fpm",
        vertical_rate_fpm,
        -MAX_VERTICAL_RATE_FPM,
        MAX_VERTICAL_RATE_FPM,
    )?;

    if seen.contains(&id) {
        return Err(IngestError::Duplicate { aircraft_id: id });
    }

    let observed_at = report.timestamp.unwrap_or(epoch);
    let age_s = (epoch - observed_at).num_milliseconds() as f64 / 1000.0;
    if age_s > max_state_age_s {
        return Err(IngestError::Stale {
            aircraft_id: id,
            age_s,
            limit_s: max_state_age_s,
        });
    }

    let mut state = KinematicState::new(id, lat, lon, altitude_ft, epoch)
        .with_velocity(normalize_heading(heading_deg), ground_speed_kt, vertical_rate_fpm)
        .with_priority(report.priority.unwrap_or_default());

    // Future-dated observations are kept where they are.
    if age_s > 0.0 {
        let aligned = extrapolate(&state, age_s);
        state.lat = aligned.lat;
        state.lon = aligned.lon;
        state.altitude_ft = aligned.altitude_ft;
    }

    Ok(state)
}

fn check_range(aircraft_id: &str, field: &str, value: f64, min: f64, max: f64) -> Result<(), IngestError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(IngestError::OutOfRange {
            aircraft_id: aircraft_id.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
    }

    fn report(id: &str) -> AircraftReport {
        AircraftReport {
            aircraft_id: id.to_string(),
            lat: Some(40.0),
            lon: Some(-74.0),
            altitude_ft: Some(12_000.0),
            ground_speed_kt: Some(250.0),
            heading_deg: Some(180.0),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_complete_reports() {
        let snapshot = Snapshot::ingest(1, epoch(), vec![report("A"), report("B")], 120.0);
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.rejections().is_empty());
        assert_eq!(snapshot.pair_count(), 1);
        assert_eq!(snapshot.find("B").map(|s| s.timestamp), Some(epoch()));
    }

    #[test]
    fn missing_heading_is_rejected() {
        let mut r = report("A");
        r.heading_deg = None;
        let snapshot = Snapshot::ingest(1, epoch(), vec![r], 120.0);
        assert!(snapshot.is_empty());
        assert_eq!(
            snapshot.rejections()[0],
            IngestError::MissingField {
                aircraft_id: "A".to_string(),
                field: "heading_deg".to_string()
            }
        );
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let mut r = report("A");
        r.lat = Some(91.0);
        let mut nan = report("B");
        nan.altitude_ft = Some(f64::NAN);
        let snapshot = Snapshot::ingest(1, epoch(), vec![r, nan, report("C")], 120.0);
        assert_eq!(snapshot.len(), 1);
        assert!(matches!(
            &snapshot.rejections()[0],
            IngestError::OutOfRange { field, .. } if field == "lat"
        ));
        assert!(matches!(
            &snapshot.rejections()[1],
            IngestError::OutOfRange { field, .. } if field == "altitude_ft"
        ));
    }

    #[test]
    fn duplicate_keeps_first_record() {
        let mut second = report("A");
        second.altitude_ft = Some(30_000.0);
        let snapshot = Snapshot::ingest(1, epoch(), vec![report("A"), second], 120.0);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.states()[0].altitude_ft, 12_000.0);
        assert!(matches!(snapshot.rejections()[0], IngestError::Duplicate { .. }));
    }

    #[test]
    fn stale_reports_are_dropped() {
        let mut r = report("A");
        r.timestamp = Some(epoch() - Duration::seconds(300));
        let snapshot = Snapshot::ingest(1, epoch(), vec![r], 120.0);
        assert!(snapshot.is_empty());
        assert!(matches!(snapshot.rejections()[0], IngestError::Stale { .. }));
    }

    #[test]
    fn older_reports_are_aligned_to_epoch() {
        let mut r = report("A");
        r.heading_deg = Some(0.0);
        r.ground_speed_kt = Some(360.0);
        r.vertical_rate_fpm = Some(600.0);
        r.timestamp = Some(epoch() - Duration::seconds(60));
        let snapshot = Snapshot::ingest(1, epoch(), vec![r], 120.0);
        let state = &snapshot.states()[0];
        // 6 nm north, 600 ft higher
        assert!((state.lat - 40.1).abs() < 1e-3);
        assert!((state.altitude_ft - 12_600.0).abs() < 1e-9);
        assert_eq!(state.timestamp, epoch());
    }

    #[test]
    fn every_ingest_gets_its_own_serial() {
        let first = Snapshot::ingest(4, epoch(), vec![report("A")], 120.0);
        let second = Snapshot::ingest(4, epoch(), vec![report("A")], 120.0);
        assert_ne!(first.serial(), second.serial());
        assert_eq!(first.clone().serial(), first.serial());
    }

    #[test]
    fn heading_is_normalised() {
        let mut r = report("A");
        r.heading_deg = Some(-90.0);
        let snapshot = Snapshot::ingest(1, epoch(), vec![r], 120.0);
        assert_eq!(snapshot.states()[0].heading_deg, 270.0);
    }
}
