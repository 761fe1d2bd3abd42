//! In-memory state store using DashMap.
//!
//! Holds the latest accepted snapshot, the latest published cycle report
//! and per-aircraft advisories. Submitting a snapshot cancels whatever
//! cycle is still running on the previous one.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use skyguard_core::{
    AircraftReport, AvoidanceAction, ConflictEngine, Conflict, ConflictZone, CycleReport,
    IngestError, Snapshot, ZoneChecker,
};

use crate::config::Config;

const BROADCAST_CAPACITY: usize = 64;

/// Serialized cycle report fanned out to WebSocket subscribers.
#[derive(Debug, Clone)]
pub struct ReportEvent {
    pub sequence: u64,
    /// Aircraft named in a conflict, advisory or incursion
    pub aircraft: Arc<BTreeSet<String>>,
    pub payload: Arc<str>,
}

impl ReportEvent {
    pub fn involves(&self, aircraft_id: &str) -> bool {
        self.aircraft.contains(aircraft_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub sequence: u64,
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<IngestError>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("snapshot has {count} aircraft, limit is {limit}")]
    TooManyAircraft { count: usize, limit: usize },
}

/// Application state - thread-safe store for snapshots and cycle output.
pub struct AppState {
    config: Config,
    engine: Arc<ConflictEngine>,
    sequence: AtomicU64,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    in_flight: Mutex<Option<CancellationToken>>,
    latest_report: RwLock<Option<Arc<CycleReport>>>,
    /// Actions keyed by aircraft identifier, from the latest report
    advisories: DashMap<String, Vec<AvoidanceAction>>,
    pub tx: broadcast::Sender<ReportEvent>,
}

impl AppState {
    pub fn new(config: Config, engine: ConflictEngine) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            config,
            engine: Arc::new(engine),
            sequence: AtomicU64::new(0),
            snapshot_tx,
            in_flight: Mutex::new(None),
            latest_report: RwLock::new(None),
            advisories: DashMap::new(),
            tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> Arc<ConflictEngine> {
        self.engine.clone()
    }

    /// Sequence number of the most recently accepted snapshot.
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Ingest a snapshot and hand it to the detection loop.
    ///
    /// Any cycle still running on an older snapshot is cancelled.
    pub fn submit_snapshot(
        &self,
        epoch: DateTime<Utc>,
        reports: Vec<AircraftReport>,
    ) -> Result<SubmitOutcome, SubmitError> {
        if reports.len() > self.config.max_aircraft {
            return Err(SubmitError::TooManyAircraft {
                count: reports.len(),
                limit: self.config.max_aircraft,
            });
        }

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Snapshot::ingest(
            sequence,
            epoch,
            reports,
            self.engine.config().max_state_age_s,
        );

        let outcome = SubmitOutcome {
            sequence,
            accepted: snapshot.len(),
            rejected: snapshot.rejections().len(),
            rejections: snapshot.rejections().to_vec(),
        };

        // Overlapping submissions may finish ingesting out of order; the
        // held snapshot only ever moves forward in sequence.
        let snapshot = Arc::new(snapshot);
        let published = self.snapshot_tx.send_if_modified(|held| {
            let newer = held.as_ref().map_or(true, |s| s.sequence() < sequence);
            if newer {
                *held = Some(snapshot.clone());
            }
            newer
        });

        if published {
            if let Ok(mut in_flight) = self.in_flight.lock() {
                if let Some(token) = in_flight.take() {
                    token.cancel();
                }
            }
        }

        tracing::debug!(
            sequence,
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            published,
            "Snapshot submitted"
        );
        Ok(outcome)
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshot_tx.subscribe()
    }

    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Register the cycle about to run on `sequence`.
    ///
    /// The returned token is already cancelled if a newer snapshot exists.
    pub fn begin_cycle(&self, sequence: u64) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut in_flight) = self.in_flight.lock() {
            if let Some(previous) = in_flight.replace(token.clone()) {
                previous.cancel();
            }
        }
        if sequence != self.current_sequence() {
            token.cancel();
        }
        token
    }

    /// Store and broadcast a finished report unless it was superseded.
    pub fn publish_report(&self, report: CycleReport) -> bool {
        if report.sequence != self.current_sequence() {
            tracing::debug!(sequence = report.sequence, "Dropping superseded report");
            return false;
        }

        let payload = match serde_json::to_string(&report) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize cycle report: {}", e);
                return false;
            }
        };

        let mut aircraft: BTreeSet<String> = BTreeSet::new();
        for conflict in &report.conflicts {
            aircraft.insert(conflict.aircraft_1.clone());
            aircraft.insert(conflict.aircraft_2.clone());
        }
        for incursion in &report.incursions {
            aircraft.insert(incursion.aircraft_id.clone());
        }

        let actions = report.actions_by_aircraft();
        let sequence = report.sequence;
        if let Ok(mut latest) = self.latest_report.write() {
            *latest = Some(Arc::new(report));
        }

        // Updated in place, never cleared.
        self.advisories
            .retain(|aircraft_id, _| actions.contains_key(aircraft_id));
        for (aircraft_id, aircraft_actions) in actions {
            self.advisories.insert(aircraft_id, aircraft_actions);
        }

        // No subscribers is fine.
        let _ = self.tx.send(ReportEvent {
            sequence,
            aircraft: Arc::new(aircraft),
            payload: Arc::from(payload),
        });
        true
    }

    pub fn latest_report(&self) -> Option<Arc<CycleReport>> {
        self.latest_report.read().ok().and_then(|r| r.clone())
    }

    /// Conflicts of the latest report, in report order.
    pub fn get_conflicts(&self) -> Vec<Conflict> {
        self.latest_report()
            .map(|r| r.conflicts.clone())
            .unwrap_or_default()
    }

    pub fn get_advisories(&self) -> Vec<(String, Vec<AvoidanceAction>)> {
        let mut all: Vec<(String, Vec<AvoidanceAction>)> = self
            .advisories
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn advisories_for(&self, aircraft_id: &str) -> Vec<AvoidanceAction> {
        self.advisories
            .get(aircraft_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn zones(&self) -> Vec<ConflictZone> {
        self.engine
            .zones()
            .map(|zones| zones.zones().to_vec())
            .unwrap_or_default()
    }
}
