//! Detection cycle: pairwise closest approach, scoring, advisories.
//!
//! A cycle reads one immutable [`Snapshot`]. Pairs are split across the
//! rayon pool by row index; each worker only reads the shared states and
//! fills its own batch, and batches are merged at the end. A cycle can be
//! abandoned between rows when its [`CycleGuard`] is cancelled or its
//! budget runs out.

use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::advisory::{Advisory, ResolutionAdvisor};
use crate::config::EngineConfig;
use crate::conflict::{rank_conflicts, Conflict};
use crate::cpa::ClosestApproachSolver;
use crate::error::{ConfigError, CycleError, PairError};
use crate::ingest::Snapshot;
use crate::models::KinematicState;
use crate::report::{CycleReport, CycleStats};
use crate::risk::{RiskInputs, RiskScorer};
use crate::spatial::horizontal_distance_nm;
use crate::summary::ConflictSummary;
use crate::trajectory::{MotionVector, TrajectoryPredictor};
use crate::zones::{find_incursions, ZoneChecker, ZoneIncursion};

/// Cancellation and wall-clock budget for one cycle.
#[derive(Debug, Clone)]
pub struct CycleGuard {
    token: CancellationToken,
    started: Instant,
    budget: Option<Duration>,
}

impl CycleGuard {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            started: Instant::now(),
            budget: None,
        }
    }

    /// Never cancelled, no budget.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn check(&self, sequence: u64) -> Result<(), CycleError> {
        if self.token.is_cancelled() {
            return Err(CycleError::Superseded { sequence });
        }
        if let Some(budget) = self.budget {
            if self.started.elapsed() > budget {
                return Err(CycleError::BudgetExceeded {
                    sequence,
                    budget_ms: budget.as_millis(),
                });
            }
        }
        Ok(())
    }
}

/// Per-snapshot derived data, owned by the caller.
///
/// Keyed on the snapshot's serial, so it is rebuilt for every distinct
/// snapshot even when sequence numbers repeat.
#[derive(Debug, Clone, Default)]
pub struct CycleCache {
    serial: Option<u64>,
    sequence: Option<u64>,
    motions: Vec<MotionVector>,
}

impl CycleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&mut self, snapshot: &Snapshot) {
        if self.serial == Some(snapshot.serial()) {
            return;
        }
        self.motions = snapshot.states().iter().map(MotionVector::from_state).collect();
        self.serial = Some(snapshot.serial());
        self.sequence = Some(snapshot.sequence());
    }

    pub fn invalidate(&mut self) {
        self.serial = None;
        self.sequence = None;
        self.motions.clear();
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    fn motions(&self) -> &[MotionVector] {
        &self.motions
    }
}

#[derive(Debug, Default)]
struct PairBatch {
    conflicts: Vec<Conflict>,
    evaluated: usize,
    failed: usize,
}

impl PairBatch {
    fn merge(mut self, other: PairBatch) -> PairBatch {
        self.conflicts.extend(other.conflicts);
        self.evaluated += other.evaluated;
        self.failed += other.failed;
        self
    }
}

/// Conflict detection and resolution engine.
pub struct ConflictEngine {
    config: EngineConfig,
    predictor: TrajectoryPredictor,
    solver: ClosestApproachSolver,
    scorer: RiskScorer,
    advisor: ResolutionAdvisor,
    zones: Option<Arc<dyn ZoneChecker>>,
}

impl ConflictEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            predictor: TrajectoryPredictor::new(config.horizon_s, config.step_s),
            solver: ClosestApproachSolver::new(config.horizon_s, config.parallel_epsilon),
            scorer: RiskScorer::new(config.horizon_s, config.risk, config.thresholds),
            advisor: ResolutionAdvisor::new(config.advisory, config.max_actions_per_conflict),
            zones: None,
            config,
        })
    }

    /// Check predicted trajectories against these zones every cycle.
    pub fn with_zones(mut self, zones: Arc<dyn ZoneChecker>) -> Self {
        self.zones = Some(zones);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zones(&self) -> Option<&Arc<dyn ZoneChecker>> {
        self.zones.as_ref()
    }

    /// Soft wall-clock budget for a cycle over this snapshot.
    pub fn budget_for(&self, snapshot: &Snapshot) -> Duration {
        self.config.budget.allowance(snapshot.pair_count())
    }

    /// Run a cycle with no cancellation and no budget.
    pub fn detect(&self, snapshot: &Snapshot) -> Result<CycleReport, CycleError> {
        self.run_cycle(snapshot, &mut CycleCache::new(), &CycleGuard::unbounded())
    }

    /// Run one detection cycle over `snapshot`.
    ///
    /// Returns an error only when the guard abandons the cycle; failures of
    /// individual pairs are logged and counted in the stats.
    pub fn run_cycle(
        &self,
        snapshot: &Snapshot,
        cache: &mut CycleCache,
        guard: &CycleGuard,
    ) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let sequence = snapshot.sequence();
        guard.check(sequence)?;

        cache.prepare(snapshot);
        let states = snapshot.states();
        let motions = cache.motions();
        let detected_at = snapshot.epoch();
        let n = states.len();

        debug!(sequence, aircraft = n, pairs = snapshot.pair_count(), "Cycle started");

        let batch = (0..n)
            .into_par_iter()
            .map(|i| -> Result<PairBatch, CycleError> {
                guard.check(sequence)?;
                let mut batch = PairBatch::default();
                for j in (i + 1)..n {
                    let (a, b) = (&states[i], &states[j]);
                    if a.aircraft_id == b.aircraft_id {
                        continue;
                    }
                    batch.evaluated += 1;
                    match self.evaluate_pair(a, &motions[i], b, &motions[j], detected_at) {
                        Ok(Some(conflict)) => batch.conflicts.push(conflict),
                        Ok(None) => {}
                        Err(err) => {
                            warn!(sequence, error = %err, "Skipping aircraft pair");
                            batch.failed += 1;
                        }
                    }
                }
                Ok(batch)
            })
            .try_reduce(PairBatch::default, |acc, batch| Ok(acc.merge(batch)))?;

        guard.check(sequence)?;

        let conflicts_found = batch.conflicts.len();
        let mut conflicts = batch.conflicts;
        rank_conflicts(&mut conflicts, self.config.max_conflicts);

        let advisories: Vec<Advisory> = conflicts
            .iter()
            .filter_map(|conflict| {
                let a = snapshot.find(&conflict.aircraft_1)?;
                let b = snapshot.find(&conflict.aircraft_2)?;
                Some(self.advise(conflict, a, b))
            })
            .collect();

        let incursions = self.incursions(snapshot, guard)?;

        let stats = CycleStats {
            aircraft_evaluated: n,
            pairs_evaluated: batch.evaluated,
            pairs_failed: batch.failed,
            conflicts_found,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        info!(
            sequence,
            aircraft = n,
            conflicts = conflicts.len(),
            incursions = incursions.len(),
            failed_pairs = stats.pairs_failed,
            elapsed_ms = stats.elapsed_ms,
            "Cycle complete"
        );

        Ok(CycleReport {
            sequence,
            epoch: snapshot.epoch(),
            summary: ConflictSummary::from_conflicts(&conflicts),
            conflicts,
            advisories,
            incursions,
            rejections: snapshot.rejections().to_vec(),
            stats,
        })
    }

    /// Score one pair. `Ok(None)` when the pair is not reportable.
    ///
    /// The pair is put in canonical identifier order first, so `(a, b)` and
    /// `(b, a)` produce the same record.
    pub fn evaluate_pair(
        &self,
        a: &KinematicState,
        motion_a: &MotionVector,
        b: &KinematicState,
        motion_b: &MotionVector,
        detected_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Conflict>, PairError> {
        let ((first, motion_first), (second, motion_second)) = if a.aircraft_id <= b.aircraft_id {
            ((a, motion_a), (b, motion_b))
        } else {
            ((b, motion_b), (a, motion_a))
        };

        let cpa = self
            .solver
            .solve_with(first, motion_first, second, motion_second)?;
        let (airspace, minima) = self
            .config
            .separation
            .for_pair(first.altitude_ft, second.altitude_ft);

        let assessment = self.scorer.score(&RiskInputs {
            horizontal_nm: cpa.horizontal_nm,
            vertical_ft: cpa.vertical_ft,
            time_to_cpa_s: cpa.time_s,
            relative_speed_kt: cpa.relative_speed_kt,
            minima,
        });

        let Some(severity) = assessment.severity else {
            return Ok(None);
        };
        if !(assessment.minima_violated || assessment.probability >= self.config.report_floor) {
            return Ok(None);
        }

        Ok(Some(Conflict {
            aircraft_1: first.aircraft_id.clone(),
            aircraft_2: second.aircraft_id.clone(),
            probability: assessment.probability,
            severity,
            confidence: assessment.confidence,
            time_to_closest_approach_s: cpa.time_s,
            min_horizontal_separation_nm: cpa.horizontal_nm,
            min_vertical_separation_ft: cpa.vertical_ft,
            current_horizontal_separation_nm: horizontal_distance_nm(
                &first.position(),
                &second.position(),
            ),
            current_vertical_separation_ft: (first.altitude_ft - second.altitude_ft).abs(),
            relative_speed_kt: cpa.relative_speed_kt,
            airspace,
            minima,
            minima_violated: assessment.minima_violated,
            closest_approach: cpa.location,
            detected_at,
        }))
    }

    /// Convenience wrapper computing motion vectors on the fly.
    pub fn evaluate(
        &self,
        a: &KinematicState,
        b: &KinematicState,
        detected_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Conflict>, PairError> {
        self.evaluate_pair(
            a,
            &MotionVector::from_state(a),
            b,
            &MotionVector::from_state(b),
            detected_at,
        )
    }

    pub fn advise(&self, conflict: &Conflict, a: &KinematicState, b: &KinematicState) -> Advisory {
        self.advisor.advise(conflict, a, b)
    }

    fn incursions(&self, snapshot: &Snapshot, guard: &CycleGuard) -> Result<Vec<ZoneIncursion>, CycleError> {
        let Some(zones) = self.zones.as_deref() else {
            return Ok(Vec::new());
        };
        if zones.zones().is_empty() {
            return Ok(Vec::new());
        }

        let sequence = snapshot.sequence();
        let mut incursions = snapshot
            .states()
            .par_iter()
            .map(|state| -> Result<Vec<ZoneIncursion>, CycleError> {
                guard.check(sequence)?;
                let trajectory = self.predictor.predict(state);
                Ok(find_incursions(zones, &trajectory))
            })
            .try_reduce(Vec::new, |mut acc, batch| {
                acc.extend(batch);
                Ok(acc)
            })?;

        incursions.sort_by(|a, b| {
            a.time_to_entry_s
                .total_cmp(&b.time_to_entry_s)
                .then_with(|| a.aircraft_id.cmp(&b.aircraft_id))
                .then_with(|| a.zone_id.cmp(&b.zone_id))
        });

        for incursion in incursions.iter().filter(|i| i.already_inside) {
            warn!(
                sequence,
                aircraft_id = %incursion.aircraft_id,
                zone_id = %incursion.zone_id,
                "Aircraft inside conflict zone"
            );
        }

        Ok(incursions)
    }
}
