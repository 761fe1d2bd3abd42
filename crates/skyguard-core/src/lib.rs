pub mod advisory;
pub mod config;
pub mod conflict;
pub mod cpa;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod report;
pub mod risk;
pub mod separation;
pub mod spatial;
pub mod summary;
pub mod trajectory;
pub mod zones;

pub use advisory::{
    select_maneuvering, ActionKind, Advisory, AdvisoryNotice, AdvisoryPolicy, AvoidanceAction,
    BindingConstraint, ResolutionAdvisor, Urgency,
};
pub use config::{CycleBudget, EngineConfig};
pub use conflict::{rank_conflicts, Conflict};
pub use cpa::{ClosestApproach, ClosestApproachSolver};
pub use engine::{ConflictEngine, CycleCache, CycleGuard};
pub use error::{ConfigError, CycleError, IngestError, PairError};
pub use ingest::Snapshot;
pub use models::{AircraftReport, KinematicState, Position, PriorityTier};
pub use report::{CycleReport, CycleStats};
pub use risk::{RiskAssessment, RiskInputs, RiskModel, RiskScorer, Severity, SeverityThresholds};
pub use separation::{AirspaceClass, SeparationMinima, SeparationStandards};
pub use spatial::haversine_nm;
pub use summary::{ConflictSummary, SeverityCounts};
pub use trajectory::{MotionVector, PredictedTrajectory, TrajectoryPredictor, TrajectorySample};
pub use zones::{find_incursions, ConflictZone, ZoneChecker, ZoneIncursion, ZoneKind, ZoneSet};
