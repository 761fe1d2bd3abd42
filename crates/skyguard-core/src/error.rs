//! Error types for ingestion, pair evaluation, cycles and configuration.
//!
//! None of these abort the engine: ingestion and pair errors reduce
//! coverage for one cycle, cycle errors abandon a single cycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason an aircraft record was excluded from a snapshot.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestError {
    /// A required kinematic field was absent.
    #[error("aircraft {aircraft_id}: missing required field `{field}`")]
    MissingField { aircraft_id: String, field: String },

    /// A field was non-finite or outside its physical range.
    #[error("aircraft {aircraft_id}: {field} = {value} is out of range")]
    OutOfRange {
        aircraft_id: String,
        field: String,
        /// Offending value as text; non-finite values do not survive JSON
        value: String,
    },

    /// The identifier already appeared earlier in the same snapshot.
    #[error("aircraft {aircraft_id}: duplicate record in snapshot")]
    Duplicate { aircraft_id: String },

    #[error("aircraft {aircraft_id}: observation is {age_s:.0}s old (limit {limit_s:.0}s)")]
    Stale {
        aircraft_id: String,
        age_s: f64,
        limit_s: f64,
    },
}

impl IngestError {
    pub fn aircraft_id(&self) -> &str {
        match self {
            IngestError::MissingField { aircraft_id, .. }
            | IngestError::OutOfRange { aircraft_id, .. }
            | IngestError::Duplicate { aircraft_id }
            | IngestError::Stale { aircraft_id, .. } => aircraft_id,
        }
    }
}

/// Failure evaluating one aircraft pair. Isolated to that pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("non-finite closest-approach geometry for {aircraft_1} / {aircraft_2}")]
    NonFiniteGeometry {
        aircraft_1: String,
        aircraft_2: String,
    },
}

/// Reasons a detection cycle was abandoned. Partial results are discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CycleError {
    /// A newer snapshot arrived while the cycle was running.
    #[error("cycle {sequence} superseded by a newer snapshot")]
    Superseded { sequence: u64 },

    /// The soft wall-clock budget ran out.
    #[error("cycle {sequence} exceeded its {budget_ms} ms budget")]
    BudgetExceeded { sequence: u64, budget_ms: u128 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
