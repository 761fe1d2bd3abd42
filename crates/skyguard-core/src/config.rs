//! Engine configuration.
//!
//! Everything policy-related is supplied here at construction time so it can
//! be tuned without recompiling. Missing JSON fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::advisory::AdvisoryPolicy;
use crate::error::ConfigError;
use crate::risk::{RiskModel, SeverityThresholds};
use crate::separation::SeparationStandards;

/// Configuration for the detection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prediction horizon in seconds
    pub horizon_s: f64,
    /// Sample spacing for sampled trajectories (zone checks), seconds
    pub step_s: f64,
    /// Probability at or above which a non-violating pair is reported
    pub report_floor: f64,
    /// Squared relative horizontal speed, (nm/s)², below which tracks count as parallel
    pub parallel_epsilon: f64,
    /// Maximum conflicts kept per cycle
    pub max_conflicts: usize,
    /// Maximum avoidance actions per conflict
    pub max_actions_per_conflict: usize,
    /// Reports older than this (relative to the snapshot epoch) are dropped
    pub max_state_age_s: f64,
    pub thresholds: SeverityThresholds,
    pub separation: SeparationStandards,
    pub risk: RiskModel,
    pub advisory: AdvisoryPolicy,
    pub budget: CycleBudget,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon_s: 1800.0,
            step_s: 10.0,
            report_floor: 0.1,
            parallel_epsilon: 1e-6,
            max_conflicts: 20,
            max_actions_per_conflict: 5,
            max_state_age_s: 120.0,
            thresholds: SeverityThresholds::default(),
            separation: SeparationStandards::default(),
            risk: RiskModel::default(),
            advisory: AdvisoryPolicy::default(),
            budget: CycleBudget::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(self.horizon_s.is_finite() && self.horizon_s > 0.0) {
            errors.push("horizon_s must be positive".to_string());
        }
        if !(self.step_s.is_finite() && self.step_s > 0.0) {
            errors.push("step_s must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.report_floor) {
            errors.push("report_floor must be within [0, 1]".to_string());
        }
        if !(self.parallel_epsilon.is_finite() && self.parallel_epsilon > 0.0) {
            errors.push("parallel_epsilon must be positive".to_string());
        }
        if self.max_conflicts == 0 {
            errors.push("max_conflicts must be at least 1".to_string());
        }
        if !(self.max_state_age_s.is_finite() && self.max_state_age_s > 0.0) {
            errors.push("max_state_age_s must be positive".to_string());
        }
        errors.extend(self.thresholds.validate());
        errors.extend(self.separation.validate());
        errors.extend(self.risk.validate());
        errors.extend(self.advisory.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

/// Soft wall-clock budget for one cycle, growing with the number of pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleBudget {
    pub base_ms: u64,
    pub per_pair_us: u64,
}

impl Default for CycleBudget {
    fn default() -> Self {
        Self {
            base_ms: 250,
            per_pair_us: 50,
        }
    }
}

impl CycleBudget {
    pub fn allowance(&self, pair_count: usize) -> Duration {
        let per_pair = self.per_pair_us.saturating_mul(pair_count as u64);
        Duration::from_millis(self.base_ms) + Duration::from_micros(per_pair)
    }
}
