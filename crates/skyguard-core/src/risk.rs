//! Conflict probability scoring and severity classification.
//!
//! The score is a deterministic function of CPA geometry, time and relative
//! speed. Identical inputs always yield bit-identical outputs.

use serde::{Deserialize, Serialize};

use crate::separation::SeparationMinima;

/// Severity tiers for detected conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Lower probability bounds of each severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 0.85,
            high: 0.65,
            medium: 0.35,
            low: 0.15,
        }
    }
}

impl SeverityThresholds {
    /// Severity for a probability; `None` below the LOW threshold.
    pub fn classify(&self, probability: f64) -> Option<Severity> {
        if probability >= self.critical {
            Some(Severity::Critical)
        } else if probability >= self.high {
            Some(Severity::High)
        } else if probability >= self.medium {
            Some(Severity::Medium)
        } else if probability >= self.low {
            Some(Severity::Low)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let ordered = 0.0 <= self.low
            && self.low <= self.medium
            && self.medium <= self.high
            && self.high <= self.critical
            && self.critical <= 1.0;
        if ordered {
            Vec::new()
        } else {
            vec!["severity thresholds must satisfy 0 <= low <= medium <= high <= critical <= 1".to_string()]
        }
    }
}

/// Tunable constants of the probability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskModel {
    /// Relative speed at which the speed factor is neutral
    pub reference_speed_kt: f64,
    /// Knots of relative speed per unit of speed-factor change
    pub speed_normalization_kt: f64,
    /// Predictions further out than this get an extra uncertainty reduction
    pub long_range_threshold_s: f64,
    /// Pairs whose CPA is outside this volume score zero
    pub screening_horizontal_nm: f64,
    pub screening_vertical_ft: f64,
    /// Floor of the time-decay factor
    pub min_time_factor: f64,
}

impl Default for RiskModel {
    fn default() -> Self {
        Self {
            reference_speed_kt: 200.0,
            speed_normalization_kt: 1000.0,
            long_range_threshold_s: 600.0,
            screening_horizontal_nm: 50.0,
            screening_vertical_ft: 5000.0,
            min_time_factor: 0.1,
        }
    }
}

impl RiskModel {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.speed_normalization_kt.is_finite() && self.speed_normalization_kt > 0.0) {
            errors.push("speed_normalization_kt must be positive".to_string());
        }
        if !(self.screening_horizontal_nm > 0.0 && self.screening_vertical_ft > 0.0) {
            errors.push("screening volume must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_time_factor) {
            errors.push("min_time_factor must be within [0, 1]".to_string());
        }
        errors
    }
}

/// Geometry of one pair at closest approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
    pub time_to_cpa_s: f64,
    pub relative_speed_kt: f64,
    pub minima: SeparationMinima,
}

impl RiskInputs {
    pub fn minima_violated(&self) -> bool {
        self.horizontal_nm < self.minima.horizontal_nm && self.vertical_ft < self.minima.vertical_ft
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub probability: f64,
    pub severity: Option<Severity>,
    pub confidence: f64,
    pub minima_violated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorer {
    horizon_s: f64,
    model: RiskModel,
    thresholds: SeverityThresholds,
}

impl RiskScorer {
    pub fn new(horizon_s: f64, model: RiskModel, thresholds: SeverityThresholds) -> Self {
        Self {
            horizon_s,
            model,
            thresholds,
        }
    }

    pub fn score(&self, inputs: &RiskInputs) -> RiskAssessment {
        let probability = self.probability(inputs);
        RiskAssessment {
            probability,
            severity: self.thresholds.classify(probability),
            confidence: (probability + 0.1).min(0.95),
            minima_violated: inputs.minima_violated(),
        }
    }

    /// Conflict probability in [0, 1].
    pub fn probability(&self, inputs: &RiskInputs) -> f64 {
        if inputs.horizontal_nm > self.model.screening_horizontal_nm
            || inputs.vertical_ft > self.model.screening_vertical_ft
        {
            return 0.0;
        }

        let base = if inputs.minima_violated() {
            1.0
        } else {
            let horizontal = closeness(inputs.horizontal_nm, inputs.minima.horizontal_nm);
            let vertical = closeness(inputs.vertical_ft, inputs.minima.vertical_ft);
            (horizontal + vertical) / 2.0
        };

        let t = inputs.time_to_cpa_s.clamp(0.0, self.horizon_s);
        let time_factor = (1.0 - t / self.horizon_s).max(self.model.min_time_factor);

        let speed_factor = (1.0
            + (inputs.relative_speed_kt - self.model.reference_speed_kt)
                / self.model.speed_normalization_kt)
            .clamp(0.0, 1.0);

        let mut probability = base * time_factor * speed_factor;

        if t > self.model.long_range_threshold_s {
            let reduction = 1.0 - (t - self.model.long_range_threshold_s) / self.horizon_s;
            probability *= reduction.max(0.0);
        }

        probability.clamp(0.0, 1.0)
    }
}

/// Linear closeness: 1 at zero separation, 0 at twice the minimum.
fn closeness(separation: f64, minimum: f64) -> f64 {
    (1.0 - separation / (minimum * 2.0)).clamp(0.0, 1.0)
}
