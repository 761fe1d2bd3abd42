//! Separation standards by airspace class.

use serde::{Deserialize, Serialize};

/// Airspace class of an aircraft pair, by mean altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirspaceClass {
    Terminal,
    EnRoute,
}

/// Required minimum separation for one airspace class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparationMinima {
    /// Minimum horizontal separation in nautical miles
    pub horizontal_nm: f64,
    /// Minimum vertical separation in feet
    pub vertical_ft: f64,
}

/// Altitude-banded separation table. Read-only during detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationStandards {
    /// Pairs with a mean altitude below this are in terminal airspace
    pub terminal_ceiling_ft: f64,
    pub terminal: SeparationMinima,
    pub en_route: SeparationMinima,
}

impl Default for SeparationStandards {
    fn default() -> Self {
        Self {
            terminal_ceiling_ft: 10_000.0,
            terminal: SeparationMinima {
                horizontal_nm: 3.0,
                vertical_ft: 1000.0,
            },
            en_route: SeparationMinima {
                horizontal_nm: 5.0,
                vertical_ft: 1000.0,
            },
        }
    }
}

impl SeparationStandards {
    pub fn classify(&self, mean_altitude_ft: f64) -> AirspaceClass {
        if mean_altitude_ft < self.terminal_ceiling_ft {
            AirspaceClass::Terminal
        } else {
            AirspaceClass::EnRoute
        }
    }

    pub fn minima(&self, class: AirspaceClass) -> SeparationMinima {
        match class {
            AirspaceClass::Terminal => self.terminal,
            AirspaceClass::EnRoute => self.en_route,
        }
    }

    /// Class and minima for a pair at the given altitudes.
    pub fn for_pair(&self, altitude_a_ft: f64, altitude_b_ft: f64) -> (AirspaceClass, SeparationMinima) {
        let class = self.classify((altitude_a_ft + altitude_b_ft) / 2.0);
        (class, self.minima(class))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (name, minima) in [("terminal", self.terminal), ("en_route", self.en_route)] {
            if !(minima.horizontal_nm.is_finite() && minima.horizontal_nm > 0.0) {
                errors.push(format!("{name} horizontal minimum must be positive"));
            }
            if !(minima.vertical_ft.is_finite() && minima.vertical_ft > 0.0) {
                errors.push(format!("{name} vertical minimum must be positive"));
            }
        }
        if !self.terminal_ceiling_ft.is_finite() {
            errors.push("terminal ceiling must be finite".to_string());
        }
        errors
    }
}
