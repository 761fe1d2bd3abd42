//! Constant-velocity trajectory prediction.
//!
//! Aircraft are extrapolated along a great circle at constant ground speed,
//! heading and vertical rate. No turns, no acceleration.

use serde::{Deserialize, Serialize};

use crate::models::{KinematicState, Position};
use crate::spatial::{offset_by_bearing, FPM_TO_FT_PER_S, KT_TO_NM_PER_S};

const MIN_STEP_S: f64 = 0.1;

/// Velocity decomposed into east/north (nm/s) and vertical (ft/s) components.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionVector {
    pub east_nm_s: f64,
    pub north_nm_s: f64,
    pub vertical_ft_s: f64,
}

impl MotionVector {
    pub fn from_state(state: &KinematicState) -> Self {
        let speed_nm_s = state.ground_speed_kt.max(0.0) * KT_TO_NM_PER_S;
        let heading_rad = state.heading_deg.to_radians();
        Self {
            east_nm_s: speed_nm_s * heading_rad.sin(),
            north_nm_s: speed_nm_s * heading_rad.cos(),
            vertical_ft_s: state.vertical_rate_fpm * FPM_TO_FT_PER_S,
        }
    }

    /// Component-wise `self - other`.
    pub fn relative_to(&self, other: &MotionVector) -> MotionVector {
        MotionVector {
            east_nm_s: self.east_nm_s - other.east_nm_s,
            north_nm_s: self.north_nm_s - other.north_nm_s,
            vertical_ft_s: self.vertical_ft_s - other.vertical_ft_s,
        }
    }

    pub fn horizontal_speed_sq(&self) -> f64 {
        self.east_nm_s * self.east_nm_s + self.north_nm_s * self.north_nm_s
    }

    pub fn horizontal_speed_kt(&self) -> f64 {
        self.horizontal_speed_sq().sqrt() / KT_TO_NM_PER_S
    }
}

/// Predicted position after `t_s` seconds (negative values look back).
pub fn extrapolate(state: &KinematicState, t_s: f64) -> Position {
    let altitude_ft = state.altitude_ft + state.vertical_rate_fpm * FPM_TO_FT_PER_S * t_s;

    if state.ground_speed_kt <= 0.0 {
        return Position {
            lat: state.lat,
            lon: state.lon,
            altitude_ft,
        };
    }

    let distance_nm = state.ground_speed_kt * KT_TO_NM_PER_S * t_s;
    let (lat, lon) = offset_by_bearing(
        state.lat,
        state.lon,
        distance_nm,
        state.heading_deg.to_radians(),
    );

    Position {
        lat,
        lon,
        altitude_ft,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub t_s: f64,
    pub position: Position,
}

/// Sampled prediction for one aircraft. Lives only for the cycle that built it.
#[derive(Debug, Clone)]
pub struct PredictedTrajectory<'a> {
    pub state: &'a KinematicState,
    pub horizon_s: f64,
    pub samples: Vec<TrajectorySample>,
}

impl PredictedTrajectory<'_> {
    /// Closed-form position, clamped to `[0, horizon]`.
    pub fn position_at(&self, t_s: f64) -> Position {
        extrapolate(self.state, t_s.clamp(0.0, self.horizon_s))
    }

    pub fn aircraft_id(&self) -> &str {
        &self.state.aircraft_id
    }
}

/// Linear extrapolation over a fixed horizon at a fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPredictor {
    horizon_s: f64,
    step_s: f64,
}

impl TrajectoryPredictor {
    pub fn new(horizon_s: f64, step_s: f64) -> Self {
        Self {
            horizon_s: horizon_s.max(0.0),
            step_s: step_s.max(MIN_STEP_S),
        }
    }

    pub fn horizon_s(&self) -> f64 {
        self.horizon_s
    }

    pub fn step_s(&self) -> f64 {
        self.step_s
    }

    /// Samples at `0, step, 2·step, …` with the horizon itself as the last sample.
    pub fn predict<'a>(&self, state: &'a KinematicState) -> PredictedTrajectory<'a> {
        let steps = (self.horizon_s / self.step_s).ceil() as usize;
        let samples = (0..=steps)
            .map(|i| {
                let t_s = (i as f64 * self.step_s).min(self.horizon_s);
                TrajectorySample {
                    t_s,
                    position: extrapolate(state, t_s),
                }
            })
            .collect();

        PredictedTrajectory {
            state,
            horizon_s: self.horizon_s,
            samples,
        }
    }
}
