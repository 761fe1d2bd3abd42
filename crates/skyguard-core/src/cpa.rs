//! Closest point of approach (CPA) between two constant-velocity aircraft.
//!
//! Relative motion is solved in a local equirectangular frame centred on the
//! pair's mean latitude; separations at the solved time are then measured
//! between the great-circle predictions of both aircraft.

use serde::{Deserialize, Serialize};

use crate::error::PairError;
use crate::models::{KinematicState, Position};
use crate::spatial::{horizontal_distance_nm, local_offset_nm, midpoint};
use crate::trajectory::{extrapolate, MotionVector};

/// Result of a closest-approach solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    /// Seconds until minimum horizontal separation, within `[0, horizon]`
    pub time_s: f64,
    pub horizontal_nm: f64,
    pub vertical_ft: f64,
    /// Midpoint of both predicted positions at `time_s`
    pub location: Position,
    /// Horizontal magnitude of the relative velocity
    pub relative_speed_kt: f64,
    /// Relative horizontal motion was too small to solve; current separation reported
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestApproachSolver {
    horizon_s: f64,
    parallel_epsilon: f64,
}

impl ClosestApproachSolver {
    pub fn new(horizon_s: f64, parallel_epsilon: f64) -> Self {
        Self {
            horizon_s,
            parallel_epsilon,
        }
    }

    pub fn solve(&self, a: &KinematicState, b: &KinematicState) -> Result<ClosestApproach, PairError> {
        self.solve_with(a, &MotionVector::from_state(a), b, &MotionVector::from_state(b))
    }

    /// Solve with motion vectors already decomposed by the caller.
    pub fn solve_with(
        &self,
        a: &KinematicState,
        motion_a: &MotionVector,
        b: &KinematicState,
        motion_b: &MotionVector,
    ) -> Result<ClosestApproach, PairError> {
        let ref_lat = (a.lat + b.lat) / 2.0;
        let (dx, dy) = local_offset_nm(a.lat, a.lon, b.lat, b.lon, ref_lat);
        let relative = motion_a.relative_to(motion_b);
        let relative_speed_sq = relative.horizontal_speed_sq();
        let relative_speed_kt = relative.horizontal_speed_kt();

        let approach = if relative_speed_sq < self.parallel_epsilon {
            let pos_a = a.position();
            let pos_b = b.position();
            ClosestApproach {
                time_s: 0.0,
                horizontal_nm: horizontal_distance_nm(&pos_a, &pos_b),
                vertical_ft: (pos_a.altitude_ft - pos_b.altitude_ft).abs(),
                location: midpoint(&pos_a, &pos_b),
                relative_speed_kt,
                parallel: true,
            }
        } else {
            // Vertex of the parabola |Δp + Δv·t|²
            let t_star = -(dx * relative.east_nm_s + dy * relative.north_nm_s) / relative_speed_sq;
            let time_s = t_star.clamp(0.0, self.horizon_s);
            let pos_a = extrapolate(a, time_s);
            let pos_b = extrapolate(b, time_s);
            ClosestApproach {
                time_s,
                horizontal_nm: horizontal_distance_nm(&pos_a, &pos_b),
                vertical_ft: (pos_a.altitude_ft - pos_b.altitude_ft).abs(),
                location: midpoint(&pos_a, &pos_b),
                relative_speed_kt,
                parallel: false,
            }
        };

        let finite = [
            approach.time_s,
            approach.horizontal_nm,
            approach.vertical_ft,
            approach.relative_speed_kt,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !finite {
            return Err(PairError::NonFiniteGeometry {
                aircraft_1: a.aircraft_id.clone(),
                aircraft_2: b.aircraft_id.clone(),
            });
        }

        Ok(approach)
    }
}
