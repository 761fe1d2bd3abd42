//! Rule-based resolution advisories.
//!
//! Maps one scored conflict onto a short list of concrete altitude, heading
//! and speed changes. There is no optimisation across conflicts; each pair
//! is resolved on its own.

use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::models::KinematicState;
use crate::risk::Severity;
use crate::spatial::{bearing, heading_difference, normalize_heading};

/// Fixed increments and time thresholds of the advisory policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryPolicy {
    pub altitude_step_ft: f64,
    pub heading_offset_deg: f64,
    pub speed_reduction_kt: f64,
    /// Below this time to CPA every action becomes immediate
    pub immediate_threshold_s: f64,
    /// Below this time to CPA controllers are told to prepare vectors
    pub prepare_threshold_s: f64,
}

impl Default for AdvisoryPolicy {
    fn default() -> Self {
        Self {
            altitude_step_ft: 1000.0,
            heading_offset_deg: 15.0,
            speed_reduction_kt: 20.0,
            immediate_threshold_s: 300.0,
            prepare_threshold_s: 600.0,
        }
    }
}

impl AdvisoryPolicy {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.altitude_step_ft > 0.0) {
            errors.push("altitude_step_ft must be positive".to_string());
        }
        if !(self.heading_offset_deg > 0.0 && self.heading_offset_deg < 180.0) {
            errors.push("heading_offset_deg must be within (0, 180)".to_string());
        }
        if !(self.speed_reduction_kt >= 0.0) {
            errors.push("speed_reduction_kt must not be negative".to_string());
        }
        if !(self.immediate_threshold_s <= self.prepare_threshold_s) {
            errors.push("immediate_threshold_s must not exceed prepare_threshold_s".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AltitudeChange,
    HeadingChange,
    SpeedChange,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::AltitudeChange => write!(f, "altitude change"),
            ActionKind::HeadingChange => write!(f, "heading change"),
            ActionKind::SpeedChange => write!(f, "speed change"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Immediate,
}

impl From<Severity> for Urgency {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Urgency::Immediate,
            Severity::High => Urgency::High,
            Severity::Medium => Urgency::Medium,
            Severity::Low => Urgency::Low,
        }
    }
}

/// Which separation minimum the advisory has to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingConstraint {
    Horizontal,
    Vertical,
    Combined,
}

impl BindingConstraint {
    /// Violated minima bind; otherwise the one with less margin does.
    pub fn for_conflict(conflict: &Conflict) -> Self {
        let h_ratio = conflict.min_horizontal_separation_nm / conflict.minima.horizontal_nm;
        let v_ratio = conflict.min_vertical_separation_ft / conflict.minima.vertical_ft;
        match (h_ratio < 1.0, v_ratio < 1.0) {
            (true, true) => BindingConstraint::Combined,
            (true, false) => BindingConstraint::Horizontal,
            (false, true) => BindingConstraint::Vertical,
            (false, false) if v_ratio <= h_ratio => BindingConstraint::Vertical,
            (false, false) => BindingConstraint::Horizontal,
        }
    }

    fn vertical(self) -> bool {
        matches!(self, BindingConstraint::Vertical | BindingConstraint::Combined)
    }

    fn horizontal(self) -> bool {
        matches!(self, BindingConstraint::Horizontal | BindingConstraint::Combined)
    }
}

impl std::fmt::Display for BindingConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingConstraint::Horizontal => write!(f, "horizontal"),
            BindingConstraint::Vertical => write!(f, "vertical"),
            BindingConstraint::Combined => write!(f, "combined"),
        }
    }
}

/// One recommended change for one aircraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvoidanceAction {
    pub aircraft_id: String,
    pub kind: ActionKind,
    /// Feet, degrees or knots depending on `kind`
    pub current_value: f64,
    pub recommended_value: f64,
    pub urgency: Urgency,
    pub rationale: String,
}

/// Flag placed ahead of the actions of a time-critical conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryNotice {
    ImmediateIntervention,
    PrepareVectors,
}

/// Resolution advisory for one conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub aircraft_1: String,
    pub aircraft_2: String,
    pub severity: Severity,
    pub binding: BindingConstraint,
    /// Aircraft selected to give way
    pub maneuvering: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<AdvisoryNotice>,
    pub actions: Vec<AvoidanceAction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionAdvisor {
    policy: AdvisoryPolicy,
    max_actions: usize,
}

impl ResolutionAdvisor {
    pub fn new(policy: AdvisoryPolicy, max_actions: usize) -> Self {
        Self {
            policy,
            max_actions,
        }
    }

    /// Build the advisory for `conflict` between states `a` and `b` (either order).
    pub fn advise(&self, conflict: &Conflict, a: &KinematicState, b: &KinematicState) -> Advisory {
        let (maneuvering, other) = select_maneuvering(a, b);
        let binding = BindingConstraint::for_conflict(conflict);
        let t = conflict.time_to_closest_approach_s;

        let urgency = if t < self.policy.immediate_threshold_s {
            Urgency::Immediate
        } else {
            Urgency::from(conflict.severity)
        };

        let notice = if t < self.policy.immediate_threshold_s {
            Some(AdvisoryNotice::ImmediateIntervention)
        } else if t < self.policy.prepare_threshold_s {
            Some(AdvisoryNotice::PrepareVectors)
        } else {
            None
        };

        let context = format!(
            "{} conflict: CPA {:.1} nm / {:.0} ft in {:.0}s",
            binding,
            conflict.min_horizontal_separation_nm,
            conflict.min_vertical_separation_ft,
            t
        );

        let mut actions = Vec::new();
        for (own, traffic) in [(maneuvering, other), (other, maneuvering)] {
            if binding.vertical() {
                let climb = own.altitude_ft > traffic.altitude_ft
                    || (own.altitude_ft == traffic.altitude_ft
                        && own.aircraft_id == maneuvering.aircraft_id);
                actions.push(self.altitude_action(own, traffic, climb, urgency, &context));
            }
            if binding.horizontal() {
                actions.push(self.heading_action(own, traffic, urgency, &context));
            }
        }

        if binding.horizontal() {
            let faster = if a.ground_speed_kt > b.ground_speed_kt {
                a
            } else if b.ground_speed_kt > a.ground_speed_kt {
                b
            } else {
                maneuvering
            };
            if faster.ground_speed_kt > 0.0 && self.policy.speed_reduction_kt > 0.0 {
                let traffic = if faster.aircraft_id == a.aircraft_id { b } else { a };
                actions.push(AvoidanceAction {
                    aircraft_id: faster.aircraft_id.clone(),
                    kind: ActionKind::SpeedChange,
                    current_value: faster.ground_speed_kt,
                    recommended_value: (faster.ground_speed_kt - self.policy.speed_reduction_kt)
                        .max(0.0),
                    urgency,
                    rationale: format!(
                        "Reduce speed by {:.0} kt for {} with {}",
                        self.policy.speed_reduction_kt, context, traffic.aircraft_id
                    ),
                });
            }
        }

        actions.truncate(self.max_actions);

        Advisory {
            aircraft_1: conflict.aircraft_1.clone(),
            aircraft_2: conflict.aircraft_2.clone(),
            severity: conflict.severity,
            binding,
            maneuvering: maneuvering.aircraft_id.clone(),
            notice,
            actions,
        }
    }

    fn altitude_action(
        &self,
        own: &KinematicState,
        traffic: &KinematicState,
        climb: bool,
        urgency: Urgency,
        context: &str,
    ) -> AvoidanceAction {
        let (recommended, verb) = if climb {
            (own.altitude_ft + self.policy.altitude_step_ft, "Climb")
        } else {
            ((own.altitude_ft - self.policy.altitude_step_ft).max(0.0), "Descend")
        };
        AvoidanceAction {
            aircraft_id: own.aircraft_id.clone(),
            kind: ActionKind::AltitudeChange,
            current_value: own.altitude_ft,
            recommended_value: recommended,
            urgency,
            rationale: format!(
                "{verb} to {recommended:.0} ft for {context} with {}",
                traffic.aircraft_id
            ),
        }
    }

    /// Turn away from the traffic: left when it is on the right, otherwise right.
    fn heading_action(
        &self,
        own: &KinematicState,
        traffic: &KinematicState,
        urgency: Urgency,
        context: &str,
    ) -> AvoidanceAction {
        let to_traffic = normalize_heading(
            bearing(own.lat, own.lon, traffic.lat, traffic.lon).to_degrees(),
        );
        let relative = heading_difference(own.heading_deg, to_traffic);
        let traffic_on_right = relative > 0.0 && relative < 180.0;

        let (offset, side) = if traffic_on_right {
            (-self.policy.heading_offset_deg, "left")
        } else {
            (self.policy.heading_offset_deg, "right")
        };
        let recommended = normalize_heading(own.heading_deg + offset);

        AvoidanceAction {
            aircraft_id: own.aircraft_id.clone(),
            kind: ActionKind::HeadingChange,
            current_value: own.heading_deg,
            recommended_value: recommended,
            urgency,
            rationale: format!(
                "Turn {side} heading {recommended:03.0} for {context} with {}",
                traffic.aircraft_id
            ),
        }
    }
}

/// Lower priority tier gives way; on a tie the greater identifier does.
pub fn select_maneuvering<'a>(
    a: &'a KinematicState,
    b: &'a KinematicState,
) -> (&'a KinematicState, &'a KinematicState) {
    match a.priority.cmp(&b.priority) {
        std::cmp::Ordering::Less => (a, b),
        std::cmp::Ordering::Greater => (b, a),
        std::cmp::Ordering::Equal if a.aircraft_id > b.aircraft_id => (a, b),
        std::cmp::Ordering::Equal => (b, a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, PriorityTier};
    use crate::separation::{AirspaceClass, SeparationMinima};
    use chrono::{DateTime, Utc};

    fn conflict(h_nm: f64, v_ft: f64, t_s: f64, severity: Severity) -> Conflict {
        Conflict {
            aircraft_1: "A".to_string(),
            aircraft_2: "B".to_string(),
            probability: 0.9,
            severity,
            confidence: 0.95,
            time_to_closest_approach_s: t_s,
            min_horizontal_separation_nm: h_nm,
            min_vertical_separation_ft: v_ft,
            current_horizontal_separation_nm: 30.0,
            current_vertical_separation_ft: v_ft,
            relative_speed_kt: 900.0,
            airspace: AirspaceClass::EnRoute,
            minima: SeparationMinima {
                horizontal_nm: 5.0,
                vertical_ft: 1000.0,
            },
            minima_violated: h_nm < 5.0 && v_ft < 1000.0,
            closest_approach: Position {
                lat: 0.0,
                lon: 0.5,
                altitude_ft: 35_000.0,
            },
            detected_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn head_on() -> (KinematicState, KinematicState) {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        (
            KinematicState::new("A", 0.0, 0.0, 35_000.0, now).with_velocity(90.0, 450.0, 0.0),
            KinematicState::new("B", 0.0, 1.0, 35_000.0, now).with_velocity(270.0, 480.0, 0.0),
        )
    }

    fn advisor() -> ResolutionAdvisor {
        ResolutionAdvisor::new(AdvisoryPolicy::default(), 5)
    }

    #[test]
    fn lower_priority_maneuvers() {
        let (a, b) = head_on();
        let b = b.with_priority(PriorityTier::Emergency);
        let (maneuvering, _) = select_maneuvering(&a, &b);
        assert_eq!(maneuvering.aircraft_id, "A");
        let (maneuvering, _) = select_maneuvering(&b, &a);
        assert_eq!(maneuvering.aircraft_id, "A");
    }

    #[test]
    fn equal_priority_tie_break_is_stable() {
        let (a, b) = head_on();
        assert_eq!(select_maneuvering(&a, &b).0.aircraft_id, "B");
        assert_eq!(select_maneuvering(&b, &a).0.aircraft_id, "B");
    }

    #[test]
    fn combined_conflict_gets_full_action_set() {
        let (a, b) = head_on();
        let advisory = advisor().advise(&conflict(0.1, 0.0, 240.0, Severity::Critical), &a, &b);

        assert_eq!(advisory.binding, BindingConstraint::Combined);
        assert_eq!(advisory.maneuvering, "B");
        assert_eq!(advisory.notice, Some(AdvisoryNotice::ImmediateIntervention));
        assert_eq!(advisory.actions.len(), 5);
        assert!(advisory.actions.iter().all(|a| a.urgency == Urgency::Immediate));

        // maneuvering aircraft first; it climbs on equal altitude
        assert_eq!(advisory.actions[0].aircraft_id, "B");
        assert_eq!(advisory.actions[0].kind, ActionKind::AltitudeChange);
        assert_eq!(advisory.actions[0].recommended_value, 36_000.0);
        assert_eq!(advisory.actions[2].aircraft_id, "A");
        assert_eq!(advisory.actions[2].recommended_value, 34_000.0);

        // faster aircraft slows down
        let speed = &advisory.actions[4];
        assert_eq!(speed.kind, ActionKind::SpeedChange);
        assert_eq!(speed.aircraft_id, "B");
        assert_eq!(speed.recommended_value, 460.0);
    }

    #[test]
    fn head_on_traffic_both_turn_right() {
        let (a, b) = head_on();
        let advisory = advisor().advise(&conflict(0.1, 2000.0, 240.0, Severity::High), &a, &b);
        assert_eq!(advisory.binding, BindingConstraint::Horizontal);

        let heading = |id: &str| {
            advisory
                .actions
                .iter()
                .find(|a| a.aircraft_id == id && a.kind == ActionKind::HeadingChange)
                .map(|a| a.recommended_value)
        };
        assert_eq!(heading("A").map(|h| h.round()), Some(105.0));
        assert_eq!(heading("B").map(|h| h.round()), Some(285.0));
    }

    #[test]
    fn vertical_binding_splits_altitudes() {
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let a = KinematicState::new("A", 0.0, 0.0, 35_500.0, now).with_velocity(0.0, 400.0, 0.0);
        let b = KinematicState::new("B", 0.0, 0.02, 35_000.0, now).with_velocity(0.0, 400.0, 0.0);
        let advisory = advisor().advise(&conflict(6.0, 500.0, 900.0, Severity::Medium), &a, &b);

        assert_eq!(advisory.binding, BindingConstraint::Vertical);
        assert_eq!(advisory.notice, None);
        assert_eq!(advisory.actions.len(), 2);
        let a_action = advisory.actions.iter().find(|x| x.aircraft_id == "A").unwrap();
        let b_action = advisory.actions.iter().find(|x| x.aircraft_id == "B").unwrap();
        assert_eq!(a_action.recommended_value, 36_500.0);
        assert_eq!(b_action.recommended_value, 34_000.0);
        assert!(advisory.actions.iter().all(|x| x.urgency == Urgency::Medium));
    }

    #[test]
    fn prepare_notice_between_thresholds() {
        let (a, b) = head_on();
        let advisory = advisor().advise(&conflict(0.1, 0.0, 450.0, Severity::High), &a, &b);
        assert_eq!(advisory.notice, Some(AdvisoryNotice::PrepareVectors));
        assert!(advisory.actions.iter().all(|x| x.urgency == Urgency::High));
    }

    #[test]
    fn actions_are_capped() {
        let (a, b) = head_on();
        let advisory = ResolutionAdvisor::new(AdvisoryPolicy::default(), 2)
            .advise(&conflict(0.1, 0.0, 240.0, Severity::Critical), &a, &b);
        assert_eq!(advisory.actions.len(), 2);
        assert!(advisory.actions.iter().all(|x| x.aircraft_id == "B"));
    }

    #[test]
    fn rationale_names_the_traffic() {
        let (a, b) = head_on();
        let advisory = advisor().advise(&conflict(0.1, 0.0, 240.0, Severity::Critical), &a, &b);
        assert!(advisory.actions[0].rationale.contains("with A"));
        assert!(advisory.actions[0].rationale.starts_with("Climb to 36000 ft"));
    }
}
