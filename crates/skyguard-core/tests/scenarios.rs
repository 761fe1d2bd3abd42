//! End-to-end detection scenarios and properties of the engine.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use skyguard_core::spatial::offset_by_bearing;
use skyguard_core::trajectory::extrapolate;
use skyguard_core::{
    AdvisoryNotice, AircraftReport, ClosestApproachSolver, ConflictEngine, EngineConfig,
    IngestError, KinematicState, RiskInputs, RiskModel, RiskScorer, SeparationMinima, Severity,
    SeverityThresholds, Snapshot,
};

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
}

fn engine() -> ConflictEngine {
    ConflictEngine::new(EngineConfig::default()).unwrap()
}

fn snapshot(states: &[KinematicState]) -> Snapshot {
    Snapshot::from_states(1, epoch(), states, 120.0)
}

fn random_state(rng: &mut SmallRng, id: String) -> KinematicState {
    KinematicState::new(
        id,
        rng.random_range(40.0..41.0),
        rng.random_range(-74.0..-73.0),
        rng.random_range(5_000.0..40_000.0),
        epoch(),
    )
    .with_velocity(
        rng.random_range(0.0..360.0),
        rng.random_range(0.0..550.0),
        rng.random_range(-2_000.0..2_000.0),
    )
}

#[test]
fn head_on_at_same_altitude_is_detected() {
    let states = vec![
        KinematicState::new("A", 0.0, 0.0, 35_000.0, epoch()).with_velocity(90.0, 450.0, 0.0),
        KinematicState::new("B", 0.0, 1.0, 35_000.0, epoch()).with_velocity(270.0, 450.0, 0.0),
    ];
    let report = engine().detect(&snapshot(&states)).unwrap();

    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert_eq!((conflict.aircraft_1.as_str(), conflict.aircraft_2.as_str()), ("A", "B"));
    assert!(conflict.time_to_closest_approach_s < 1800.0);
    assert!((conflict.time_to_closest_approach_s - 240.2).abs() < 1.0);
    assert!(conflict.min_vertical_separation_ft < 1.0);
    assert!(conflict.min_horizontal_separation_nm < 0.5);
    assert!(matches!(conflict.severity, Severity::Critical | Severity::High));
    assert!(conflict.minima_violated);
    assert_eq!(conflict.detected_at, epoch());

    assert_eq!(report.advisories.len(), 1);
    let advisory = &report.advisories[0];
    assert_eq!(advisory.notice, Some(AdvisoryNotice::ImmediateIntervention));
    assert!(!advisory.actions.is_empty() && advisory.actions.len() <= 5);
    assert!(!report.actions_for("A").is_empty());
    assert!(!report.actions_for("B").is_empty());
}

#[test]
fn safe_vertical_crossing_is_not_reported() {
    let states = vec![
        KinematicState::new("A", 0.0, 0.0, 35_000.0, epoch()).with_velocity(0.0, 400.0, 0.0),
        KinematicState::new("B", 1.0, 0.0, 25_000.0, epoch()).with_velocity(90.0, 400.0, 0.0),
    ];
    let report = engine().detect(&snapshot(&states)).unwrap();
    assert!(report.conflicts.is_empty());
    assert!(report.advisories.is_empty());
    assert_eq!(report.stats.pairs_evaluated, 1);
}

#[test]
fn parallel_tracks_report_current_offset() {
    let (lat_b, lon_b) = offset_by_bearing(45.0, -100.0, 10.0, std::f64::consts::FRAC_PI_2);
    let a = KinematicState::new("A", 45.0, -100.0, 30_000.0, epoch()).with_velocity(0.0, 420.0, 0.0);
    let b = KinematicState::new("B", lat_b, lon_b, 30_000.0, epoch()).with_velocity(0.0, 420.0, 0.0);

    let cpa = ClosestApproachSolver::new(1800.0, 1e-6).solve(&a, &b).unwrap();
    assert!(cpa.parallel);
    assert_eq!(cpa.time_s, 0.0);
    assert!((cpa.horizontal_nm - 10.0).abs() < 1e-6);

    // Same level, 10 nm abreast: only the vertical term contributes, and
    // zero closure speed scales it by 0.8.
    let report = engine().detect(&snapshot(&[a, b])).unwrap();
    assert_eq!(report.conflicts.len(), 1);
    let conflict = &report.conflicts[0];
    assert!((conflict.probability - 0.4).abs() < 1e-6);
    assert_eq!(conflict.severity, Severity::Medium);
    assert!(!conflict.minima_violated);
    assert_eq!(conflict.time_to_closest_approach_s, 0.0);
    assert!((conflict.min_horizontal_separation_nm - 10.0).abs() < 1e-6);
}

#[test]
fn parallel_probability_does_not_grow_over_horizon() {
    let (lat_b, lon_b) = offset_by_bearing(10.0, 20.0, 12.0, std::f64::consts::FRAC_PI_2);
    let a = KinematicState::new("A", 10.0, 20.0, 30_000.0, epoch()).with_velocity(0.0, 420.0, 0.0);
    let b = KinematicState::new("B", lat_b, lon_b, 30_000.0, epoch()).with_velocity(0.0, 420.0, 0.0);
    let engine = engine();

    let mut previous = f64::INFINITY;
    for t in [0.0, 300.0, 600.0, 900.0, 1200.0, 1500.0, 1800.0] {
        let advance = |s: &KinematicState| {
            let p = extrapolate(s, t);
            let mut moved = s.clone();
            moved.lat = p.lat;
            moved.lon = p.lon;
            moved.altitude_ft = p.altitude_ft;
            moved
        };
        let probability = engine
            .evaluate(&advance(&a), &advance(&b), epoch())
            .unwrap()
            .map(|c| c.probability)
            .unwrap_or(0.0);
        assert!(probability <= previous + 1e-9, "t={t}: {probability} > {previous}");
        previous = probability;
    }
}

#[test]
fn pair_geometry_is_symmetric() {
    let mut rng = SmallRng::seed_from_u64(7);
    let solver = ClosestApproachSolver::new(1800.0, 1e-6);
    for i in 0..500 {
        let a = random_state(&mut rng, format!("A{i}"));
        let b = random_state(&mut rng, format!("B{i}"));
        let ab = solver.solve(&a, &b).unwrap();
        let ba = solver.solve(&b, &a).unwrap();
        assert_eq!(ab.time_s, ba.time_s);
        assert!((ab.horizontal_nm - ba.horizontal_nm).abs() < 1e-9);
        assert_eq!(ab.vertical_ft, ba.vertical_ft);
    }
}

#[test]
fn scorer_is_deterministic() {
    let mut rng = SmallRng::seed_from_u64(11);
    let scorer = RiskScorer::new(1800.0, RiskModel::default(), SeverityThresholds::default());
    for _ in 0..500 {
        let inputs = RiskInputs {
            horizontal_nm: rng.random_range(0.0..60.0),
            vertical_ft: rng.random_range(0.0..6000.0),
            time_to_cpa_s: rng.random_range(0.0..1800.0),
            relative_speed_kt: rng.random_range(0.0..1100.0),
            minima: SeparationMinima { horizontal_nm: 5.0, vertical_ft: 1000.0 },
        };
        let first = scorer.score(&inputs);
        let second = scorer.score(&inputs);
        assert_eq!(first.probability.to_bits(), second.probability.to_bits());
        assert_eq!(first.severity, second.severity);
    }
}

#[test]
fn closer_approach_never_lowers_probability() {
    let mut rng = SmallRng::seed_from_u64(23);
    let scorer = RiskScorer::new(1800.0, RiskModel::default(), SeverityThresholds::default());
    let minima = SeparationMinima { horizontal_nm: 5.0, vertical_ft: 1000.0 };
    for _ in 0..1000 {
        let time_to_cpa_s = rng.random_range(0.0..1800.0);
        let relative_speed_kt = rng.random_range(0.0..1100.0);
        let h = rng.random_range(0.0..60.0);
        let v = rng.random_range(0.0..6000.0);
        let shrink_h = rng.random_range(0.0..=1.0);
        let shrink_v = rng.random_range(0.0..=1.0);

        let wide = scorer.probability(&RiskInputs {
            horizontal_nm: h,
            vertical_ft: v,
            time_to_cpa_s,
            relative_speed_kt,
            minima,
        });
        let close = scorer.probability(&RiskInputs {
            horizontal_nm: h * shrink_h,
            vertical_ft: v * shrink_v,
            time_to_cpa_s,
            relative_speed_kt,
            minima,
        });
        assert!(close >= wide, "h={h} v={v}: {close} < {wide}");
        assert!((0.0..=1.0).contains(&close));
    }
}

#[test]
fn repeated_cycles_are_identical() {
    let mut rng = SmallRng::seed_from_u64(42);
    let states: Vec<KinematicState> = (0..80)
        .map(|i| random_state(&mut rng, format!("AC{i:03}")))
        .collect();
    let snapshot = snapshot(&states);
    let engine = engine();

    let first = engine.detect(&snapshot).unwrap();
    let second = engine.detect(&snapshot).unwrap();
    assert_eq!(first.conflicts, second.conflicts);
    assert_eq!(first.advisories, second.advisories);
    assert_eq!(first.stats.pairs_evaluated, 80 * 79 / 2);

    for pair in first.conflicts.windows(2) {
        assert!(pair[0].probability >= pair[1].probability);
    }
    for conflict in &first.conflicts {
        assert!(conflict.aircraft_1 < conflict.aircraft_2);
        assert!((0.0..=1800.0).contains(&conflict.time_to_closest_approach_s));
    }
}

#[test]
fn report_is_truncated_to_top_conflicts() {
    let mut states = Vec::new();
    for k in 0..25 {
        let lat = k as f64 * 1.5;
        // Later pairs start further apart and score lower
        let gap = 0.5 + k as f64 * 0.05;
        states.push(
            KinematicState::new(format!("E{k:02}"), lat, 0.0, 35_000.0, epoch())
                .with_velocity(90.0, 450.0, 0.0),
        );
        states.push(
            KinematicState::new(format!("W{k:02}"), lat, gap, 35_000.0, epoch())
                .with_velocity(270.0, 450.0, 0.0),
        );
    }
    let report = engine().detect(&snapshot(&states)).unwrap();
    assert_eq!(report.stats.conflicts_found, 25);
    assert_eq!(report.conflicts.len(), 20);
    assert_eq!(report.advisories.len(), 20);
    assert_eq!(report.summary.total, 20);
    for pair in report.conflicts.windows(2) {
        assert!(pair[0].probability >= pair[1].probability);
    }
}

#[test]
fn bad_records_only_reduce_coverage() {
    let mut reports: Vec<AircraftReport> = [
        KinematicState::new("A", 0.0, 0.0, 35_000.0, epoch()).with_velocity(90.0, 450.0, 0.0),
        KinematicState::new("B", 0.0, 1.0, 35_000.0, epoch()).with_velocity(270.0, 450.0, 0.0),
    ]
    .iter()
    .map(AircraftReport::from)
    .collect();
    reports.push(AircraftReport {
        aircraft_id: "C".to_string(),
        lat: Some(0.0),
        lon: Some(200.0),
        altitude_ft: Some(35_000.0),
        ground_speed_kt: Some(450.0),
        heading_deg: Some(0.0),
        ..Default::default()
    });
    reports.push(AircraftReport {
        aircraft_id: "D".to_string(),
        lat: Some(0.0),
        lon: Some(0.5),
        ..Default::default()
    });
    reports.push(AircraftReport::from(
        &KinematicState::new("A", 0.0, 0.5, 35_000.0, epoch()).with_velocity(0.0, 300.0, 0.0),
    ));

    let snapshot = Snapshot::ingest(9, epoch(), reports, 120.0);
    let report = engine().detect(&snapshot).unwrap();

    assert_eq!(report.sequence, 9);
    assert_eq!(report.stats.aircraft_evaluated, 2);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.rejections.len(), 3);
    assert!(report
        .rejections
        .iter()
        .any(|r| matches!(r, IngestError::OutOfRange { aircraft_id, .. } if aircraft_id == "C")));
    assert!(report
        .rejections
        .iter()
        .any(|r| matches!(r, IngestError::MissingField { aircraft_id, .. } if aircraft_id == "D")));
    assert!(report
        .rejections
        .iter()
        .any(|r| matches!(r, IngestError::Duplicate { aircraft_id } if aircraft_id == "A")));
}

#[test]
fn distant_closing_pair_is_screened_at_closest_approach() {
    // 66 nm apart now, closing head-on at 900 kt.
    let a = KinematicState::new("A", 0.0, 0.0, 35_000.0, epoch()).with_velocity(90.0, 450.0, 0.0);
    let b = KinematicState::new("B", 0.0, 1.1, 35_000.0, epoch()).with_velocity(270.0, 450.0, 0.0);

    let report = engine().detect(&snapshot(&[a, b])).unwrap();
    assert_eq!(report.conflicts.len(), 1);
    assert!(report.conflicts[0].current_horizontal_separation_nm > 50.0);
    assert!(report.conflicts[0].min_horizontal_separation_nm < 1.0);
}
