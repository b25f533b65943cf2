//! End-to-end scenarios S5-S6 and property 6 (TDPD round-trip) for the
//! time-differenced phase displacement estimator.

use gnss_rlsq::robust::RobustStatus;
use gnss_rlsq::tdpd::geometry::NavigationModel;
use gnss_rlsq::tdpd::{estimate_displacement, EpochPair, Observation, RtkApproxState, SatelliteId, SignalQualityMask};
use hifitime::Epoch;
use nalgebra::Vector3;
use std::collections::BTreeMap;

fn init_logging() {
    if pretty_env_logger::try_init().is_err() {
        println!("could not init env_logger");
    }
}

struct AlwaysPass;
impl SignalQualityMask for AlwaysPass {
    fn passes(&self, _elevation_rad: f64, _snr: f64) -> bool {
        true
    }
}

struct StaticNav {
    positions: BTreeMap<u16, Vector3<f64>>,
    lambda: f64,
}

impl NavigationModel for StaticNav {
    fn satellite_position(&self, sat_id: SatelliteId, _time: Epoch) -> Option<Vector3<f64>> {
        self.positions.get(&sat_id.0).copied()
    }

    fn wavelength(&self, _sat_id: SatelliteId) -> f64 {
        self.lambda
    }
}

fn obs(sat_id: u16, phase: f64) -> Observation {
    Observation {
        sat_id: SatelliteId(sat_id),
        pseudorange: 2.2e7,
        phase,
        snr: 45.0,
        elevation_rad: 0.8,
        cycle_slip: false,
    }
}

/// 8 satellites in a roughly hemispherical sky, well-conditioned for a
/// 4-unknown (displacement + clock) solve.
fn eight_sat_directions() -> [Vector3<f64>; 8] {
    [
        Vector3::new(1.0, 0.0, 1.0),
        Vector3::new(-1.0, 0.0, 1.0),
        Vector3::new(0.0, 1.0, 1.0),
        Vector3::new(0.0, -1.0, 1.0),
        Vector3::new(1.0, 1.0, 2.0),
        Vector3::new(-1.0, 1.0, 2.0),
        Vector3::new(1.0, -1.0, 2.0),
        Vector3::new(-1.0, -1.0, 2.0),
    ]
}

#[test]
fn s5_known_translation_is_recovered() {
    init_logging();
    let true_displacement = Vector3::new(1.0, 0.0, 0.0);
    let lambda = 0.1903;
    let approx_position = Vector3::zeros();

    let mut positions = BTreeMap::new();
    let mut current = Vec::new();
    let mut previous = Vec::new();

    for (i, dir) in eight_sat_directions().iter().enumerate() {
        let sat_id = i as u16 + 1;
        let u = dir.normalize();
        let sat_pos = approx_position + u * 2.2e7;
        positions.insert(sat_id, sat_pos);

        let los = (sat_pos - approx_position).normalize();
        let y = -los.dot(&true_displacement);
        let phase_diff = y / lambda;

        // Previous-epoch phase must be nonzero: `passes_quality_gate`
        // treats 0.0 as "phase not defined".
        let phase_prev = 1_000.0 + sat_id as f64;
        current.push(obs(sat_id, phase_prev + phase_diff));
        previous.push(obs(sat_id, phase_prev));
    }

    let nav = StaticNav { positions, lambda };
    let rtk_state = RtkApproxState {
        approx_position,
        elevation_min_rad: 0.1,
    };
    let pair = EpochPair {
        time: Epoch::from_gpst_seconds(1.0),
        time_prev: Epoch::from_gpst_seconds(0.0),
        current,
        previous,
    };

    let out = estimate_displacement(&pair, &nav, &rtk_state, &AlwaysPass);
    assert_eq!(out.status, RobustStatus::Succeed);
    assert!(
        (out.displacement - true_displacement).norm() < 0.01,
        "recovered displacement {:?} too far from truth",
        out.displacement
    );
}

#[test]
fn s6_large_epoch_gap_fails_immediately() {
    init_logging();
    let nav = StaticNav {
        positions: BTreeMap::new(),
        lambda: 0.1903,
    };
    let rtk_state = RtkApproxState {
        approx_position: Vector3::zeros(),
        elevation_min_rad: 0.1,
    };
    let pair = EpochPair {
        time: Epoch::from_gpst_seconds(3.0),
        time_prev: Epoch::from_gpst_seconds(0.0),
        current: vec![obs(1, 1.0)],
        previous: vec![obs(1, 1.0)],
    };

    let out = estimate_displacement(&pair, &nav, &rtk_state, &AlwaysPass);
    assert_eq!(out.status, RobustStatus::Fail);
    assert!(out.residuals.is_empty());
}

#[test]
fn property_6_tdpd_round_trip_is_exact_without_noise() {
    init_logging();
    let true_displacement = Vector3::new(0.4, -0.2, 0.1);
    let true_clock = 0.05;
    let lambda = 0.1903;
    let approx_position = Vector3::zeros();

    let mut positions = BTreeMap::new();
    let mut current = Vec::new();
    let mut previous = Vec::new();

    for (i, dir) in eight_sat_directions().iter().enumerate() {
        let sat_id = i as u16 + 1;
        let u = dir.normalize();
        let sat_pos = approx_position + u * 2.3e7;
        positions.insert(sat_id, sat_pos);

        let los = (sat_pos - approx_position).normalize();
        let y = -los.dot(&true_displacement) + true_clock;
        let phase_diff = y / lambda;

        // Previous-epoch phase must be nonzero: `passes_quality_gate`
        // treats 0.0 as "phase not defined".
        let phase_prev = 1_000.0 + sat_id as f64;
        current.push(obs(sat_id, phase_prev + phase_diff));
        previous.push(obs(sat_id, phase_prev));
    }

    let nav = StaticNav { positions, lambda };
    let rtk_state = RtkApproxState {
        approx_position,
        elevation_min_rad: 0.1,
    };
    let pair = EpochPair {
        time: Epoch::from_gpst_seconds(1.0),
        time_prev: Epoch::from_gpst_seconds(0.0),
        current,
        previous,
    };

    let out = estimate_displacement(&pair, &nav, &rtk_state, &AlwaysPass);
    assert_eq!(out.status, RobustStatus::Succeed);
    assert!((out.displacement - true_displacement).norm() < 1e-6);
    assert!((out.clock_shift - true_clock).abs() < 1e-6);
}
