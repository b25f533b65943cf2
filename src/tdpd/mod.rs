//! Time-Differenced Phase Displacement (TDPD): receiver 3-D motion and
//! clock drift estimated from the epoch-to-epoch difference of carrier-phase
//! observables, fed through the robust orchestrator (spec.md §4.G).
//!
//! Grounded on `examples/original_source/src/extensions/tdiff_phases/tdpd.c`.
//! The RTK navigation stack that `tdpd.c` is embedded in (`rtk_t`, `obsd_t`,
//! `satposs`, `testsnr`) is out of scope (spec.md §1); this module
//! abstracts those collaborators behind [`geometry::NavigationModel`] and
//! [`SignalQualityMask`], taking everything else as plain data.

pub mod geometry;
pub mod smoothing;

use std::collections::BTreeMap;

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::problem::Problem;
use crate::robust::{self, RobustOptions, RobustStatus};
use geometry::NavigationModel;

/// Maximum allowed time span between the two epochs of a TDPD pair, in
/// seconds.
pub const TDPD_MAX_TIME_SPAN: f64 = 2.0;
pub const TDPD_SMOOTHING_MAX_EXTRAPOLATION_TIME: f64 = 5.0;
pub const TDPD_SMOOTHING_MAX_EXTRAPOLATION_DISPL: f64 = 10.0;
pub const TDPD_SMOOTHING_MAX_PNTPOS_DELAY: f64 = 10.0;
pub const TDPD_SMOOTHING_MAX_RESIDUAL: f64 = 20.0;

const TDPD_N_UNKNOWNS: usize = 4;

/// Fixed robust-solver options used for every TDPD solve (spec.md §6).
fn default_robust_options() -> RobustOptions {
    RobustOptions::new(25, 50, 10, 0.1, 0.02, 0.001)
}

/// An opaque satellite identifier, ordered so per-satellite residuals can be
/// stored in a [`BTreeMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SatelliteId(pub u16);

/// One satellite's observation in a single epoch.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub sat_id: SatelliteId,
    /// Pseudorange, metres. Zero means "not present".
    pub pseudorange: f64,
    /// Carrier phase, cycles. Zero means "not present".
    pub phase: f64,
    /// Signal-to-noise ratio or C/N0, in whatever units the caller's
    /// [`SignalQualityMask`] expects.
    pub snr: f64,
    pub elevation_rad: f64,
    pub cycle_slip: bool,
}

impl Observation {
    fn passes_quality_gate(&self, mask: &impl SignalQualityMask, elevation_min_rad: f64) -> bool {
        self.pseudorange != 0.0
            && mask.passes(self.elevation_rad, self.snr)
            && self.elevation_rad >= elevation_min_rad
            && self.phase != 0.0
            && !self.cycle_slip
    }
}

/// The configured SNR mask, injected by the caller (`testsnr` in the
/// original is an external collaborator, out of scope here).
pub trait SignalQualityMask {
    fn passes(&self, elevation_rad: f64, snr: f64) -> bool;
}

/// Two consecutive observation epochs.
#[derive(Debug, Clone)]
pub struct EpochPair {
    pub time: Epoch,
    pub time_prev: Epoch,
    pub current: Vec<Observation>,
    pub previous: Vec<Observation>,
}

impl EpochPair {
    fn time_span(&self) -> f64 {
        (self.time - self.time_prev).to_seconds()
    }
}

/// The receiver's approximate position and elevation mask, analogous to
/// `rtk_t`'s relevant fields in the original.
#[derive(Debug, Clone, Copy)]
pub struct RtkApproxState {
    pub approx_position: Vector3<f64>,
    pub elevation_min_rad: f64,
}

/// Result of [`estimate_displacement`].
#[derive(Debug, Clone)]
pub struct TdpdOutput {
    pub status: RobustStatus,
    pub displacement: Vector3<f64>,
    pub clock_shift: f64,
    pub residuals: BTreeMap<SatelliteId, f64>,
}

impl TdpdOutput {
    fn failed() -> Self {
        Self {
            status: RobustStatus::Fail,
            displacement: Vector3::zeros(),
            clock_shift: 0.0,
            residuals: BTreeMap::new(),
        }
    }
}

/// Builds the per-satellite time-differenced phase for every satellite
/// observed in both epochs and passing the validity gate (spec.md §4.G,
/// steps 2-4).
fn time_differenced_phases(
    pair: &EpochPair,
    nav: &impl NavigationModel,
    rtk_state: &RtkApproxState,
    mask: &impl SignalQualityMask,
) -> Vec<(SatelliteId, f64, Vector3<f64>)> {
    let mut by_sat_prev: BTreeMap<SatelliteId, &Observation> = BTreeMap::new();
    for obs in &pair.previous {
        by_sat_prev.insert(obs.sat_id, obs);
    }

    let mut out = Vec::new();
    for obs_curr in &pair.current {
        let Some(&obs_prev) = by_sat_prev.get(&obs_curr.sat_id) else {
            continue;
        };

        let geom = match geometry::compute_geometry(
            nav,
            obs_curr.sat_id,
            pair.time_prev,
            rtk_state.approx_position,
        ) {
            Some(g) => g,
            None => continue,
        };

        if !obs_curr.passes_quality_gate(mask, rtk_state.elevation_min_rad)
            || !obs_prev.passes_quality_gate(mask, rtk_state.elevation_min_rad)
        {
            continue;
        }

        let lambda = nav.wavelength(obs_curr.sat_id);
        let r = rtk_state.approx_position;

        let geometry_adjustment = r.dot(&geom.los) - r.dot(&geom.los_prev);
        let range_adjustment =
            geom.sat_pos.dot(&geom.los) - geom.sat_pos_prev.dot(&geom.los_prev);

        let y = (obs_curr.phase - obs_prev.phase) * lambda + geometry_adjustment
            - range_adjustment;

        out.push((obs_curr.sat_id, y, geom.los));
    }
    out
}

/// Estimates receiver displacement and clock drift from time-differenced
/// carrier phases between two consecutive epochs (spec.md §4.G).
pub fn estimate_displacement(
    pair: &EpochPair,
    nav: &impl NavigationModel,
    rtk_state: &RtkApproxState,
    mask: &impl SignalQualityMask,
) -> TdpdOutput {
    if pair.time_span() > TDPD_MAX_TIME_SPAN || pair.current.is_empty() || pair.previous.is_empty()
    {
        log::debug!(
            "tdpd: rejecting epoch pair, dt = {:.3}s ({} / {} observations)",
            pair.time_span(),
            pair.current.len(),
            pair.previous.len()
        );
        return TdpdOutput::failed();
    }

    let tdiff = time_differenced_phases(pair, nav, rtk_state, mask);

    if tdiff.len() < TDPD_N_UNKNOWNS + 1 {
        log::debug!(
            "tdpd: only {} usable time-differenced phases, need {}",
            tdiff.len(),
            TDPD_N_UNKNOWNS + 1
        );
        return TdpdOutput::failed();
    }

    let mut problem = Problem::new(TDPD_N_UNKNOWNS, tdiff.len());
    let mut sat_ids = Vec::with_capacity(tdiff.len());
    for (sat_id, y, los) in &tdiff {
        problem.append(&[-los.x, -los.y, -los.z, 1.0], *y);
        sat_ids.push(*sat_id);
    }

    // No natural place here to carry a caller-owned generator across
    // epochs, so this edge uses the process-wide stream (spec.md §9).
    let (status, solution) = crate::rng::with_global_rng(|rng| {
        robust::solve(&problem, &default_robust_options(), rng)
    });

    let mut residuals = BTreeMap::new();
    for (i, sat_id) in sat_ids.iter().enumerate() {
        residuals.insert(*sat_id, solution.residuals[i]);
    }

    TdpdOutput {
        status,
        displacement: Vector3::new(solution.x[0], solution.x[1], solution.x[2]),
        clock_shift: solution.x[3],
        residuals,
    }
}
