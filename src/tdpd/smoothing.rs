//! Position-domain carrier-smoothed point solution (spec.md §4.G,
//! "Position-domain smoothing"), carried over in full from
//! `tdpd.c`'s `pntpos_position_domain_smoothing`.

use hifitime::Epoch;
use nalgebra::Vector3;

use super::{
    TDPD_SMOOTHING_MAX_EXTRAPOLATION_DISPL, TDPD_SMOOTHING_MAX_EXTRAPOLATION_TIME,
    TDPD_SMOOTHING_MAX_PNTPOS_DELAY, TDPD_SMOOTHING_MAX_RESIDUAL,
};
use crate::robust::RobustStatus;

/// Result of one [`PositionDomainSmoother::update`] call.
#[derive(Debug, Clone, Copy)]
pub struct SmoothedFix {
    pub position: Vector3<f64>,
    pub velocity: Option<Vector3<f64>>,
    /// Set when the point solution failed but a TDPD displacement was used
    /// to dead-reckon the smoothed position forward ("single-point fix").
    pub is_single_point_fix: bool,
}

/// Stateful position-domain smoother. One instance per receiver solution
/// stream.
#[derive(Debug, Clone)]
pub struct PositionDomainSmoother {
    count: u64,
    position_smoothed: Vector3<f64>,
    velocity_tdpd: Vector3<f64>,
    time_start: Epoch,
    time_previous_pntpos: Epoch,
    time_previous_tdpd: Epoch,
}

impl PositionDomainSmoother {
    /// Creates a smoother with no prior state. The first `update` call
    /// whose point solution succeeds initializes it.
    pub fn new(epoch: Epoch) -> Self {
        Self {
            count: 0,
            position_smoothed: Vector3::zeros(),
            velocity_tdpd: Vector3::zeros(),
            time_start: epoch,
            time_previous_pntpos: epoch,
            time_previous_tdpd: epoch,
        }
    }

    /// Advances the smoother by one epoch.
    ///
    /// - `rr`: the raw point-solution position for this epoch.
    /// - `pntpos_success`: whether the point solution converged this epoch.
    /// - `sol_time`: the point solution's epoch.
    /// - `tt`: time span (s) the TDPD displacement covers; zero if unknown.
    /// - `tdpd_status`, `displacement_tdpd`: this epoch's TDPD result.
    /// - `smoothing_window`: configured smoothing window length (s).
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        rr: Vector3<f64>,
        pntpos_success: bool,
        sol_time: Epoch,
        tt: f64,
        tdpd_status: RobustStatus,
        displacement_tdpd: Vector3<f64>,
        smoothing_window: f64,
    ) -> SmoothedFix {
        let mut pntpos_success = pntpos_success;
        let mut displacement_tdpd = displacement_tdpd;

        let age = (sol_time - self.time_start).to_seconds().abs();
        let dt = (sol_time - self.time_previous_pntpos).to_seconds();
        let tdpd_success = tdpd_status == RobustStatus::Succeed;
        let is_filter_out_of_date = dt.abs() > TDPD_SMOOTHING_MAX_PNTPOS_DELAY;

        if tdpd_success && tt != 0.0 {
            self.time_previous_tdpd = sol_time;
            self.velocity_tdpd = displacement_tdpd / tt;
        }

        let dt_extrapolation = (sol_time - self.time_previous_tdpd).to_seconds();
        let displ_extrapolation = self.velocity_tdpd.norm() * dt_extrapolation;
        let is_velocity_out_of_date = dt_extrapolation > TDPD_SMOOTHING_MAX_EXTRAPOLATION_TIME
            || displ_extrapolation > TDPD_SMOOTHING_MAX_EXTRAPOLATION_DISPL;

        let mut is_displacement_available = tdpd_success;
        if !tdpd_success && !is_velocity_out_of_date {
            displacement_tdpd = self.velocity_tdpd * tt;
            is_displacement_available = true;
        }

        let pos_extrapolated = self.position_smoothed + displacement_tdpd;

        if is_displacement_available
            && pntpos_success
            && self.count > 0
            && !is_filter_out_of_date
            && age > smoothing_window
        {
            let pos_residual = rr - pos_extrapolated;
            if pos_residual.norm() > TDPD_SMOOTHING_MAX_RESIDUAL {
                pntpos_success = false;
            }
        }

        let is_initialization = self.count == 0 && pntpos_success;
        let is_reinitialization =
            (is_filter_out_of_date || !is_displacement_available) && pntpos_success;

        let actions_needed = dt != 0.0 || self.count == 0;
        let actions_not_possible = !is_displacement_available && !pntpos_success;

        let mut is_single_point_fix = false;

        if actions_needed && !actions_not_possible {
            if is_initialization || is_reinitialization {
                self.count = 1;
                self.position_smoothed = rr;
                self.time_start = sol_time;
                self.time_previous_pntpos = sol_time;
            } else if pntpos_success {
                if age <= smoothing_window && tdpd_success {
                    self.count += 1;
                }
                let weight = 1.0 / self.count as f64;
                self.position_smoothed = rr * weight + pos_extrapolated * (1.0 - weight);
                self.time_previous_pntpos = sol_time;
            } else if is_displacement_available {
                self.position_smoothed += displacement_tdpd;
                is_single_point_fix = true;
            }
        }

        SmoothedFix {
            position: self.position_smoothed,
            velocity: is_displacement_available.then_some(self.velocity_tdpd),
            is_single_point_fix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hifitime::Epoch;

    fn epoch(seconds: f64) -> Epoch {
        Epoch::from_gpst_seconds(seconds)
    }

    #[test]
    fn initializes_on_first_successful_point_solution() {
        let mut smoother = PositionDomainSmoother::new(epoch(0.0));
        let fix = smoother.update(
            Vector3::new(1.0, 2.0, 3.0),
            true,
            epoch(0.0),
            1.0,
            RobustStatus::Fail,
            Vector3::zeros(),
            30.0,
        );
        assert_eq!(fix.position, Vector3::new(1.0, 2.0, 3.0));
        assert!(!fix.is_single_point_fix);
    }

    #[test]
    fn dead_reckons_when_point_solution_fails_but_displacement_exists() {
        let mut smoother = PositionDomainSmoother::new(epoch(0.0));
        smoother.update(
            Vector3::new(0.0, 0.0, 0.0),
            true,
            epoch(0.0),
            1.0,
            RobustStatus::Succeed,
            Vector3::new(1.0, 0.0, 0.0),
            30.0,
        );
        let fix = smoother.update(
            Vector3::new(0.0, 0.0, 0.0),
            false,
            epoch(1.0),
            1.0,
            RobustStatus::Succeed,
            Vector3::new(1.0, 0.0, 0.0),
            30.0,
        );
        assert!(fix.is_single_point_fix);
        assert!((fix.position - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-9);
    }
}
