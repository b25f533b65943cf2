//! Satellite geometry for a TDPD epoch pair.
//!
//! Open question (spec.md §9, preserved deliberately): both the current and
//! previous satellite positions are evaluated at the *previous* epoch's
//! ephemeris time. This holds ephemeris constant across the differenced
//! pair but introduces a geometry bias of order `||s_dot|| * dt`. Do not
//! "fix" this without a controlling flag -- see the module's callers.

use hifitime::Epoch;
use nalgebra::Vector3;

use super::SatelliteId;

/// Supplies satellite positions and per-satellite carrier wavelengths.
///
/// The SNR/elevation mask and pseudorange/phase/cycle-slip bookkeeping are
/// carried on [`super::Observation`] directly; this trait covers only the
/// ephemeris-dependent lookups a real navigation message provides.
pub trait NavigationModel {
    /// Satellite position in the same frame as the receiver's approximate
    /// position, evaluated at `time`. `None` when the ephemeris has no
    /// usable entry for `sat_id` at `time`.
    fn satellite_position(&self, sat_id: SatelliteId, time: Epoch) -> Option<Vector3<f64>>;

    /// Carrier wavelength (metres) for `sat_id`'s first frequency.
    fn wavelength(&self, sat_id: SatelliteId) -> f64;
}

/// Line-of-sight geometry for one satellite, both epochs evaluated at the
/// previous epoch's ephemeris time.
#[derive(Debug, Clone, Copy)]
pub struct SatelliteGeometry {
    pub sat_pos: Vector3<f64>,
    pub sat_pos_prev: Vector3<f64>,
    pub los: Vector3<f64>,
    pub los_prev: Vector3<f64>,
}

/// Computes the geometry for `sat_id`, or `None` if either satellite
/// position is unavailable or degenerate (coincident with `approx_position`).
pub fn compute_geometry(
    nav: &impl NavigationModel,
    sat_id: SatelliteId,
    time_prev: Epoch,
    approx_position: Vector3<f64>,
) -> Option<SatelliteGeometry> {
    let sat_pos = nav.satellite_position(sat_id, time_prev)?;
    let sat_pos_prev = nav.satellite_position(sat_id, time_prev)?;

    let to_sat = sat_pos - approx_position;
    let to_sat_prev = sat_pos_prev - approx_position;
    if to_sat.norm() <= 0.0 || to_sat_prev.norm() <= 0.0 {
        return None;
    }

    Some(SatelliteGeometry {
        sat_pos,
        sat_pos_prev,
        los: to_sat.normalize(),
        los_prev: to_sat_prev.normalize(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hifitime::Epoch;
    use std::collections::BTreeMap;

    struct FixedNav {
        positions: BTreeMap<u16, Vector3<f64>>,
    }

    impl NavigationModel for FixedNav {
        fn satellite_position(&self, sat_id: SatelliteId, _time: Epoch) -> Option<Vector3<f64>> {
            self.positions.get(&sat_id.0).copied()
        }

        fn wavelength(&self, _sat_id: SatelliteId) -> f64 {
            0.1903
        }
    }

    #[test]
    fn rejects_degenerate_line_of_sight() {
        let mut positions = BTreeMap::new();
        positions.insert(1, Vector3::new(0.0, 0.0, 0.0));
        let nav = FixedNav { positions };
        let t = Epoch::from_gpst_seconds(0.0);
        let geom = compute_geometry(&nav, SatelliteId(1), t, Vector3::new(0.0, 0.0, 0.0));
        assert!(geom.is_none());
    }

    #[test]
    fn normalizes_line_of_sight_vectors() {
        let mut positions = BTreeMap::new();
        positions.insert(1, Vector3::new(1.0e7, 0.0, 0.0));
        let nav = FixedNav { positions };
        let t = Epoch::from_gpst_seconds(0.0);
        let geom = compute_geometry(&nav, SatelliteId(1), t, Vector3::new(0.0, 0.0, 0.0)).unwrap();
        assert!((geom.los.norm() - 1.0).abs() < 1e-12);
        assert!((geom.los_prev.norm() - 1.0).abs() < 1e-12);
    }
}
