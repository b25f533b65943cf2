//! Iteratively Reweighted Least Squares (spec §4.D).
//!
//! Each iteration solves OLS on a reweighted scratch copy of the problem,
//! recomputes residuals against the *original* problem, and reweights from
//! the *original* design matrix again on the next pass -- weights are never
//! applied cumulatively (spec §9, Open Question).

use crate::error::RlsqError;
use crate::ols;
use crate::problem::{Problem, Solution};

/// Validated hyperparameters for [`solve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrlsOptions {
    pub max_iter: usize,
    pub downweight_thres: f64,
    pub min_inliers_proportion: f64,
    pub precision: f64,
}

impl IrlsOptions {
    pub fn new(
        max_iter: usize,
        downweight_thres: f64,
        min_inliers_proportion: f64,
        precision: f64,
    ) -> Self {
        assert!(max_iter >= 1, "IrlsOptions: max_iter must be >= 1");
        assert!(downweight_thres > 0.0, "IrlsOptions: downweight_thres must be positive");
        assert!(
            (0.0..=1.0).contains(&min_inliers_proportion),
            "IrlsOptions: min_inliers_proportion must be in [0, 1]"
        );
        assert!(precision > 0.0, "IrlsOptions: precision must be positive");
        Self {
            max_iter,
            downweight_thres,
            min_inliers_proportion,
            precision,
        }
    }
}

/// Runs IRLS on `problem`, returning the final estimate and residuals
/// (against the original, unweighted problem).
pub fn solve(problem: &Problem, opts: &IrlsOptions) -> Result<Solution, RlsqError> {
    let nu = problem.nu();
    let nm = problem.nm();

    let mut weighted = Problem::new(nu, problem.cap().max(nm));
    weighted.copy_from(problem);

    let mut solution = Solution::new(nu, nm);
    let mut x_prev = vec![0.0; nu];
    let mut n_good = 0usize;
    let dw_thres_inv = 1.0 / opts.downweight_thres;

    let mut converged_early = false;
    let mut iter = 0usize;
    while iter < opts.max_iter {
        x_prev.copy_from_slice(&solution.x);

        let ols_sol = ols::solve(&weighted)?;
        solution.x.copy_from_slice(&ols_sol.x);
        problem.find_residuals(&solution.x, &mut solution.residuals);

        n_good = solution
            .residuals
            .iter()
            .filter(|r| r.abs() < opts.downweight_thres)
            .count();

        if n_good == nm {
            converged_early = true;
            break;
        }

        if iter > 0 {
            let delta_norm: f64 = solution
                .x
                .iter()
                .zip(&x_prev)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();
            if delta_norm < opts.precision {
                converged_early = true;
                break;
            }
        }

        for i in 0..nm {
            let r_abs = solution.residuals[i].abs();
            let weight = if r_abs < opts.downweight_thres {
                1.0
            } else {
                (-(r_abs * dw_thres_inv + 1.0) * 0.5).exp()
            };

            let src_row = problem.row(i);
            let mut weighted_row = vec![0.0; nu];
            weighted_row.copy_from_slice(src_row);
            for v in weighted_row.iter_mut() {
                *v *= weight;
            }
            // `weighted` has the same row layout as `problem`; overwrite in place.
            weighted.overwrite_row(i, &weighted_row, problem.measurements()[i] * weight);
        }

        iter += 1;
    }

    let required = (opts.min_inliers_proportion * nm as f64).max((nu + 1) as f64);
    let exhausted = !converged_early && iter >= opts.max_iter;

    if (n_good as f64) < required || exhausted {
        log::debug!(
            "irls: not converged after {iter} iterations ({n_good}/{nm} inliers, need >= {required})"
        );
        return Err(RlsqError::NotConverged {
            max_iter: opts.max_iter,
        });
    }

    Ok(solution)
}
