//! Ordinary Least Squares: a single normal-equation solve with no iteration
//! and no thresholding (spec §4.C).

use crate::error::RlsqError;
use crate::kernels;
use crate::problem::{Problem, Solution};

/// Solves `problem` by the normal equations. Requires `nm >= nu`.
pub fn solve(problem: &Problem) -> Result<Solution, RlsqError> {
    let nu = problem.nu();
    let nm = problem.nm();

    if nm < nu {
        return Err(RlsqError::UnderDetermined { nm, nu });
    }

    let neq = kernels::solve_normal_equations(problem.design_matrix(), problem.measurements(), nu, nm)?;

    let mut solution = Solution::new(nu, nm);
    solution.x.copy_from_slice(neq.x.as_slice());
    problem.find_residuals(&solution.x, &mut solution.residuals);

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn under_determined_problem_is_rejected() {
        let mut p = Problem::new(3, 5);
        p.append(&[1.0, 0.0, 0.0], 1.0);
        let err = solve(&p).unwrap_err();
        assert_eq!(err, RlsqError::UnderDetermined { nm: 1, nu: 3 });
    }

    #[test]
    fn recovers_true_line_without_noise() {
        // y = 2x + 1
        let mut p = Problem::new(2, 10);
        for i in 0..10 {
            let x = i as f64;
            p.append(&[1.0, x], 2.0 * x + 1.0);
        }
        let sol = solve(&p).unwrap();
        assert_relative_eq!(sol.x[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(sol.x[1], 2.0, epsilon = 1e-9);
        for r in &sol.residuals {
            assert!(r.abs() < 1e-9);
        }
    }

    #[test]
    fn converges_as_measurement_count_grows_with_small_noise() {
        // Property 1: ||x_hat - x*|| -> 0 as nm -> infinity, for small sigma.
        let x_true = [3.0, -1.5];
        let sigma = 0.01;
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let normal = Normal::new(0.0, sigma).unwrap();

        let mut prev_err = f64::INFINITY;
        for &nm in &[10usize, 100, 1000] {
            let mut p = Problem::new(2, nm);
            for i in 0..nm {
                let x = i as f64 * 0.01;
                let noise = normal.sample(&mut rng);
                p.append(&[1.0, x], x_true[0] + x_true[1] * x + noise);
            }
            let sol = solve(&p).unwrap();
            let err = ((sol.x[0] - x_true[0]).powi(2) + (sol.x[1] - x_true[1]).powi(2)).sqrt();
            assert!(err <= prev_err * 1.5, "error did not shrink: {err} vs {prev_err}");
            prev_err = err;

            // Residuals are bit-exact against b[i] - A[i].x.
            let mut manual = vec![0.0; nm];
            p.find_residuals(&sol.x, &mut manual);
            assert_eq!(manual, sol.residuals);
        }
        assert!(prev_err < 0.01);
    }

    #[test]
    fn ols_is_invariant_to_row_permutation() {
        let mut p = Problem::new(2, 6);
        for i in 0..6 {
            let x = i as f64;
            p.append(&[1.0, x], 2.0 * x + 1.0 + 0.01 * (i as f64 % 2.0));
        }
        let sol_a = solve(&p).unwrap();

        let mut permuted = Problem::new(2, 6);
        permuted.copy_from(&p);
        permuted.swap(0, 5);
        permuted.swap(1, 3);
        let sol_b = solve(&permuted).unwrap();

        assert!((sol_a.x[0] - sol_b.x[0]).abs() < 1e-9);
        assert!((sol_a.x[1] - sol_b.x[1]).abs() < 1e-9);
    }
}
