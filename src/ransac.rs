//! Random Sample Consensus (spec §4.E): repeatedly fit on a random minimal
//! sample, score by consensus size (tie-broken by consensus sum-of-squares),
//! and refine the winning sample's consensus twice.

use rand::Rng;

use crate::error::RlsqError;
use crate::ols;
use crate::problem::{Problem, Solution};

/// Validated hyperparameters for [`solve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacOptions {
    pub sample_size: usize,
    pub min_consensus_size: usize,
    pub min_samples: usize,
    pub max_samples: usize,
    pub outlier_thres: f64,
}

impl RansacOptions {
    pub fn new(
        problem: &Problem,
        sample_size: usize,
        min_consensus_size: usize,
        min_samples: usize,
        max_samples: usize,
        outlier_thres: f64,
    ) -> Self {
        let nu = problem.nu();
        let nm = problem.nm();
        assert!(
            (nu..=nm).contains(&sample_size),
            "RansacOptions: sample_size out of [nu, nm] bounds"
        );
        assert!(
            (nu..=nm).contains(&min_consensus_size),
            "RansacOptions: min_consensus_size out of [nu, nm] bounds"
        );
        assert!(
            (1..=max_samples).contains(&min_samples),
            "RansacOptions: min_samples out of [1, max_samples] bounds"
        );
        assert!(outlier_thres > 0.0, "RansacOptions: outlier_thres must be positive");
        Self {
            sample_size,
            min_consensus_size,
            min_samples,
            max_samples,
            outlier_thres,
        }
    }
}

struct Consensus {
    size: usize,
    sqr: f64,
}

fn score(problem: &Problem, x: &[f64], outlier_thres: f64, residuals: &mut [f64]) -> Consensus {
    problem.find_residuals(x, residuals);
    let mut size = 0usize;
    let mut sqr = 0.0;
    for r in residuals.iter() {
        if r.abs() < outlier_thres {
            size += 1;
            sqr += r * r;
        }
    }
    Consensus { size, sqr }
}

/// Runs RANSAC on `problem`.
pub fn solve(
    problem: &Problem,
    opts: &RansacOptions,
    rng: &mut impl Rng,
) -> Result<Solution, RlsqError> {
    let nu = problem.nu();
    let nm = problem.nm();

    let mut best_x = vec![0.0; nu];
    let mut best = Consensus { size: 0, sqr: 0.0 };
    let mut residuals = vec![0.0; nm];

    for trial in 0..opts.max_samples {
        let sample = problem.trim(opts.sample_size, rng);
        let sample_sol = match ols::solve(&sample) {
            Ok(s) => s,
            Err(_) => continue,
        };

        let candidate = score(problem, &sample_sol.x, opts.outlier_thres, &mut residuals);

        if candidate.size > best.size || (candidate.size == best.size && candidate.sqr < best.sqr) {
            best = candidate;
            best_x.copy_from_slice(&sample_sol.x);
        }

        if (trial + 1) >= opts.min_samples && best.size >= opts.min_consensus_size {
            break;
        }
    }

    if best.size < opts.min_consensus_size {
        log::debug!(
            "ransac: best consensus {} rows, need {}",
            best.size,
            opts.min_consensus_size
        );
        return Err(RlsqError::NoConsensus {
            min_consensus_size: opts.min_consensus_size,
        });
    }

    problem.find_residuals(&best_x, &mut residuals);
    let consensus = problem.consensus_subset(&residuals, opts.outlier_thres);
    let round1 = ols::solve(&consensus)?;

    let mut solution = Solution::new(nu, nm);
    solution.x.copy_from_slice(&round1.x);
    problem.find_residuals(&solution.x, &mut solution.residuals);

    let consensus_refined = problem.consensus_subset(&solution.residuals, opts.outlier_thres);
    if consensus_refined.nm() < opts.min_consensus_size {
        return Err(RlsqError::NoConsensus {
            min_consensus_size: opts.min_consensus_size,
        });
    }

    let round2 = ols::solve(&consensus_refined)?;
    solution.x.copy_from_slice(&round2.x);
    problem.find_residuals(&solution.x, &mut solution.residuals);

    Ok(solution)
}
