//! # gnss-rlsq
//!
//! A robust least-squares estimation core -- Ordinary Least Squares (OLS),
//! Iteratively Reweighted Least Squares (IRLS) and Random Sample Consensus
//! (RANSAC) cascaded under a single tri-state decision policy -- plus a
//! Time-Differenced Phase Displacement (TDPD) estimator built on top of it.
//!
//! The target audience is GNSS positioning engineers who need a dependable
//! estimator for a linear measurement model `A x = b` where some fraction
//! of the rows are gross outliers, without committing to a full navigation
//! stack.
//!
//! ## Usage
//!
//! Put this in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! gnss-rlsq = "0.1"
//! ```
//!
//! ```
//! use gnss_rlsq::problem::Problem;
//! use gnss_rlsq::robust::{self, RobustOptions};
//! use rand_pcg::Pcg64Mcg;
//!
//! let mut problem = Problem::new(2, 5);
//! for i in 0..5 {
//!     let x = i as f64;
//!     problem.append(&[1.0, x], 2.0 * x + 1.0);
//! }
//!
//! let opts = RobustOptions::new(10, 100, 25, 0.1, 0.02, 1e-4);
//! let mut rng = Pcg64Mcg::new(42);
//! let (status, solution) = robust::solve(&problem, &opts, &mut rng);
//! println!("{status:?} {:?}", solution.x);
//! ```

/// Error types returned by the solver modules.
pub mod error;

/// Slice-based linear-algebra building blocks shared by every solver.
pub mod kernels;

/// The `Problem`/`Solution` container types shared by every solver.
pub mod problem;

/// Ordinary Least Squares: a single normal-equation solve.
pub mod ols;

/// Iteratively Reweighted Least Squares.
pub mod irls;

/// Random Sample Consensus.
pub mod ransac;

/// The OLS -> IRLS -> RANSAC robust orchestrator.
pub mod robust;

/// Time-Differenced Phase Displacement estimator and position-domain
/// smoother, built on [`robust`].
pub mod tdpd;

/// A thread-local random stream kept for callers that want the original
/// C source's process-wide default-stream behavior.
pub mod rng;
