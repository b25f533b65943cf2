//! Dense linear-algebra kernels shared by the OLS/IRLS/RANSAC solvers.
//!
//! These operate on plain `&[f64]` slices because the unknown/measurement
//! counts of a [`crate::problem::Problem`] are only known at run time. Fixed
//! 3-D quantities (line-of-sight vectors, positions) instead use
//! `nalgebra::Vector3`, which already carries these semantics.

use nalgebra::{Cholesky, DMatrix, DVector, Vector3};

use crate::error::RlsqError;

/// Copies `src` into `dst`. Both slices must have the same, positive length.
pub fn copy(src: &[f64], dst: &mut [f64]) {
    assert!(!src.is_empty(), "copy: empty input");
    assert_eq!(src.len(), dst.len(), "copy: length mismatch");
    dst.copy_from_slice(src);
}

/// `vec += addend`, elementwise, in place.
pub fn add_into(vec: &mut [f64], addend: &[f64]) {
    assert_eq!(vec.len(), addend.len(), "add_into: length mismatch");
    assert!(!vec.is_empty(), "add_into: empty input");
    for (v, a) in vec.iter_mut().zip(addend) {
        *v += a;
    }
}

/// `vec -= subtrahend`, elementwise, in place.
pub fn sub_into(vec: &mut [f64], subtrahend: &[f64]) {
    assert_eq!(vec.len(), subtrahend.len(), "sub_into: length mismatch");
    assert!(!vec.is_empty(), "sub_into: empty input");
    for (v, s) in vec.iter_mut().zip(subtrahend) {
        *v -= s;
    }
}

/// Out-of-place elementwise sum `v1 + v2`.
pub fn sum(v1: &[f64], v2: &[f64]) -> Vec<f64> {
    assert_eq!(v1.len(), v2.len(), "sum: length mismatch");
    assert!(!v1.is_empty(), "sum: empty input");
    v1.iter().zip(v2).map(|(a, b)| a + b).collect()
}

/// Out-of-place elementwise difference `v1 - v2`.
pub fn diff(v1: &[f64], v2: &[f64]) -> Vec<f64> {
    assert_eq!(v1.len(), v2.len(), "diff: length mismatch");
    assert!(!v1.is_empty(), "diff: empty input");
    v1.iter().zip(v2).map(|(a, b)| a - b).collect()
}

/// Scales `vec` by `scalar`, in place.
pub fn scale(vec: &mut [f64], scalar: f64) {
    assert!(!vec.is_empty(), "scale: empty input");
    for v in vec.iter_mut() {
        *v *= scalar;
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(v1: &[f64], v2: &[f64]) -> f64 {
    assert_eq!(v1.len(), v2.len(), "dot: length mismatch");
    assert!(!v1.is_empty(), "dot: empty input");
    v1.iter().zip(v2).map(|(a, b)| a * b).sum()
}

/// `w1 * v1 + w2 * v2`, out of place.
pub fn lincomb(w1: f64, v1: &[f64], w2: f64, v2: &[f64]) -> Vec<f64> {
    assert_eq!(v1.len(), v2.len(), "lincomb: length mismatch");
    assert!(!v1.is_empty(), "lincomb: empty input");
    v1.iter().zip(v2).map(|(a, b)| w1 * a + w2 * b).collect()
}

/// Euclidean norm.
pub fn norm(vec: &[f64]) -> f64 {
    assert!(!vec.is_empty(), "norm: empty input");
    vec.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Root-mean-square.
pub fn rms(vec: &[f64]) -> f64 {
    assert!(!vec.is_empty(), "rms: empty input");
    (vec.iter().map(|v| v * v).sum::<f64>() / vec.len() as f64).sqrt()
}

/// `w1 * v1 + w2 * v2` for fixed 3-D vectors.
pub fn lincomb3(w1: f64, v1: Vector3<f64>, w2: f64, v2: Vector3<f64>) -> Vector3<f64> {
    v1 * w1 + v2 * w2
}

/// Result of the normal-equation solve: the estimate and (unused by the
/// robust layer, per the design notes) the variance matrix `(AᵀA)⁻¹`.
pub struct NormalEquationSolution {
    pub x: DVector<f64>,
    pub variance: DMatrix<f64>,
}

/// Solves `A x = b` via the normal equations `x = (AᵀA)⁻¹ Aᵀb`.
///
/// `a` is row-major `nm x nu`. Returns [`RlsqError::SingularNormalMatrix`] if
/// `AᵀA` cannot be Cholesky-factorized -- detection is deterministic for
/// identical floating point inputs.
pub fn solve_normal_equations(
    a: &[f64],
    b: &[f64],
    nu: usize,
    nm: usize,
) -> Result<NormalEquationSolution, RlsqError> {
    assert!(nu > 0, "solve_normal_equations: nu must be positive");
    assert!(nm >= nu, "solve_normal_equations: nm must be >= nu");
    assert_eq!(a.len(), nm * nu, "solve_normal_equations: a shape mismatch");
    assert_eq!(b.len(), nm, "solve_normal_equations: b shape mismatch");

    // nalgebra matrices are column-major; `a` is stored row-major, so build
    // via `from_row_slice`.
    let mat_a = DMatrix::from_row_slice(nm, nu, a);
    let vec_b = DVector::from_row_slice(b);

    let n = &mat_a.transpose() * &mat_a;
    let g = mat_a.transpose() * &vec_b;

    let chol = Cholesky::new(n.clone()).ok_or(RlsqError::SingularNormalMatrix)?;
    let x = chol.solve(&g);
    let variance = chol.inverse();

    Ok(NormalEquationSolution { x, variance })
}
