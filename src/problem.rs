//! The `Problem` container: owns a row-major design matrix `A` and
//! measurement vector `b`, with the append/swap/trim/copy lifecycle of
//! spec §4.B.

use rand::Rng;

use crate::kernels;

/// Immutable (from the solvers' perspective) linear measurement problem
/// `A x = b`.
///
/// Invariants: `nu <= cap`, `0 <= nm <= cap`. `a` has `cap * nu` capacity and
/// `nm * nu` valid entries (row-major); `b` has `cap` capacity and `nm`
/// valid entries.
#[derive(Clone, Debug)]
pub struct Problem {
    nu: usize,
    nm: usize,
    cap: usize,
    a: Vec<f64>,
    b: Vec<f64>,
}

impl Problem {
    /// Creates an empty problem with `nu` unknowns and room for `cap` rows.
    pub fn new(nu: usize, cap: usize) -> Self {
        assert!(nu >= 1, "Problem::new: nu must be >= 1");
        assert!(cap >= nu, "Problem::new: cap must be >= nu");
        Self {
            nu,
            nm: 0,
            cap,
            a: vec![0.0; cap * nu],
            b: vec![0.0; cap],
        }
    }

    pub fn nu(&self) -> usize {
        self.nu
    }

    pub fn nm(&self) -> usize {
        self.nm
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Whether this problem has enough rows for `ols::solve` to run at all.
    pub fn is_ready_for_processing(&self) -> bool {
        self.nm >= self.nu
    }

    /// Row `i` of the design matrix.
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.nm, "Problem::row: index out of bounds");
        &self.a[i * self.nu..(i + 1) * self.nu]
    }

    /// The full design matrix, row-major, `nm * nu` entries.
    pub fn design_matrix(&self) -> &[f64] {
        &self.a[..self.nm * self.nu]
    }

    /// The full measurement vector, `nm` entries.
    pub fn measurements(&self) -> &[f64] {
        &self.b[..self.nm]
    }

    /// Appends one row. Panics if the problem is at capacity.
    pub fn append(&mut self, row: &[f64], value: f64) {
        assert_eq!(row.len(), self.nu, "Problem::append: row shape mismatch");
        assert!(self.nm < self.cap, "Problem::append: at capacity");
        let start = self.nm * self.nu;
        self.a[start..start + self.nu].copy_from_slice(row);
        self.b[self.nm] = value;
        self.nm += 1;
    }

    /// Overwrites row `i` in place, without changing `nm`. Used by IRLS to
    /// re-apply weights from the original design matrix each iteration.
    pub fn overwrite_row(&mut self, i: usize, row: &[f64], value: f64) {
        assert_eq!(row.len(), self.nu, "Problem::overwrite_row: row shape mismatch");
        assert!(i < self.nm, "Problem::overwrite_row: index out of bounds");
        let start = i * self.nu;
        self.a[start..start + self.nu].copy_from_slice(row);
        self.b[i] = value;
    }

    /// Swaps rows `i` and `j`. Identity when `i == j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        assert!(i < self.nm && j < self.nm, "Problem::swap: index out of bounds");
        if i == j {
            return;
        }
        let nu = self.nu;
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        let (a_lo, a_hi) = self.a.split_at_mut(hi * nu);
        a_lo[lo * nu..(lo + 1) * nu].swap_with_slice(&mut a_hi[..nu]);
        self.b.swap(i, j);
    }

    /// Copies `src`'s rows into `self`. `self.nu` must match `src.nu()` and
    /// `self.cap` must be at least `src.nm()`.
    pub fn copy_from(&mut self, src: &Problem) {
        assert_eq!(self.nu, src.nu, "Problem::copy_from: nu mismatch");
        assert!(self.cap >= src.nm, "Problem::copy_from: insufficient capacity");
        self.nm = src.nm;
        self.a[..src.nm * src.nu].copy_from_slice(&src.a[..src.nm * src.nu]);
        self.b[..src.nm].copy_from_slice(&src.b[..src.nm]);
    }

    /// Fisher-Yates partial shuffle: for `i in [0, k)`, draws `j` uniformly
    /// from `[i, nm)` and swaps rows `i` and `j`, then truncates to `k` rows.
    ///
    /// Post-condition: the first `k` rows are a uniform random sample of the
    /// original rows without replacement; the order of the remaining rows is
    /// unspecified.
    pub fn trim(&self, k: usize, rng: &mut impl Rng) -> Problem {
        assert!(
            k <= self.nm && k >= self.nu,
            "Problem::trim: k out of [nu, nm] bounds"
        );
        let mut scratch = Problem::new(self.nu, self.cap.max(self.nm));
        scratch.copy_from(self);

        for i in 0..k {
            let j = i + rng.gen_range(0..(scratch.nm - i));
            scratch.swap(i, j);
        }
        scratch.nm = k;
        scratch
    }

    /// Writes `r[i] = b[i] - A[i] . x` for every row.
    pub fn find_residuals(&self, x: &[f64], r: &mut [f64]) {
        assert_eq!(x.len(), self.nu, "find_residuals: x shape mismatch");
        assert_eq!(r.len(), self.nm, "find_residuals: r shape mismatch");
        for i in 0..self.nm {
            r[i] = self.b[i] - kernels::dot(self.row(i), x);
        }
    }

    /// Builds the consensus sub-problem of rows whose residual magnitude is
    /// below `outlier_thres`.
    pub fn consensus_subset(&self, residuals: &[f64], outlier_thres: f64) -> Problem {
        assert_eq!(residuals.len(), self.nm, "consensus_subset: residuals shape mismatch");
        assert!(outlier_thres > 0.0, "consensus_subset: outlier_thres must be positive");
        let mut out = Problem::new(self.nu, self.nm);
        for i in 0..self.nm {
            if residuals[i].abs() < outlier_thres {
                out.append(self.row(i), self.b[i]);
            }
        }
        out
    }
}

/// `nu` estimated unknowns plus `nm` residuals against the source problem.
#[derive(Clone, Debug)]
pub struct Solution {
    pub x: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl Solution {
    pub fn new(nu: usize, nm: usize) -> Self {
        assert!(nu >= 1, "Solution::new: nu must be >= 1");
        Self {
            x: vec![0.0; nu],
            residuals: vec![0.0; nm],
        }
    }

    pub fn nu(&self) -> usize {
        self.x.len()
    }

    pub fn nm(&self) -> usize {
        self.residuals.len()
    }
}
