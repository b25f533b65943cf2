use thiserror::Error;

/// Errors returned by the solver stack.
///
/// Precondition violations (negative sizes, mismatched shapes, out-of-range
/// options) are programmer errors and are caught by `assert!`/`debug_assert!`
/// at the call site instead of being represented here -- they are never
/// expected to surface during normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RlsqError {
    /// `nm < nu`: not enough rows to determine the unknowns.
    #[error("under-determined problem: {nm} measurements for {nu} unknowns")]
    UnderDetermined { nm: usize, nu: usize },
    /// The normal matrix `AᵀA` could not be factorized.
    #[error("normal matrix is singular")]
    SingularNormalMatrix,
    /// IRLS exhausted its iteration budget without reaching the inlier floor.
    #[error("IRLS did not converge within {max_iter} iterations")]
    NotConverged { max_iter: usize },
    /// RANSAC could not find a sample whose consensus reaches `min_consensus_size`.
    #[error("RANSAC found no consensus of at least {min_consensus_size} rows")]
    NoConsensus { min_consensus_size: usize },
}
