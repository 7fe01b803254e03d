//! Rounding configuration and tolerance defaults (internal).
//!
//! Policy
//! - Numerical tolerances are fixed constants to avoid “tolerance juggling”
//!   during normal development. The ellipsoid solver tolerance and iteration
//!   cap are configurable because callers legitimately trade accuracy for
//!   time; everything else stays fixed.

/// Eigenvalues below this are treated as non-positive when checking that a
/// shape matrix is positive-definite.
pub(crate) const PD_EPS: f64 = 1e-12;
/// Slack used for ellipsoid membership checks (`(x-c)^T Q (x-c) <= 1 + slack`).
pub(crate) const CONTAIN_EPS: f64 = 1e-7;
/// Singular values below this are treated as zero when inverting sample
/// second-moment factors.
pub(crate) const SV_EPS: f64 = 1e-12;

/// Shared configuration for the rounding drivers.
///
/// Mirrors the parameter block the volume estimator hands to every phase;
/// `num_threads` is carried for compatibility with that shared struct but is
/// not used by the rounding core.
#[derive(Clone, Debug)]
pub struct RoundCfg {
    /// Ambient dimension of the body.
    pub dim: usize,
    /// Walk length for interior sampling in the single-pass driver.
    pub walk_len: usize,
    /// Carried from the shared estimator configuration; unused here.
    pub num_threads: usize,
    /// Relative tolerance for the enclosing-ellipsoid solver.
    pub ellipsoid_eps: f64,
    /// Iteration cap for the enclosing-ellipsoid solver.
    pub ellipsoid_cap: usize,
    /// Outer-iteration cap for the adaptive driver. Hitting it is reported as
    /// non-convergence, not an error.
    pub max_iters: usize,
    /// Seed for the driver-owned RNG (walk seed points). Fixed seed ⇒
    /// replayable run.
    pub seed: u64,
    /// Emit per-iteration diagnostics at `info` instead of `debug`.
    pub verbose: bool,
}

impl RoundCfg {
    /// Defaults for dimension `n`: walk length `⌊10 + n/10⌋` and the solver
    /// constants used throughout the estimator (tolerance 0.01, cap 1000).
    pub fn for_dimension(n: usize) -> Self {
        Self {
            dim: n,
            walk_len: 10 + n / 10,
            num_threads: 1,
            ellipsoid_eps: 0.01,
            ellipsoid_cap: 1000,
            max_iters: 30,
            seed: 0,
            verbose: false,
        }
    }
}
