//! Ellipsoids and the decompositions the rounding drivers need.
//!
//! An `Ellipsoid` is `{x : (x-c)^T Q (x-c) ≤ 1}` with `Q` symmetric
//! positive-definite. The drivers pull two things out of `Q`: the eigenvalue
//! spread (isotropy metric) and a Cholesky factor `L` with `L·L^T = Q`; the
//! forward map `L^T` sends the fitted ellipsoid to (close to) the unit ball.
//! A `Q` that fails either decomposition signals upstream numerical
//! corruption and is surfaced as an error, never coerced to the identity.

use std::fmt;

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};

use crate::cfg::PD_EPS;

/// Failures when decomposing a shape matrix.
#[derive(Debug)]
pub enum EllipsoidError {
    /// The shape matrix is not positive-definite (eigenvalue ≤ 0 or a failed
    /// Cholesky factorization).
    NotPositiveDefinite { min_eigenvalue: f64 },
    /// The Cholesky factor could not be inverted.
    SingularMap,
}

impl fmt::Display for EllipsoidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EllipsoidError::NotPositiveDefinite { min_eigenvalue } => write!(
                f,
                "shape matrix is not positive-definite (min eigenvalue {})",
                min_eigenvalue
            ),
            EllipsoidError::SingularMap => write!(f, "ellipsoid ball map is singular"),
        }
    }
}

impl std::error::Error for EllipsoidError {}

/// Full-dimensional ellipsoid `{x : (x-c)^T Q (x-c) ≤ 1}`.
#[derive(Clone, Debug)]
pub struct Ellipsoid {
    /// Shape matrix `Q` (symmetric positive-definite when well-formed).
    pub q: DMatrix<f64>,
    /// Center `c`.
    pub center: DVector<f64>,
}

impl Ellipsoid {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.center.len()
    }

    /// Smallest and largest eigenvalue of `Q`.
    pub fn axis_bounds(&self) -> Result<(f64, f64), EllipsoidError> {
        let eig = SymmetricEigen::new(self.q.clone());
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &lambda in eig.eigenvalues.iter() {
            min = min.min(lambda);
            max = max.max(lambda);
        }
        if min <= PD_EPS {
            return Err(EllipsoidError::NotPositiveDefinite {
                min_eigenvalue: min,
            });
        }
        Ok((min, max))
    }

    /// Isotropy metric `λ_min/λ_max ∈ (0, 1]`; 1 means the ellipsoid is a
    /// ball.
    pub fn axis_ratio(&self) -> Result<f64, EllipsoidError> {
        let (min, max) = self.axis_bounds()?;
        Ok(min / max)
    }

    /// Lower-triangular `L` with `L·L^T = Q`. Mapping points through `L^T`
    /// sends this ellipsoid to the unit ball.
    pub fn ball_map(&self) -> Result<DMatrix<f64>, EllipsoidError> {
        let chol = Cholesky::new(self.q.clone()).ok_or(EllipsoidError::NotPositiveDefinite {
            min_eigenvalue: f64::NAN,
        })?;
        Ok(chol.l())
    }

    /// Membership with numerical slack.
    pub fn contains(&self, x: &DVector<f64>, slack: f64) -> bool {
        let d = x - &self.center;
        (&self.q * &d).dot(&d) <= 1.0 + slack
    }
}
