//! Minimum-volume enclosing ellipsoid via Khachiyan's algorithm.
//!
//! Why this module exists
//! - Rounding needs the MVEE of a sampled point set; Khachiyan's
//!   multiplicative-weight update converges to it with a clean per-sweep
//!   volume-decrease guarantee and needs nothing beyond dense linear algebra.
//!
//! Model
//! - Points are lifted to homogeneous (d+1)-vectors. A probability weight
//!   vector `u` over the points starts uniform; each sweep forms the weighted
//!   second-moment matrix `M(u)`, scores every point by
//!   `q_i^T M(u)^{-1} q_i`, and shifts weight toward the worst offender.
//! - Stops when `(κ − (d+1))/(d+1) ≤ eps`, or at the iteration cap. The cap
//!   is not a failure: the best weights found still define an enclosing
//!   ellipsoid, just with a looser volume bound, and `converged = false`
//!   lets the caller judge.
//! - Center and shape come from the weighted first/second moments, with the
//!   standard 1/d normalization.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::ellipsoid::Ellipsoid;

/// Failures of the MVEE solver.
#[derive(Debug)]
pub enum MveeError {
    /// Fewer than `d + 1` points: no full-dimensional ellipsoid exists.
    TooFewPoints { needed: usize, got: usize },
    /// The weighted moment (or covariance) matrix is singular - the point
    /// set does not affinely span the ambient space.
    SingularMoment { iteration: usize },
}

impl fmt::Display for MveeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MveeError::TooFewPoints { needed, got } => {
                write!(f, "need at least {} points, got {}", needed, got)
            }
            MveeError::SingularMoment { iteration } => write!(
                f,
                "weighted moment matrix is singular at iteration {} (degenerate point set)",
                iteration
            ),
        }
    }
}

impl std::error::Error for MveeError {}

/// Solver output: the fitted ellipsoid plus convergence bookkeeping.
#[derive(Clone, Debug)]
pub struct MveeSolution {
    pub ellipsoid: Ellipsoid,
    /// False when the iteration cap fired before the tolerance was met.
    pub converged: bool,
    /// Weight-update sweeps performed.
    pub iterations: usize,
}

/// Approximate minimum-volume enclosing ellipsoid of the columns of
/// `points` (d×m, one point per column).
///
/// `eps` is the relative optimality tolerance, `max_iter` the sweep cap.
/// The input must affinely span the ambient space (at minimum `d + 1`
/// affinely independent columns); degenerate sets surface as
/// [`MveeError::SingularMoment`].
pub fn minimum_enclosing_ellipsoid(
    points: &DMatrix<f64>,
    eps: f64,
    max_iter: usize,
) -> Result<MveeSolution, MveeError> {
    let d = points.nrows();
    let m = points.ncols();
    if m < d + 1 {
        return Err(MveeError::TooFewPoints { needed: d + 1, got: m });
    }

    // Homogeneous lift: q_i = (p_i, 1).
    let mut lifted = DMatrix::zeros(d + 1, m);
    lifted.view_mut((0, 0), (d, m)).copy_from(points);
    for j in 0..m {
        lifted[(d, j)] = 1.0;
    }

    let mut u = DVector::from_element(m, 1.0 / m as f64);
    let target = (d + 1) as f64;
    let mut converged = false;
    let mut iterations = 0;

    for it in 0..max_iter {
        iterations = it + 1;
        let moment = &lifted * DMatrix::from_diagonal(&u) * lifted.transpose();
        let moment_inv = moment
            .try_inverse()
            .ok_or(MveeError::SingularMoment { iteration: it })?;

        // Mahalanobis-type scores for every lifted point.
        let scored = &moment_inv * &lifted;
        let mut kappa = f64::NEG_INFINITY;
        let mut worst = 0;
        for j in 0..m {
            let s = lifted.column(j).dot(&scored.column(j));
            if s > kappa {
                kappa = s;
                worst = j;
            }
        }

        if (kappa - target) / target <= eps {
            converged = true;
            break;
        }

        // Shift weight toward the worst-covered point; this step provably
        // shrinks the enclosing volume.
        let step = (kappa - target) / (target * (kappa - 1.0));
        u *= 1.0 - step;
        u[worst] += step;
    }

    let center = points * &u;
    let cov = points * DMatrix::from_diagonal(&u) * points.transpose()
        - &center * center.transpose();
    let shape = (cov * d as f64)
        .try_inverse()
        .ok_or(MveeError::SingularMoment { iteration: iterations })?;
    // Symmetrize against round-off drift before downstream eigen/Cholesky.
    let q = (&shape + shape.transpose()) * 0.5;

    Ok(MveeSolution {
        ellipsoid: Ellipsoid { q, center },
        converged,
        iterations,
    })
}
