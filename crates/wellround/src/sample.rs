//! Sampling seam: walk and inner-ball collaborators, seed points, and
//! point-set packing.
//!
//! Purpose
//! - The random-walk kernel and the Chebyshev-ball LP live outside this
//!   crate. The drivers talk to them through the two traits below, which
//!   keeps every rounding procedure deterministic given a sampler.
//! - `points_to_matrix` is the single place where a sampled point list is
//!   checked for shape before it reaches the ellipsoid solver.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;

use crate::body::Body;
use crate::round::RoundingError;

/// Random-walk point source over a body.
///
/// Implementations must return points in generation order; the boundary
/// driver's diameter estimate pairs consecutive samples.
pub trait Sampler<B: Body> {
    /// `count` approximately-uniform interior points, each produced by a walk
    /// of `walk_len` steps starting from `start`.
    fn interior_points(
        &mut self,
        body: &B,
        start: &DVector<f64>,
        count: usize,
        walk_len: usize,
    ) -> Vec<DVector<f64>>;

    /// Boundary variant of `interior_points`.
    fn boundary_points(
        &mut self,
        body: &B,
        start: &DVector<f64>,
        count: usize,
        walk_len: usize,
    ) -> Vec<DVector<f64>>;
}

/// A ball known to be contained in the body (Chebyshev ball or similar).
#[derive(Clone, Debug)]
pub struct InnerBall {
    pub center: DVector<f64>,
    pub radius: f64,
}

/// Largest-inscribed-ball solver (externally an LP; exact oracles in tests).
pub trait InnerBallOracle<B: Body> {
    fn inner_ball(&mut self, body: &B) -> Result<InnerBall, RoundingError>;
}

/// Uniform point on the sphere of the given radius around the origin.
///
/// Direction via normalized symmetric components, resampling the rare
/// near-zero draw.
pub fn point_on_sphere(rng: &mut StdRng, dim: usize, radius: f64) -> DVector<f64> {
    loop {
        let v = DVector::from_fn(dim, |_, _| rng.gen_range(-1.0..1.0f64));
        let norm = v.norm();
        if norm > 1e-9 {
            return v * (radius / norm);
        }
    }
}

/// Pack points into the d×m column matrix the ellipsoid solver consumes.
///
/// Fails on an empty set or on any point of the wrong dimension; both are
/// degenerate inputs the solver must never see.
pub fn points_to_matrix(
    points: &[DVector<f64>],
    dim: usize,
) -> Result<DMatrix<f64>, RoundingError> {
    if points.is_empty() {
        return Err(RoundingError::DegenerateInput {
            reason: "empty sample set".into(),
        });
    }
    let mut mat = DMatrix::zeros(dim, points.len());
    for (j, p) in points.iter().enumerate() {
        if p.len() != dim {
            return Err(RoundingError::DegenerateInput {
                reason: format!("point {} has dimension {} (expected {})", j, p.len(), dim),
            });
        }
        mat.set_column(j, p);
    }
    Ok(mat)
}
