//! Rounding drivers: bring a skewed convex body close to a ball.
//!
//! Three strategies share the same skeleton: sample the body, fit the
//! minimum enclosing ellipsoid (or a singular-value profile), derive a linear
//! map, track its determinant so the volume estimate can be rescaled back to
//! the original body:
//! - [`min_ellipsoid::round_min_ellipsoid`]: one MVEE fit, one transform.
//! - [`adaptive::round_adaptive`]: iterated SVD rounding with escalating
//!   sample budgets until the axis ratio is ≤ 2.
//! - [`boundary::round_boundary_projection`]: boundary-sample variant that
//!   also returns a diameter estimate.
//! Plus [`min_ellipsoid::center_vertex_body`], a translate-only fast path
//! for vertex-represented bodies.
//!
//! Every driver writes the caller's body exactly once, on success; working
//! copies are threaded by value in between.

use std::fmt;

use crate::body::Body;
use crate::cfg::RoundCfg;
use crate::ellipsoid::EllipsoidError;
use crate::khachiyan::MveeError;
use crate::sample::{InnerBall, InnerBallOracle, Sampler};

pub mod adaptive;
pub mod boundary;
pub mod min_ellipsoid;

pub use adaptive::round_adaptive;
pub use boundary::{round_boundary_projection, BoundaryRounded};
pub use min_ellipsoid::{center_vertex_body, round_min_ellipsoid};

/// Failures of the rounding drivers.
#[derive(Debug)]
pub enum RoundingError {
    /// Sample/vertex set cannot support an ellipsoid fit (empty, wrong
    /// dimension, or no full-dimensional affine span).
    DegenerateInput { reason: String },
    /// A fitted shape matrix failed eigen/Cholesky decomposition; upstream
    /// numerics are corrupt and the result must not be used.
    MalformedEllipsoid { reason: String },
    /// A derived or accumulated linear map is not invertible.
    SingularTransform { reason: String },
    /// The vertex fast path was called on a body that stores no vertices.
    NoStoredVertices,
}

impl fmt::Display for RoundingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingError::DegenerateInput { reason } => {
                write!(f, "degenerate rounding input: {reason}")
            }
            RoundingError::MalformedEllipsoid { reason } => {
                write!(f, "malformed ellipsoid: {reason}")
            }
            RoundingError::SingularTransform { reason } => {
                write!(f, "singular rounding transform: {reason}")
            }
            RoundingError::NoStoredVertices => {
                write!(f, "body does not expose a stored vertex set")
            }
        }
    }
}

impl std::error::Error for RoundingError {}

impl From<MveeError> for RoundingError {
    fn from(err: MveeError) -> Self {
        RoundingError::DegenerateInput {
            reason: err.to_string(),
        }
    }
}

impl From<EllipsoidError> for RoundingError {
    fn from(err: EllipsoidError) -> Self {
        RoundingError::MalformedEllipsoid {
            reason: err.to_string(),
        }
    }
}

/// Outcome of an interior rounding pass.
#[derive(Clone, Copy, Debug)]
pub struct Rounded {
    /// |det| of the accumulated linear map; multiply a volume computed on
    /// the rounded body by this to recover the original body's volume.
    pub correction_factor: f64,
    /// Achieved isotropy in (0, 1]: smallest over largest principal axis
    /// scale; 1 is a perfect ball, ≥ 0.5 counts as well-rounded.
    pub isotropy_ratio: f64,
    /// False when an iteration cap fired before the quality target was met.
    /// The body then still receives the last corrective update, but
    /// `isotropy_ratio` reports the spread measured just before it: the last
    /// value that was actually sampled, not a prediction for the unverified
    /// final state.
    pub converged: bool,
}

/// Strategy selector for [`round`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundStrategy {
    /// Single MVEE fit (sufficient for mildly skewed bodies).
    MinEllipsoid,
    /// Iterated SVD rounding with a guaranteed axis-ratio bound of 2.
    Adaptive,
}

/// Primary entry point: round `body` in place and report the volume
/// correction factor plus the achieved isotropy.
pub fn round<B, S, O>(
    body: &mut B,
    ball: &InnerBall,
    cfg: &RoundCfg,
    sampler: &mut S,
    oracle: &mut O,
    strategy: RoundStrategy,
) -> Result<Rounded, RoundingError>
where
    B: Body,
    S: Sampler<B>,
    O: InnerBallOracle<B>,
{
    match strategy {
        RoundStrategy::MinEllipsoid => round_min_ellipsoid(body, ball, cfg, sampler),
        RoundStrategy::Adaptive => round_adaptive(body, cfg, sampler, oracle),
    }
}
