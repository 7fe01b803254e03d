//! Rounding subsystem for randomized convex-body volume estimation.
//!
//! Randomized-walk volume estimators mix in polynomial time only on bodies
//! whose axis ratio is bounded. This crate turns an arbitrarily skewed
//! convex body into such a well-rounded one: it samples the body through a
//! caller-supplied walk, fits the minimum-volume enclosing ellipsoid
//! (Khachiyan's algorithm), derives a linear map that pushes the ellipsoid
//! toward a ball, and tracks the accumulated determinant so the estimated
//! volume can be rescaled back to the original body.
//!
//! The body itself, the walk kernel, and the Chebyshev-ball LP stay outside:
//! they enter through the [`body::Body`], [`sample::Sampler`], and
//! [`sample::InnerBallOracle`] seams.

pub mod body;
pub mod cfg;
pub mod ellipsoid;
pub mod khachiyan;
pub mod round;
pub mod sample;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::body::Body;
    pub use crate::cfg::RoundCfg;
    pub use crate::ellipsoid::{Ellipsoid, EllipsoidError};
    pub use crate::khachiyan::{minimum_enclosing_ellipsoid, MveeError, MveeSolution};
    pub use crate::round::{
        center_vertex_body, round, round_adaptive, round_boundary_projection,
        round_min_ellipsoid, BoundaryRounded, RoundStrategy, Rounded, RoundingError,
    };
    pub use crate::sample::{InnerBall, InnerBallOracle, Sampler};
}
