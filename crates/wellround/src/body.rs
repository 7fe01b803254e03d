//! Convex-body capability seam.
//!
//! The rounding core never looks inside a body; it only needs the small
//! capability set below. Transforms return new values instead of mutating in
//! place, so a driver can thread working copies by ownership and write the
//! caller's body exactly once, at the end of a successful pass.

use nalgebra::{DMatrix, DVector};

/// Capabilities the rounding drivers require from a convex body.
///
/// Invariants:
/// - `shift(v)` translates the body by `+v` (callers pass the negated
///   ellipsoid center to recenter at the origin).
/// - `linear_transform(m)` yields `{m·x : x ∈ body}`, or `None` when `m` is
///   singular (the image would not be a full-dimensional body).
pub trait Body: Sized {
    /// Ambient dimension.
    fn dimension(&self) -> usize;

    /// Translate by `v`, returning the translated body.
    fn shift(&self, v: &DVector<f64>) -> Self;

    /// Image of the body under the linear map `m`, or `None` if `m` is
    /// singular.
    fn linear_transform(&self, m: &DMatrix<f64>) -> Option<Self>;

    /// The stored vertex set, for bodies kept in vertex representation.
    /// Returning `Some` lets the drivers skip the sampling step entirely.
    fn points_for_rounding(&self) -> Option<Vec<DVector<f64>>> {
        None
    }
}
