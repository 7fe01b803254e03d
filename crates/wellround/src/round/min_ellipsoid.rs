//! Single-pass minimum-ellipsoid rounding and the vertex centering fast
//! path.
//!
//! Procedure
//! - Vertex-represented bodies contribute their stored vertices directly.
//!   Otherwise a long burn-in walk (50·n steps) from a point on the inner
//!   ball's sphere finds a generic interior start, and 10·n walk samples
//!   form the fit set.
//! - The MVEE of the fit set gives the isotropy metric (eigenvalue spread of
//!   `Q`) and a Cholesky factor `L` with `L·L^T = Q`; translating by the
//!   negated center and applying `L^T` sends the fitted ellipsoid to the
//!   unit ball.
//! - `|det L^{-1}|` is the volume correction the caller owes the original
//!   body.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::body::Body;
use crate::cfg::RoundCfg;
use crate::ellipsoid::EllipsoidError;
use crate::khachiyan::minimum_enclosing_ellipsoid;
use crate::sample::{point_on_sphere, points_to_matrix, InnerBall, Sampler};

use super::{Rounded, RoundingError};

/// One rounding pass via the minimum enclosing ellipsoid of a sample set.
///
/// Returns the correction factor `|det L^{-1}|` and the achieved isotropy
/// `λ_min/λ_max`. Appropriate when a single fit already yields acceptable
/// isotropy; elongated bodies want [`super::round_adaptive`].
pub fn round_min_ellipsoid<B, S>(
    body: &mut B,
    ball: &InnerBall,
    cfg: &RoundCfg,
    sampler: &mut S,
) -> Result<Rounded, RoundingError>
where
    B: Body,
    S: Sampler<B>,
{
    let n = body.dimension();
    let points = match body.points_for_rounding() {
        Some(verts) => verts,
        None => {
            let mut rng = StdRng::seed_from_u64(cfg.seed);
            let start = &ball.center + point_on_sphere(&mut rng, n, ball.radius);
            // Burn-in: one long walk to forget the seed point.
            let burn = sampler.interior_points(body, &start, 1, 50 * n);
            let start = burn
                .into_iter()
                .next_back()
                .ok_or_else(|| RoundingError::DegenerateInput {
                    reason: "sampler produced no burn-in point".into(),
                })?;
            sampler.interior_points(body, &start, 10 * n, cfg.walk_len)
        }
    };

    let mat = points_to_matrix(&points, n)?;
    let sol = minimum_enclosing_ellipsoid(&mat, cfg.ellipsoid_eps, cfg.ellipsoid_cap)?;
    if !sol.converged {
        debug!(
            iterations = sol.iterations,
            "ellipsoid solver hit its cap; using best fit"
        );
    }

    let (min_eig, max_eig) = sol.ellipsoid.axis_bounds()?;
    let l = sol.ellipsoid.ball_map()?;
    // `L^T` sends the fitted ellipsoid to the unit ball; the volume owed
    // back to the original body is |det L^{-1}| = 1/|det L|.
    let det_l = l.determinant().abs();
    if det_l <= f64::MIN_POSITIVE {
        return Err(RoundingError::from(EllipsoidError::SingularMap));
    }
    let correction = det_l.recip();

    let recentred = body.shift(&(-&sol.ellipsoid.center));
    let rounded = recentred
        .linear_transform(&l.transpose())
        .ok_or_else(|| RoundingError::SingularTransform {
            reason: "ellipsoid ball map produced a singular body transform".into(),
        })?;
    *body = rounded;

    let isotropy = min_eig / max_eig;
    if cfg.verbose {
        info!(correction, isotropy, "min-ellipsoid rounding pass");
    } else {
        debug!(correction, isotropy, "min-ellipsoid rounding pass");
    }
    Ok(Rounded {
        correction_factor: correction,
        isotropy_ratio: isotropy,
        converged: sol.converged,
    })
}

/// Centering fast path for vertex-represented bodies: fit the MVEE to the
/// stored vertices and translate the center to the origin. No linear
/// transform is applied, so this is not a substitute for full rounding.
pub fn center_vertex_body<B: Body>(body: &mut B, cfg: &RoundCfg) -> Result<(), RoundingError> {
    let verts = body
        .points_for_rounding()
        .ok_or(RoundingError::NoStoredVertices)?;
    let mat = points_to_matrix(&verts, body.dimension())?;
    let sol = minimum_enclosing_ellipsoid(&mat, cfg.ellipsoid_eps, cfg.ellipsoid_cap)?;
    debug!(
        center_norm = sol.ellipsoid.center.norm(),
        "centering vertex body on its MVEE center"
    );
    *body = body.shift(&(-sol.ellipsoid.center));
    Ok(())
}
