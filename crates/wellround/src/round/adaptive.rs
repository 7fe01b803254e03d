//! Adaptive iterative rounding via singular-value profiles.
//!
//! Why this driver exists
//! - One MVEE fit can be a poor global approximation of a very elongated
//!   body. This driver iterates: sample, read the axis profile off an SVD,
//!   fold the per-axis shrink into an accumulated transform, and stop only
//!   once every axis scale is within a factor 2 of the smallest.
//! - Sample budgets escalate (doubling) when progress stalls, trading
//!   sampling cost for a guaranteed bound on the final axis ratio.
//!
//! Model
//! - The loop is an explicit state machine (`Phase`): Sampling → Fitting →
//!   CheckingIsotropy, branching to Done, to Escalating (budget doubling),
//!   or back to Sampling. Each `step` call performs one transition, so a
//!   single iteration is unit-testable in isolation.
//! - The caller's body is never touched during the loop. Working copies are
//!   produced per iteration by mapping the original through the accumulated
//!   transform; the one-and-only write happens on Done.
//! - Convention: the accumulated matrix `T` satisfies
//!   `working = {T^{-1}·x : x ∈ body}` and grows by `T ← T·V·S` per
//!   iteration (V = right singular vectors of the sample matrix, S the
//!   per-axis scale profile σ_i/σ_min). `|det T|` is the volume correction.

use nalgebra::{DMatrix, DVector, SVD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::body::Body;
use crate::cfg::{RoundCfg, SV_EPS};
use crate::sample::{point_on_sphere, InnerBallOracle, Sampler};

use super::{Rounded, RoundingError};

/// Axis-ratio bound that counts as well-rounded.
const WELL_ROUNDED: f64 = 2.0;

/// Phases of the adaptive rounding loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Map a working copy through `T^{-1}`, re-solve its inner ball, draw
    /// the current sample budget at walk length 1.
    Sampling,
    /// SVD of the centered sample matrix; extract V and the scale profile.
    Fitting,
    /// Accept if every scale entry ≤ 2, else fold the profile into `T`.
    CheckingIsotropy,
    /// Progress stalled: double the sample budget, reset the try counter.
    Escalating,
    /// Loop finished; the accumulated transform is ready to apply.
    Done,
    /// A numerical failure was surfaced; the driver must not continue.
    Failed,
}

/// State threaded through the adaptive loop; one value per rounding call.
pub struct AdaptiveRounder {
    dim: usize,
    phase: Phase,
    /// Accumulated transform `T` (identity at start).
    transform: DMatrix<f64>,
    /// Current per-iteration sample budget `t` (starts at 8n³).
    sample_budget: usize,
    tries: u32,
    /// Try threshold ⌈log₂ R⌉; estimated from the first sample batch.
    try_cap: Option<u32>,
    iterations: usize,
    rng: StdRng,
    // Scratch carried between phases of one iteration.
    samples: Vec<DVector<f64>>,
    ball_center: DVector<f64>,
    ball_radius: f64,
    profile: Option<(DMatrix<f64>, DVector<f64>)>,
    max_scale: f64,
    converged: bool,
}

impl AdaptiveRounder {
    pub fn new(dim: usize, cfg: &RoundCfg) -> Self {
        Self {
            dim,
            phase: Phase::Sampling,
            transform: DMatrix::identity(dim, dim),
            sample_budget: 8 * dim * dim * dim,
            tries: 0,
            try_cap: None,
            iterations: 0,
            rng: StdRng::seed_from_u64(cfg.seed),
            samples: Vec::new(),
            ball_center: DVector::zeros(dim),
            ball_radius: 0.0,
            profile: None,
            max_scale: f64::INFINITY,
            converged: false,
        }
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn sample_budget(&self) -> usize {
        self.sample_budget
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// The accumulated transform `T`.
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.transform
    }

    /// Perform one state transition. Errors put the machine into `Failed`
    /// and must not be retried with the same inputs.
    pub fn step<B, S, O>(
        &mut self,
        body: &B,
        cfg: &RoundCfg,
        sampler: &mut S,
        oracle: &mut O,
    ) -> Result<Phase, RoundingError>
    where
        B: Body,
        S: Sampler<B>,
        O: InnerBallOracle<B>,
    {
        let next = match self.phase {
            Phase::Sampling => self.do_sample(body, sampler, oracle),
            Phase::Fitting => self.do_fit(),
            Phase::CheckingIsotropy => self.do_check(cfg),
            Phase::Escalating => {
                self.sample_budget *= 2;
                self.tries = 0;
                debug!(budget = self.sample_budget, "escalating sample budget");
                Ok(Phase::Sampling)
            }
            Phase::Done | Phase::Failed => Ok(self.phase),
        };
        match next {
            Ok(phase) => {
                self.phase = phase;
                Ok(phase)
            }
            Err(err) => {
                self.phase = Phase::Failed;
                Err(err)
            }
        }
    }

    fn do_sample<B, S, O>(
        &mut self,
        body: &B,
        sampler: &mut S,
        oracle: &mut O,
    ) -> Result<Phase, RoundingError>
    where
        B: Body,
        S: Sampler<B>,
        O: InnerBallOracle<B>,
    {
        let inv = self.transform.clone().try_inverse().ok_or_else(|| {
            RoundingError::SingularTransform {
                reason: "accumulated rounding transform is singular".into(),
            }
        })?;
        let working = body
            .linear_transform(&inv)
            .ok_or_else(|| RoundingError::SingularTransform {
                reason: "body rejected the accumulated transform".into(),
            })?;
        let ball = oracle.inner_ball(&working)?;
        let start = &ball.center + point_on_sphere(&mut self.rng, self.dim, ball.radius);
        self.samples = sampler.interior_points(&working, &start, self.sample_budget, 1);
        if self.samples.len() < self.dim {
            return Err(RoundingError::DegenerateInput {
                reason: format!(
                    "sampler produced {} points, need at least {}",
                    self.samples.len(),
                    self.dim
                ),
            });
        }
        self.ball_center = ball.center;
        self.ball_radius = ball.radius;
        Ok(Phase::Fitting)
    }

    fn do_fit(&mut self) -> Result<Phase, RoundingError> {
        // First batch fixes the escalation threshold: R is the radius ratio
        // of the sampled cloud to the inner ball.
        if self.try_cap.is_none() {
            let max_dist = self
                .samples
                .iter()
                .map(|p| (p - &self.ball_center).norm())
                .fold(0.0, f64::max);
            let ratio = (max_dist / self.ball_radius).max(2.0);
            let cap = ratio.log2().ceil() as u32;
            debug!(radius_ratio = ratio, try_cap = cap, "escalation threshold");
            self.try_cap = Some(cap);
        }

        // Sample matrix with one centered point per row.
        let m = self.samples.len();
        let mut mat = DMatrix::zeros(m, self.dim);
        for (i, p) in self.samples.iter().enumerate() {
            let centered = p - &self.ball_center;
            for j in 0..self.dim {
                mat[(i, j)] = centered[j];
            }
        }
        let svd = SVD::new(mat, false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| RoundingError::MalformedEllipsoid {
                reason: "SVD of the sample matrix did not converge".into(),
            })?;
        let sigma = svd.singular_values;
        let sigma_min = sigma.iter().cloned().fold(f64::INFINITY, f64::min);
        let sigma_max = sigma.iter().cloned().fold(0.0, f64::max);
        if sigma_min <= SV_EPS * sigma_max {
            return Err(RoundingError::DegenerateInput {
                reason: "sample cloud is rank-deficient (flat along some axis)".into(),
            });
        }
        let profile = sigma.map(|s| s / sigma_min);
        self.max_scale = sigma_max / sigma_min;
        self.profile = Some((v_t.transpose(), profile));
        Ok(Phase::CheckingIsotropy)
    }

    fn do_check(&mut self, cfg: &RoundCfg) -> Result<Phase, RoundingError> {
        self.iterations += 1;
        let (v, profile) = self
            .profile
            .take()
            .ok_or_else(|| RoundingError::MalformedEllipsoid {
                reason: "isotropy check without a fitted profile".into(),
            })?;

        if cfg.verbose {
            info!(
                iteration = self.iterations,
                max_scale = self.max_scale,
                budget = self.sample_budget,
                "adaptive rounding iteration"
            );
        } else {
            debug!(
                iteration = self.iterations,
                max_scale = self.max_scale,
                budget = self.sample_budget,
                "adaptive rounding iteration"
            );
        }

        if self.max_scale <= WELL_ROUNDED {
            self.converged = true;
            return Ok(Phase::Done);
        }

        // Fold this iteration's per-axis shrink into the accumulation.
        self.transform = &self.transform * v * DMatrix::from_diagonal(&profile);

        if self.iterations >= cfg.max_iters {
            // Bounded retries: give back the best transform found so far.
            // `max_scale` keeps the spread measured before this last fold;
            // the folded state was never re-sampled, so that is the last
            // isotropy actually observed.
            self.converged = false;
            return Ok(Phase::Done);
        }

        self.tries += 1;
        if self.tries > self.try_cap.unwrap_or(1) {
            return Ok(Phase::Escalating);
        }
        Ok(Phase::Sampling)
    }
}

/// Iterative SVD rounding: drives the state machine to completion, applies
/// `T^{-1}` to the caller's body exactly once, and reports `|det T|`.
pub fn round_adaptive<B, S, O>(
    body: &mut B,
    cfg: &RoundCfg,
    sampler: &mut S,
    oracle: &mut O,
) -> Result<Rounded, RoundingError>
where
    B: Body,
    S: Sampler<B>,
    O: InnerBallOracle<B>,
{
    let mut state = AdaptiveRounder::new(body.dimension(), cfg);
    loop {
        match state.step(body, cfg, sampler, oracle)? {
            Phase::Done => break,
            Phase::Failed => unreachable!("step returns Err before entering Failed"),
            _ => continue,
        }
    }

    let inv = state.transform.clone().try_inverse().ok_or_else(|| {
        RoundingError::SingularTransform {
            reason: "accumulated rounding transform is singular".into(),
        }
    })?;
    let rounded = body
        .linear_transform(&inv)
        .ok_or_else(|| RoundingError::SingularTransform {
            reason: "body rejected the final rounding transform".into(),
        })?;
    *body = rounded;

    Ok(Rounded {
        correction_factor: state.transform.determinant().abs(),
        isotropy_ratio: 1.0 / state.max_scale,
        converged: state.converged,
    })
}

#[cfg(test)]
mod tests {
    use super::{round_adaptive, AdaptiveRounder, Phase};
    use crate::body::fixtures::{BoxBody, BoxOracle, BoxSampler};
    use crate::body::Body;
    use crate::cfg::RoundCfg;
    use nalgebra::DMatrix;

    fn cfg(seed: u64, n: usize) -> RoundCfg {
        RoundCfg {
            seed,
            ..RoundCfg::for_dimension(n)
        }
    }

    #[test]
    fn cube_accepts_in_one_iteration() {
        let cube = BoxBody::axis_aligned(&[1.0, 1.0, 1.0]);
        let cfg = cfg(17, 3);
        let mut sampler = BoxSampler::seeded(17);
        let mut oracle = BoxOracle;
        let mut state = AdaptiveRounder::new(3, &cfg);

        assert_eq!(state.phase(), Phase::Sampling);
        assert_eq!(
            state.step(&cube, &cfg, &mut sampler, &mut oracle).unwrap(),
            Phase::Fitting
        );
        assert_eq!(
            state.step(&cube, &cfg, &mut sampler, &mut oracle).unwrap(),
            Phase::CheckingIsotropy
        );
        assert_eq!(
            state.step(&cube, &cfg, &mut sampler, &mut oracle).unwrap(),
            Phase::Done
        );
        assert_eq!(state.iterations(), 1);
        // Accepting without an update leaves T = I.
        assert!((state.transform() - DMatrix::identity(3, 3)).norm() < 1e-12);
    }

    #[test]
    fn idempotent_on_a_round_body() {
        let mut cube = BoxBody::axis_aligned(&[1.0, 1.0, 1.0]);
        let cfg = cfg(23, 3);
        let mut sampler = BoxSampler::seeded(23);
        let r = round_adaptive(&mut cube, &cfg, &mut sampler, &mut BoxOracle).unwrap();
        assert!(r.converged);
        assert!((r.correction_factor - 1.0).abs() < 1e-9);
        assert!(r.isotropy_ratio >= 0.5);
    }

    #[test]
    fn elongated_box_is_driven_below_ratio_two() {
        let mut long = BoxBody::axis_aligned(&[1.0, 1.0, 100.0]);
        let det_before = long.map_det_abs();
        let cfg = cfg(31, 3);
        let mut sampler = BoxSampler::seeded(31);
        let r = round_adaptive(&mut long, &cfg, &mut sampler, &mut BoxOracle).unwrap();

        assert!(r.converged, "adaptive rounding did not converge");
        assert!(r.isotropy_ratio >= 0.5, "isotropy {}", r.isotropy_ratio);

        // correction = |det T| must match the determinant change the body
        // actually saw (body_after = T^{-1} body_before).
        let det_after = long.map_det_abs();
        let applied = det_before / det_after;
        assert!(
            (applied - r.correction_factor).abs() / applied < 1e-9,
            "correction {} vs applied {}",
            r.correction_factor,
            applied
        );
        // The long axis had to shrink by roughly its excess ratio.
        assert!(r.correction_factor > 10.0);
    }

    #[test]
    fn escalation_doubles_the_budget() {
        let cube = BoxBody::axis_aligned(&[1.0, 1.0]);
        let cfg = cfg(5, 2);
        let mut sampler = BoxSampler::seeded(5);
        let mut oracle = BoxOracle;
        let mut state = AdaptiveRounder::new(2, &cfg);
        let before = state.sample_budget();
        // Force the escalation transition directly.
        state.phase = Phase::Escalating;
        assert_eq!(
            state.step(&cube, &cfg, &mut sampler, &mut oracle).unwrap(),
            Phase::Sampling
        );
        assert_eq!(state.sample_budget(), before * 2);
    }

    #[test]
    fn degenerate_samples_put_the_machine_into_failed() {
        use crate::round::RoundingError;
        use crate::sample::Sampler;
        use nalgebra::DVector;

        struct ConstSampler;
        impl Sampler<BoxBody> for ConstSampler {
            fn interior_points(
                &mut self,
                _: &BoxBody,
                _: &DVector<f64>,
                count: usize,
                _: usize,
            ) -> Vec<DVector<f64>> {
                vec![DVector::zeros(2); count]
            }
            fn boundary_points(
                &mut self,
                _: &BoxBody,
                _: &DVector<f64>,
                _: usize,
                _: usize,
            ) -> Vec<DVector<f64>> {
                unreachable!()
            }
        }

        let cube = BoxBody::axis_aligned(&[1.0, 1.0]);
        let cfg = cfg(1, 2);
        let mut sampler = ConstSampler;
        let mut oracle = BoxOracle;
        let mut state = AdaptiveRounder::new(2, &cfg);
        assert_eq!(
            state.step(&cube, &cfg, &mut sampler, &mut oracle).unwrap(),
            Phase::Fitting
        );
        let err = state
            .step(&cube, &cfg, &mut sampler, &mut oracle)
            .unwrap_err();
        assert!(matches!(err, RoundingError::DegenerateInput { .. }));
        assert_eq!(state.phase(), Phase::Failed);
    }

    #[test]
    fn iteration_cap_reports_nonconvergence() {
        let mut long = BoxBody::axis_aligned(&[1.0, 1.0, 50.0]);
        let cfg = RoundCfg {
            seed: 7,
            max_iters: 1,
            ..RoundCfg::for_dimension(3)
        };
        let mut sampler = BoxSampler::seeded(7);
        let det_before = long.map_det_abs();
        let r = round_adaptive(&mut long, &cfg, &mut sampler, &mut BoxOracle).unwrap();
        assert!(!r.converged);
        // The single permitted update was still applied to the body.
        assert!(r.correction_factor > 1.0);
        assert!((det_before / long.map_det_abs() - r.correction_factor).abs() < 1e-9);
        // The reported ratio is the spread measured before that update: for
        // a 50:1 box the first fit is far from well-rounded.
        assert!(r.isotropy_ratio < 0.5, "isotropy {}", r.isotropy_ratio);
    }
}
