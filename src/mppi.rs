use log::warn;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::config::{Config, CostWeights, DynamicsParams, NoiseModel, PadMode};
use crate::dynamics::{self, PriceDraw};
use crate::errors::{ConfigError, PlanError};
use crate::{cost, Control, State};

// Cap for degenerate sample costs so a single bad rollout cannot push the
// softmin into non-finite territory.
const COST_CAP: f64 = 1e12;

/// Aggregate path-cost statistics for one planning pass.
#[derive(Debug, Clone, Copy)]
pub struct CostStats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    /// Effective sample size of the softmin weights, 1/sum(w^2).
    pub effective_samples: f64,
}

/// Result of one planning pass: the fused nominal sequence, the first
/// control to execute, and cost statistics for telemetry.
#[derive(Debug, Clone)]
pub struct Plan {
    pub nominal: Vec<Control>,
    pub decision: Control,
    pub stats: CostStats,
}

// MPPI (Model Predictive Path Integral) controller
pub struct Mppi {
    horizon: usize,
    samples: usize,
    lambda: f64,
    sigma: (f64, f64),
    limit: (f64, f64),
    dist_center: Normal<f64>,
    dist_width: Normal<f64>,
    noise: NoiseModel,
    params: DynamicsParams,
    weights: CostWeights,
}

impl Mppi {
    pub fn new(cfg: &Config) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let dist_center = Normal::new(0.0, cfg.noise.sigma_center)
            .map_err(|_| ConfigError::Sigma("sigma_center"))?;
        let dist_width = Normal::new(0.0, cfg.noise.sigma_width)
            .map_err(|_| ConfigError::Sigma("sigma_width"))?;
        Ok(Self {
            horizon: cfg.mppi.horizon,
            samples: cfg.mppi.samples,
            lambda: cfg.mppi.lambda,
            sigma: (cfg.noise.sigma_center, cfg.noise.sigma_width),
            limit: (cfg.mppi.limit_center, cfg.mppi.limit_width),
            dist_center,
            dist_width,
            noise: cfg.noise,
            params: cfg.dynamics,
            weights: cfg.weights,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// One receding-horizon planning pass: sample K perturbed control
    /// sequences around the nominal, roll each through the dynamics,
    /// softmin-fuse by path cost. Deterministic for a fixed seed.
    pub fn compute(&self, x: &State, nominal: &[Control], seed: u64) -> Result<Plan, PlanError> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PlanError::NonFiniteState);
        }
        debug_assert_eq!(nominal.len(), self.horizon);

        let rollouts = self.sample_and_evaluate(x, nominal, seed);
        let (fused, stats) = fuse(&rollouts, self.lambda);

        if fused.iter().any(|u| !u[0].is_finite() || !u[1].is_finite()) {
            return Err(PlanError::NonFiniteControl);
        }

        let decision = fused[0];
        Ok(Plan {
            nominal: fused,
            decision,
            stats,
        })
    }

    // Samples are mutually independent: each gets its own RNG stream keyed
    // on (seed, index), so the rayon schedule cannot change the result.
    fn sample_and_evaluate(
        &self,
        x: &State,
        nominal: &[Control],
        seed: u64,
    ) -> Vec<(Vec<Control>, f64)> {
        (0..self.samples)
            .into_par_iter()
            .map(|k| {
                let mut rng = Xoshiro256PlusPlus::seed_from_u64(
                    seed ^ (k as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
                );

                let v_n: Vec<Control> = nominal
                    .iter()
                    .map(|u| {
                        Control::new(
                            (u[0] + self.dist_center.sample(&mut rng))
                                .clamp(-self.limit.0, self.limit.0),
                            (u[1] + self.dist_width.sample(&mut rng))
                                .clamp(-self.limit.1, self.limit.1),
                        )
                    })
                    .collect();

                // Rollout: accumulate stage cost plus the control-energy
                // term lambda * u' Sigma^-1 v tied to the sampling noise.
                let mut s = 0.0;
                let mut x_c = *x;
                for (u, v) in nominal.iter().zip(&v_n) {
                    let draw = PriceDraw::sample(&mut rng, &self.noise);
                    x_c = dynamics::step(&x_c, v, draw, &self.params);
                    s += cost::stage(&x_c, v, &self.weights);
                    s += self.lambda * energy(u, v, self.sigma);
                }
                s += cost::terminal(&x_c, &self.weights);

                let s = if s.is_finite() { s.min(COST_CAP) } else { COST_CAP };
                (v_n, s)
            })
            .collect()
    }
}

// u' Sigma^-1 v for the diagonal noise covariance. Zero-sigma dimensions
// carry no perturbation and contribute no energy.
fn energy(u: &Control, v: &Control, sigma: (f64, f64)) -> f64 {
    let mut e = 0.0;
    if sigma.0 > 0.0 {
        e += u[0] * v[0] / (sigma.0 * sigma.0);
    }
    if sigma.1 > 0.0 {
        e += u[1] * v[1] / (sigma.1 * sigma.1);
    }
    e
}

// Softmin fusion around the best sample. With the min-cost baseline the
// weight sum is always >= 1, so normalization cannot fail; equal costs
// collapse to the uniform average through the same formula.
fn fuse(rollouts: &[(Vec<Control>, f64)], lambda: f64) -> (Vec<Control>, CostStats) {
    let k = rollouts.len();
    let beta = rollouts.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
    let max = rollouts
        .iter()
        .map(|(_, s)| *s)
        .fold(f64::NEG_INFINITY, f64::max);
    let mean = rollouts.iter().map(|(_, s)| *s).sum::<f64>() / k as f64;

    if max - beta <= 1e-12 * beta.abs().max(1.0) {
        warn!("sample cost spread is numerically negligible; fusing uniformly");
    }
    if max >= COST_CAP {
        warn!("at least one rollout cost was capped at {COST_CAP:e}");
    }

    let weights: Vec<f64> = rollouts
        .iter()
        .map(|(_, s)| (-(s - beta) / lambda).exp())
        .collect();
    let sum_w: f64 = weights.iter().sum();

    let h = rollouts.first().map_or(0, |(seq, _)| seq.len());
    let mut fused = vec![Control::zeros(); h];
    for ((seq, _), w) in rollouts.iter().zip(&weights) {
        let w = w / sum_w;
        for (f, v) in fused.iter_mut().zip(seq) {
            *f += v * w;
        }
    }

    let effective_samples = sum_w * sum_w / weights.iter().map(|w| w * w).sum::<f64>();
    (
        fused,
        CostStats {
            min: beta,
            mean,
            max,
            effective_samples,
        },
    )
}

/// End-of-cycle warm start: drop the executed first control, pad the tail
/// back to length H.
pub fn shift(nominal: &mut [Control], pad: PadMode) {
    let h = nominal.len();
    if h == 0 {
        return;
    }
    for t in 0..h - 1 {
        nominal[t] = nominal[t + 1];
    }
    if pad == PadMode::Zero {
        nominal[h - 1] = Control::zeros();
    }
}
