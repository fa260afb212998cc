use rand::Rng;
use rand_distr::StandardNormal;

use crate::config::{DynamicsParams, NoiseModel};
use crate::{tick, Control, State};

/// One explicit random draw for a dynamics step: the multiplicative price
/// factor applied to the market price. Keeping the draw outside `step` keeps
/// the dynamics pure and the rollouts trivially parallel.
#[derive(Debug, Clone, Copy)]
pub struct PriceDraw {
    pub factor: f64,
}

impl PriceDraw {
    /// No price movement.
    pub const FLAT: PriceDraw = PriceDraw { factor: 1.0 };

    /// Lognormal diffusion combined with a rare lognormal jump, clamped into
    /// the configured band to exclude pathological outliers.
    pub fn sample<R: Rng>(rng: &mut R, noise: &NoiseModel) -> Self {
        let z: f64 = rng.sample(StandardNormal);
        let mut factor = (noise.diffusion_sigma * z).exp();
        if noise.jump_prob > 0.0 && rng.gen::<f64>() < noise.jump_prob {
            let zj: f64 = rng.sample(StandardNormal);
            factor *= (noise.jump_sigma * zj).exp();
        }
        Self {
            factor: factor.clamp(noise.factor_band.0, noise.factor_band.1),
        }
    }
}

/// One step of the pool/market dynamics. Pure and deterministic given the
/// draw; callers reject non-finite inputs before invocation.
pub fn step(x: &State, u: &Control, draw: PriceDraw, p: &DynamicsParams) -> State {
    let market = x[0] + tick::tick_delta(draw.factor);

    let center = x[2] + u[0];
    let half = (x[3] + u[1]).max(p.min_half_width);

    // Tracking gain grows with the deviation relative to the range width and
    // saturates when the pool is far behind the market.
    let rel_dev = (market - x[1]).abs() / (2.0 * half).max(1e-6);
    let k = p.k0 + p.k1 * (2.0 * rel_dev).tanh();
    let pool = (x[1] + k * (market - x[1])).clamp(center - half, center + half);

    State::new(market, pool, center, half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn params() -> DynamicsParams {
        DynamicsParams::default()
    }

    #[test]
    fn half_width_never_drops_below_floor() {
        let p = params();
        let x = State::new(78240.0, 78240.0, 78240.0, p.min_half_width);
        let u = Control::new(0.0, -3000.0);
        let next = step(&x, &u, PriceDraw::FLAT, &p);
        assert_eq!(next[3], p.min_half_width);
    }

    #[test]
    fn pool_tick_stays_inside_updated_range() {
        let p = params();
        let noise = NoiseModel::default();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut x = State::new(78240.0, 78240.0, 78240.0, 2000.0);
        for _ in 0..500 {
            let u = Control::new(
                rng.gen_range(-600.0..600.0),
                rng.gen_range(-600.0..600.0),
            );
            let draw = PriceDraw::sample(&mut rng, &noise);
            x = step(&x, &u, draw, &p);
            assert!(x[1] >= x[2] - x[3] - 1e-9);
            assert!(x[1] <= x[2] + x[3] + 1e-9);
            assert!(x.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn pool_tracks_market_under_flat_draw() {
        let p = params();
        let x = State::new(80000.0, 78000.0, 78500.0, 2000.0);
        let next = step(&x, &Control::zeros(), PriceDraw::FLAT, &p);
        assert!(next[1] > x[1]);
        assert!(next[1] <= next[2] + next[3]);
    }

    #[test]
    fn draw_factor_respects_band() {
        let noise = NoiseModel {
            jump_prob: 1.0,
            jump_sigma: 2.0,
            ..NoiseModel::default()
        };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..200 {
            let d = PriceDraw::sample(&mut rng, &noise);
            assert!(d.factor >= noise.factor_band.0 && d.factor <= noise.factor_band.1);
        }
    }
}
