use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Jump-diffusion perturbation model: diagonal control noise plus the price
/// process parameters. Immutable for the lifetime of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseModel {
    /// Std dev of the d_center perturbation, in ticks.
    pub sigma_center: f64,
    /// Std dev of the d_half_width perturbation, in ticks.
    pub sigma_width: f64,
    /// Per-step lognormal diffusion volatility of the market price.
    pub diffusion_sigma: f64,
    /// Probability of a jump at each step.
    pub jump_prob: f64,
    /// Lognormal std dev of the jump size.
    pub jump_sigma: f64,
    /// Price factors outside this band are clamped.
    pub factor_band: (f64, f64),
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            sigma_center: 120.0,
            sigma_width: 120.0,
            diffusion_sigma: 0.02,
            jump_prob: 0.05,
            jump_sigma: 0.10,
            factor_band: (0.7, 1.3),
        }
    }
}

/// Cost-model weights and thresholds. Every numeric term of the stage and
/// terminal cost lives here; the cost functions carry no literals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Reward (subtracted) while the pool tick is strictly inside the range.
    pub fee_reward: f64,
    /// Quadratic weight on (market - pool), the IL proxy.
    pub tracking: f64,
    /// Distance from an edge, in ticks, that counts as a boundary hit.
    pub boundary_eps: f64,
    pub boundary_penalty: f64,
    /// Buffer from the edges inside which the proximity term activates.
    pub proximity_buffer: f64,
    pub proximity: f64,
    /// Quadratic weight on the distance to the nearest bound when the market
    /// tick is outside the range. Heavier than `tracking`.
    pub market_outside: f64,
    /// |d_center| + |d_half_width| above this triggers the rebalance penalty.
    /// The loop reuses the same threshold as its execution deadband.
    pub rebalance_threshold: f64,
    pub rebalance_penalty: f64,
    pub terminal_tracking: f64,
    pub terminal_width: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            fee_reward: 0.01,
            tracking: 5e-5,
            boundary_eps: 1.0,
            boundary_penalty: 0.05,
            proximity_buffer: 120.0,
            proximity: 2e-5,
            market_outside: 5e-4,
            rebalance_threshold: 120.0,
            rebalance_penalty: 0.002,
            terminal_tracking: 5e-5,
            terminal_width: 2e-4,
        }
    }
}

/// Pool tracking dynamics parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsParams {
    /// Base tracking gain.
    pub k0: f64,
    /// Gain increment saturating with the normalized deviation.
    pub k1: f64,
    /// Floor on the half-width, in ticks.
    pub min_half_width: f64,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            k0: 0.2,
            k1: 0.75,
            min_half_width: 120.0,
        }
    }
}

/// Sampling controller parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MppiConfig {
    /// Horizon length H.
    pub horizon: usize,
    /// Sample count K.
    pub samples: usize,
    /// Softmin temperature.
    pub lambda: f64,
    /// Symmetric per-step bound on d_center, in ticks.
    pub limit_center: f64,
    /// Symmetric per-step bound on d_half_width, in ticks.
    pub limit_width: f64,
}

impl Default for MppiConfig {
    fn default() -> Self {
        Self {
            horizon: 8,
            samples: 4096,
            lambda: 1.0,
            limit_center: 600.0,
            limit_width: 600.0,
        }
    }
}

/// How the nominal sequence is padded after the end-of-cycle left shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    RepeatLast,
    Zero,
}

/// Receding-horizon loop parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Cooldown between cycles, in seconds.
    pub cycle_period_secs: f64,
    /// Market snapshots older than this are rejected.
    pub staleness_secs: f64,
    /// A rebalance is forced once this much time has passed without one,
    /// even when the planned change is below the deadband.
    pub max_rebalance_secs: f64,
    pub tick_spacing: i32,
    /// Half-width assumed when no position is active yet.
    pub bootstrap_half_width: f64,
    /// Liquidity amount handed to the ledger gateway per rebalance.
    pub liquidity: f64,
    pub pad: PadMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle_period_secs: 3.0,
            staleness_secs: 10.0,
            max_rebalance_secs: 600.0,
            tick_spacing: 60,
            bootstrap_half_width: 2000.0,
            liquidity: 1.0,
            pad: PadMode::RepeatLast,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mppi: MppiConfig,
    pub noise: NoiseModel,
    pub weights: CostWeights,
    pub dynamics: DynamicsParams,
    pub cycle: LoopConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mppi.horizon == 0 {
            return Err(ConfigError::Horizon);
        }
        if self.mppi.samples == 0 {
            return Err(ConfigError::Samples);
        }
        if !(self.mppi.lambda > 0.0) || !self.mppi.lambda.is_finite() {
            return Err(ConfigError::Lambda(self.mppi.lambda));
        }
        if !(self.mppi.limit_center > 0.0) {
            return Err(ConfigError::ControlLimit("limit_center"));
        }
        if !(self.mppi.limit_width > 0.0) {
            return Err(ConfigError::ControlLimit("limit_width"));
        }

        let n = &self.noise;
        if !(n.sigma_center >= 0.0) || !n.sigma_center.is_finite() {
            return Err(ConfigError::Sigma("sigma_center"));
        }
        if !(n.sigma_width >= 0.0) || !n.sigma_width.is_finite() {
            return Err(ConfigError::Sigma("sigma_width"));
        }
        if !(n.diffusion_sigma >= 0.0) || !n.diffusion_sigma.is_finite() {
            return Err(ConfigError::Sigma("diffusion_sigma"));
        }
        if !(n.jump_sigma >= 0.0) || !n.jump_sigma.is_finite() {
            return Err(ConfigError::Sigma("jump_sigma"));
        }
        if !(0.0..=1.0).contains(&n.jump_prob) {
            return Err(ConfigError::JumpProb(n.jump_prob));
        }
        if !(n.factor_band.0 > 0.0) || n.factor_band.0 > n.factor_band.1 {
            return Err(ConfigError::FactorBand(n.factor_band.0, n.factor_band.1));
        }

        let w = &self.weights;
        for (name, v) in [
            ("fee_reward", w.fee_reward),
            ("tracking", w.tracking),
            ("boundary_eps", w.boundary_eps),
            ("boundary_penalty", w.boundary_penalty),
            ("proximity_buffer", w.proximity_buffer),
            ("proximity", w.proximity),
            ("market_outside", w.market_outside),
            ("rebalance_threshold", w.rebalance_threshold),
            ("rebalance_penalty", w.rebalance_penalty),
            ("terminal_tracking", w.terminal_tracking),
            ("terminal_width", w.terminal_width),
        ] {
            if !(v >= 0.0) || !v.is_finite() {
                return Err(ConfigError::Weight(name));
            }
        }

        if self.cycle.tick_spacing <= 0 {
            return Err(ConfigError::TickSpacing);
        }
        if !(self.dynamics.min_half_width >= self.cycle.tick_spacing as f64) {
            return Err(ConfigError::MinHalfWidth(self.dynamics.min_half_width));
        }
        if !(self.cycle.cycle_period_secs > 0.0) {
            return Err(ConfigError::CyclePeriod);
        }
        if !(self.cycle.staleness_secs > 0.0) {
            return Err(ConfigError::LoopTiming("staleness_secs"));
        }
        if !(self.cycle.max_rebalance_secs > 0.0) {
            return Err(ConfigError::LoopTiming("max_rebalance_secs"));
        }
        if !(self.cycle.bootstrap_half_width >= self.dynamics.min_half_width) {
            return Err(ConfigError::BootstrapHalfWidth(
                self.cycle.bootstrap_half_width,
            ));
        }
        if !(self.cycle.liquidity > 0.0) {
            return Err(ConfigError::Liquidity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_lambda() {
        let mut cfg = Config::default();
        cfg.mppi.lambda = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Lambda(_))));
        cfg.mppi.lambda = -1.0;
        assert!(cfg.validate().is_err());
        cfg.mppi.lambda = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_horizon_and_samples() {
        let mut cfg = Config::default();
        cfg.mppi.horizon = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Horizon)));

        let mut cfg = Config::default();
        cfg.mppi.samples = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Samples)));
    }

    #[test]
    fn rejects_half_width_below_spacing() {
        let mut cfg = Config::default();
        cfg.dynamics.min_half_width = 30.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::MinHalfWidth(_))));
    }

    #[test]
    fn rejects_negative_weight() {
        let mut cfg = Config::default();
        cfg.weights.tracking = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Weight("tracking"))));
    }

    #[test]
    fn rejects_malformed_factor_band() {
        let mut cfg = Config::default();
        cfg.noise.factor_band = (1.3, 0.7);
        assert!(matches!(cfg.validate(), Err(ConfigError::FactorBand(_, _))));
    }

    #[test]
    fn rejects_bad_loop_timing() {
        let mut cfg = Config::default();
        cfg.cycle.staleness_secs = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LoopTiming("staleness_secs"))
        ));

        let mut cfg = Config::default();
        cfg.cycle.max_rebalance_secs = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::LoopTiming("max_rebalance_secs"))
        ));
    }

    #[test]
    fn rejects_bootstrap_half_width_below_floor() {
        let mut cfg = Config::default();
        cfg.cycle.bootstrap_half_width = cfg.dynamics.min_half_width / 2.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BootstrapHalfWidth(_))
        ));
        cfg.cycle.bootstrap_half_width = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_liquidity() {
        let mut cfg = Config::default();
        cfg.cycle.liquidity = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Liquidity)));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = Config::default();
        let raw = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&raw).unwrap();
        assert!(back.validate().is_ok());
        assert_eq!(back.mppi.horizon, cfg.mppi.horizon);
        assert_eq!(back.cycle.pad, cfg.cycle.pad);
    }
}
