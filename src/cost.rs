use crate::config::CostWeights;
use crate::{Control, State};

/// Per-step stage cost. Each term is gated and weighted by the configured
/// weight table; there are no literals here.
pub fn stage(x: &State, u: &Control, w: &CostWeights) -> f64 {
    let (market, pool, center, half) = (x[0], x[1], x[2], x[3]);
    let lower = center - half;
    let upper = center + half;

    let mut c = 0.0;

    // Fee accrual while the pool trades inside the range.
    if pool > lower && pool < upper {
        c -= w.fee_reward;
    }

    // IL proxy.
    c += w.tracking * (market - pool).powi(2);

    if pool <= lower + w.boundary_eps || pool >= upper - w.boundary_eps {
        c += w.boundary_penalty;
    }

    let dist_to_edge = (pool - lower).min(upper - pool);
    let violation = (w.proximity_buffer - dist_to_edge).max(0.0);
    c += w.proximity * violation * violation;

    if market < lower {
        c += w.market_outside * (lower - market).powi(2);
    } else if market > upper {
        c += w.market_outside * (market - upper).powi(2);
    }

    // Gas proxy for a material range move.
    if u[0].abs() + u[1].abs() > w.rebalance_threshold {
        c += w.rebalance_penalty;
    }

    c
}

/// Terminal cost: keep the range centered on the market and discourage
/// over-wide ranges.
pub fn terminal(x: &State, w: &CostWeights) -> f64 {
    w.terminal_tracking * (x[0] - x[2]).powi(2) + w.terminal_width * x[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> CostWeights {
        CostWeights::default()
    }

    #[test]
    fn in_range_pool_earns_fee_reward() {
        let w = weights();
        let inside = State::new(78240.0, 78240.0, 78240.0, 2000.0);
        let outside = State::new(78240.0, 76240.0, 78240.0, 2000.0);
        let u = Control::zeros();
        assert!(stage(&inside, &u, &w) < stage(&outside, &u, &w));
    }

    #[test]
    fn market_outside_dominates_tracking() {
        let w = weights();
        // Same (market - pool) gap, but in one case the market has left the range.
        let tracked = State::new(79000.0, 78500.0, 78700.0, 2000.0);
        let escaped = State::new(81000.0, 80500.0, 78700.0, 1000.0);
        let u = Control::zeros();
        assert!(stage(&escaped, &u, &w) > stage(&tracked, &u, &w));
        assert!(w.market_outside > w.tracking);
    }

    #[test]
    fn boundary_hit_adds_fixed_penalty() {
        let w = weights();
        let center = State::new(78240.0, 78240.0, 78240.0, 2000.0);
        let at_edge = State::new(78240.0, 76240.5, 78240.0, 2000.0);
        let u = Control::zeros();
        assert!(stage(&at_edge, &u, &w) > stage(&center, &u, &w) + w.boundary_penalty / 2.0);
    }

    #[test]
    fn rebalance_penalty_triggers_above_threshold() {
        let w = weights();
        let x = State::new(78240.0, 78240.0, 78240.0, 2000.0);
        let small = Control::new(w.rebalance_threshold / 4.0, 0.0);
        let large = Control::new(w.rebalance_threshold, w.rebalance_threshold);
        let diff = stage(&x, &large, &w) - stage(&x, &small, &w);
        assert!((diff - w.rebalance_penalty).abs() < 1e-12);
    }

    #[test]
    fn terminal_penalizes_offset_and_width() {
        let w = weights();
        let centered = State::new(78240.0, 78240.0, 78240.0, 1000.0);
        let offset = State::new(78240.0, 78240.0, 79240.0, 1000.0);
        let wide = State::new(78240.0, 78240.0, 78240.0, 4000.0);
        assert!(terminal(&offset, &w) > terminal(&centered, &w));
        assert!(terminal(&wide, &w) > terminal(&centered, &w));
    }
}
