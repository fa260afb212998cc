use serde::{Deserialize, Serialize};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

// price = 1.0001^tick
pub fn price_to_tick(price: f64) -> f64 {
    price.ln() / 1.0001f64.ln()
}

pub fn tick_to_price(tick: f64) -> f64 {
    1.0001f64.powf(tick)
}

/// Tick delta implied by a multiplicative price factor.
pub fn tick_delta(factor: f64) -> f64 {
    factor.ln() / 1.0001f64.ln()
}

/// Round toward negative infinity to keep ticks aligned to the spacing.
pub fn align_down(tick: i32, spacing: i32) -> i32 {
    tick.div_euclid(spacing) * spacing
}

/// Active liquidity range [lower, upper] in aligned integer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub lower: i32,
    pub upper: i32,
}

impl Range {
    /// Build an aligned range from a real-valued center and half-width.
    /// Alignment can collapse the interval; the upper bound is bumped by one
    /// spacing so that lower < upper always holds.
    pub fn from_center(center: f64, half_width: f64, spacing: i32) -> Self {
        let mut lower = align_down((center - half_width).round() as i32, spacing);
        let mut upper = align_down((center + half_width).round() as i32, spacing);
        let max_aligned = align_down(MAX_TICK, spacing);
        lower = lower.clamp(MIN_TICK, max_aligned - spacing);
        upper = upper.clamp(MIN_TICK + spacing, max_aligned);
        if lower >= upper {
            upper = lower + spacing;
        }
        Self { lower, upper }
    }

    pub fn center(&self) -> f64 {
        (self.lower + self.upper) as f64 / 2.0
    }

    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) as f64 / 2.0
    }

    pub fn contains(&self, tick: f64) -> bool {
        tick > self.lower as f64 && tick < self.upper as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_floors_negative_ticks() {
        assert_eq!(align_down(125, 60), 120);
        assert_eq!(align_down(-1, 60), -60);
        assert_eq!(align_down(-60, 60), -60);
        assert_eq!(align_down(-61, 60), -120);
    }

    #[test]
    fn price_tick_inverse() {
        let tick = price_to_tick(tick_to_price(78240.0));
        assert!((tick - 78240.0).abs() < 1e-6);
    }

    #[test]
    fn range_from_center_is_aligned_and_ordered() {
        let r = Range::from_center(78240.0, 2000.0, 60);
        assert_eq!(r.lower % 60, 0);
        assert_eq!(r.upper % 60, 0);
        assert!(r.lower < r.upper);
        assert!((r.center() - 78240.0).abs() < 60.0);
        assert!(r.contains(78240.0));
        assert!(!r.contains(r.lower as f64));
    }

    #[test]
    fn degenerate_width_still_produces_valid_range() {
        let r = Range::from_center(100.0, 1.0, 60);
        assert!(r.lower < r.upper);
        assert_eq!(r.upper - r.lower, 60);
    }

    #[test]
    fn range_is_clamped_to_tick_domain() {
        let r = Range::from_center(900000.0, 5000.0, 60);
        assert!(r.upper <= MAX_TICK);
        assert!(r.lower < r.upper);
    }
}
