//! In-process market and pool used by the demo binaries and tests. The
//! production collaborators live outside this crate.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::config::{DynamicsParams, NoiseModel};
use crate::dynamics::PriceDraw;
use crate::errors::{FeedError, LedgerError};
use crate::gateway::{
    LedgerGateway, MarketFeed, MarketSnapshot, PendingRebalance, PoolState, RebalanceOutcome,
};
use crate::tick::{self, Range};

/// Reference price following the same jump-diffusion process the planner
/// assumes. Each fetch advances the price by one draw.
pub struct SimMarket {
    price: f64,
    noise: NoiseModel,
    rng: Xoshiro256PlusPlus,
    offline: bool,
}

impl SimMarket {
    pub fn new(price: f64, noise: NoiseModel, seed: u64) -> Self {
        Self {
            price,
            noise,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            offline: false,
        }
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

impl MarketFeed for SimMarket {
    fn fetch(&mut self) -> Result<MarketSnapshot, FeedError> {
        if self.offline {
            return Err(FeedError::Unavailable("simulated outage".to_string()));
        }
        let draw = PriceDraw::sample(&mut self.rng, &self.noise);
        self.price *= draw.factor;
        Ok(MarketSnapshot {
            price: self.price,
            timestamp: Utc::now(),
        })
    }
}

/// Pool whose tick tracks a driven market tick with the planner's gain
/// model, clamped into the active range.
pub struct SimPool {
    pool_tick: f64,
    active: Option<Range>,
    params: DynamicsParams,
    /// Delay before a submission resolves. Zero resolves before the handle
    /// is returned.
    pub resolution_delay: Duration,
    /// The next submission resolves as Failed.
    pub fail_next: bool,
}

impl SimPool {
    pub fn new(pool_tick: f64, active: Option<Range>, params: DynamicsParams) -> Self {
        Self {
            pool_tick,
            active,
            params,
            resolution_delay: Duration::ZERO,
            fail_next: false,
        }
    }

    /// Advance the pool tick toward the given market tick.
    pub fn track(&mut self, market_tick: f64) {
        let (lower, upper, width) = match self.active {
            Some(r) => (r.lower as f64, r.upper as f64, 2.0 * r.half_width()),
            None => (f64::NEG_INFINITY, f64::INFINITY, 4.0 * self.params.min_half_width),
        };
        let rel_dev = (market_tick - self.pool_tick).abs() / width.max(1e-6);
        let k = self.params.k0 + self.params.k1 * (2.0 * rel_dev).tanh();
        self.pool_tick = (self.pool_tick + k * (market_tick - self.pool_tick)).clamp(lower, upper);
    }

    pub fn pool_price(&self) -> f64 {
        tick::tick_to_price(self.pool_tick)
    }

    pub fn active(&self) -> Option<Range> {
        self.active
    }
}

impl LedgerGateway for SimPool {
    fn read_state(&mut self) -> Result<PoolState, LedgerError> {
        Ok(PoolState {
            pool_tick: self.pool_tick,
            active: self.active,
        })
    }

    fn submit_rebalance(
        &mut self,
        range: Range,
        _liquidity: f64,
    ) -> Result<PendingRebalance, LedgerError> {
        let (tx, rx) = mpsc::channel();
        let outcome = if self.fail_next {
            self.fail_next = false;
            RebalanceOutcome::Failed("simulated revert".to_string())
        } else {
            self.active = Some(range);
            self.pool_tick = self
                .pool_tick
                .clamp(range.lower as f64, range.upper as f64);
            RebalanceOutcome::Confirmed
        };

        if self.resolution_delay.is_zero() {
            // Receiver keeps the message after the sender is dropped.
            let _ = tx.send(outcome);
        } else {
            let delay = self.resolution_delay;
            thread::spawn(move || {
                thread::sleep(delay);
                let _ = tx.send(outcome);
            });
        }
        Ok(PendingRebalance::new(range, rx))
    }
}

/// Couples a market and a pool so the pool tick chases each fetched market
/// tick, the way arbitrage flow would. Returns separate feed and ledger
/// handles for the controller.
pub fn coupled(market: SimMarket, pool: SimPool) -> (CoupledFeed, CoupledLedger) {
    let shared = Rc::new(RefCell::new((market, pool)));
    (CoupledFeed(shared.clone()), CoupledLedger(shared))
}

pub struct CoupledFeed(Rc<RefCell<(SimMarket, SimPool)>>);

impl MarketFeed for CoupledFeed {
    fn fetch(&mut self) -> Result<MarketSnapshot, FeedError> {
        let (market, pool) = &mut *self.0.borrow_mut();
        let snap = market.fetch()?;
        pool.track(snap.tick());
        Ok(snap)
    }
}

pub struct CoupledLedger(Rc<RefCell<(SimMarket, SimPool)>>);

impl LedgerGateway for CoupledLedger {
    fn read_state(&mut self) -> Result<PoolState, LedgerError> {
        self.0.borrow_mut().1.read_state()
    }

    fn submit_rebalance(
        &mut self,
        range: Range,
        liquidity: f64,
    ) -> Result<PendingRebalance, LedgerError> {
        self.0.borrow_mut().1.submit_rebalance(range, liquidity)
    }
}
