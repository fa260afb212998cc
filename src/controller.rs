use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use crate::config::Config;
use crate::errors::{ConfigError, FeedError, FetchError};
use crate::gateway::{LedgerGateway, MarketFeed, PendingRebalance, RebalanceOutcome};
use crate::mppi::{self, Mppi, Plan};
use crate::telemetry::{CycleRecord, TelemetrySink};
use crate::tick::{self, Range};
use crate::{Control, State};

/// Phases of one cycle. The machine is cyclic; there is no terminal phase
/// other than external shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FetchState,
    Plan,
    Execute,
    Cooldown,
}

/// Receding-horizon loop. Owns the nominal control sequence — the only
/// state that persists across cycles — and replaces it atomically once per
/// cycle after the reweighting step.
pub struct Controller<F, L, T> {
    cfg: Config,
    mppi: Mppi,
    feed: F,
    ledger: L,
    sink: T,
    nominal: Vec<Control>,
    pending: Option<PendingRebalance>,
    last_rebalance: Instant,
    cycle: u64,
    seed: u64,
}

impl<F, L, T> Controller<F, L, T>
where
    F: MarketFeed,
    L: LedgerGateway,
    T: TelemetrySink,
{
    pub fn new(cfg: Config, feed: F, ledger: L, sink: T, seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let mppi = Mppi::new(&cfg)?;
        let nominal = vec![Control::zeros(); cfg.mppi.horizon];
        Ok(Self {
            cfg,
            mppi,
            feed,
            ledger,
            sink,
            nominal,
            pending: None,
            last_rebalance: Instant::now(),
            cycle: 0,
            seed,
        })
    }

    /// Install a checkpointed nominal sequence. Ignored unless its length
    /// matches the configured horizon.
    pub fn warm_start(&mut self, nominal: Vec<Control>) {
        if nominal.len() == self.mppi.horizon() {
            info!("warm starting from checkpointed nominal sequence");
            self.nominal = nominal;
        } else {
            warn!(
                "discarding warm start of length {} (horizon is {})",
                nominal.len(),
                self.mppi.horizon()
            );
        }
    }

    pub fn nominal(&self) -> &[Control] {
        &self.nominal
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drive cycles until the shutdown flag is raised.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "starting receding-horizon loop, period {:.1}s",
            self.cfg.cycle.cycle_period_secs
        );
        while !shutdown.load(Ordering::Relaxed) {
            self.run_cycle();
            debug!("phase: {:?}", Phase::Cooldown);
            thread::sleep(Duration::from_secs_f64(self.cfg.cycle.cycle_period_secs));
        }
        info!("receding-horizon loop stopped");
    }

    /// One pass of the state machine up to the cooldown. Every recoverable
    /// error is contained here; the cycle is skipped and the loop goes on.
    pub fn run_cycle(&mut self) -> CycleRecord {
        self.cycle += 1;
        let mut rec = CycleRecord::begin(self.cycle);

        self.resolve_pending(&mut rec);

        debug!("phase: {:?}", Phase::FetchState);
        let x = match self.fetch_state() {
            Ok(x) => x,
            Err(e) => {
                warn!("cycle {}: {e}; skipping", self.cycle);
                rec.skipped = Some(e.to_string());
                self.emit(&rec);
                return rec;
            }
        };
        rec.market_tick = Some(x[0]);
        rec.pool_tick = Some(x[1]);
        rec.center_tick = Some(x[2]);
        rec.half_width = Some(x[3]);

        debug!("phase: {:?}", Phase::Plan);
        let seed = self.seed.wrapping_add(self.cycle);
        let plan = match self.mppi.compute(&x, &self.nominal, seed) {
            Ok(p) => p,
            Err(e) => {
                warn!("cycle {}: planning failed: {e}; skipping", self.cycle);
                rec.skipped = Some(e.to_string());
                self.emit(&rec);
                return rec;
            }
        };
        rec.d_center = Some(plan.decision[0]);
        rec.d_half_width = Some(plan.decision[1]);
        rec.cost_min = Some(plan.stats.min);
        rec.cost_mean = Some(plan.stats.mean);
        rec.cost_max = Some(plan.stats.max);
        rec.effective_samples = Some(plan.stats.effective_samples);

        debug!("phase: {:?}", Phase::Execute);
        self.execute(&x, &plan, &mut rec);

        // Warm start for the next cycle: shift left, pad, replace as a whole.
        let mut next = plan.nominal;
        mppi::shift(&mut next, self.cfg.cycle.pad);
        self.nominal = next;
        debug_assert_eq!(self.nominal.len(), self.mppi.horizon());

        self.emit(&rec);
        rec
    }

    // A submission cannot be recalled once handed to the ledger; only its
    // resolution clears the pending flag. The resolution goes into the
    // record of the cycle that observes it.
    fn resolve_pending(&mut self, rec: &mut CycleRecord) {
        if let Some(pending) = &self.pending {
            match pending.poll() {
                Some(RebalanceOutcome::Confirmed) => {
                    info!(
                        "rebalance to [{}, {}] confirmed",
                        pending.range.lower, pending.range.upper
                    );
                    rec.outcome = Some("confirmed".to_string());
                    self.pending = None;
                }
                Some(RebalanceOutcome::Failed(reason)) => {
                    warn!(
                        "rebalance to [{}, {}] failed: {reason}; re-planning from fresh state",
                        pending.range.lower, pending.range.upper
                    );
                    rec.outcome = Some(format!("failed: {reason}"));
                    self.pending = None;
                }
                None => {}
            }
        }
    }

    fn fetch_state(&mut self) -> Result<State, FetchError> {
        let snap = self.feed.fetch()?;
        let age = snap.age_secs(Utc::now());
        if age > self.cfg.cycle.staleness_secs {
            return Err(FeedError::Stale { age_secs: age }.into());
        }

        let pool = self.ledger.read_state()?;
        let (center, half_width) = match pool.active {
            Some(r) => (r.center(), r.half_width()),
            // No position yet: plan around the pool tick with a bootstrap width.
            None => (
                tick::align_down(pool.pool_tick.round() as i32, self.cfg.cycle.tick_spacing)
                    as f64,
                self.cfg.cycle.bootstrap_half_width,
            ),
        };

        let x = State::new(snap.tick(), pool.pool_tick, center, half_width);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(FetchError::NonFinite);
        }
        Ok(x)
    }

    fn execute(&mut self, x: &State, plan: &Plan, rec: &mut CycleRecord) {
        if self.pending.is_some() {
            debug!("rebalance outstanding; deferring execution");
            rec.outcome = Some("pending".to_string());
            return;
        }

        let u = plan.decision;
        let spacing = self.cfg.cycle.tick_spacing;
        let floor = self.cfg.dynamics.min_half_width;
        let target = Range::from_center(x[2] + u[0], (x[3] + u[1]).max(floor), spacing);
        let current = Range::from_center(x[2], x[3], spacing);

        let material = u[0].abs() + u[1].abs() > self.cfg.weights.rebalance_threshold;
        let overdue =
            self.last_rebalance.elapsed().as_secs_f64() >= self.cfg.cycle.max_rebalance_secs;
        if target == current || !(material || overdue) {
            return;
        }

        rec.target_lower = Some(target.lower);
        rec.target_upper = Some(target.upper);
        info!(
            "cycle {}: rebalance [{}, {}] -> [{}, {}] (dc={:.1}, dw={:.1})",
            self.cycle, current.lower, current.upper, target.lower, target.upper, u[0], u[1]
        );
        match self
            .ledger
            .submit_rebalance(target, self.cfg.cycle.liquidity)
        {
            Ok(pending) => {
                self.pending = Some(pending);
                self.last_rebalance = Instant::now();
                rec.rebalanced = true;
                // Keep a resolution observed earlier this cycle; `rebalanced`
                // already marks the new submission.
                if rec.outcome.is_none() {
                    rec.outcome = Some("submitted".to_string());
                }
            }
            Err(e) => {
                warn!("cycle {}: submission failed: {e}", self.cycle);
                rec.outcome = Some(e.to_string());
            }
        }
    }

    fn emit(&mut self, rec: &CycleRecord) {
        if let Err(e) = self.sink.record(rec) {
            warn!("telemetry sink error: {e}");
        }
    }
}
