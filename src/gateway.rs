use std::sync::mpsc::{Receiver, TryRecvError};

use chrono::{DateTime, Utc};

use crate::errors::{FeedError, LedgerError};
use crate::tick::{self, Range};

/// Timestamped reference price from the external market feed. Staleness is
/// judged by the caller against its own tolerance.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn tick(&self) -> f64 {
        tick::price_to_tick(self.price)
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> f64 {
        (now - self.timestamp).num_milliseconds() as f64 / 1e3
    }
}

pub trait MarketFeed {
    fn fetch(&mut self) -> Result<MarketSnapshot, FeedError>;
}

/// On-chain pool state as read through the ledger gateway.
#[derive(Debug, Clone, Copy)]
pub struct PoolState {
    pub pool_tick: f64,
    pub active: Option<Range>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceOutcome {
    Confirmed,
    Failed(String),
}

/// Handle for a fire-and-forget rebalance submission. The request cannot be
/// recalled; the resolution arrives later on the channel.
pub struct PendingRebalance {
    pub range: Range,
    resolution: Receiver<RebalanceOutcome>,
}

impl PendingRebalance {
    pub fn new(range: Range, resolution: Receiver<RebalanceOutcome>) -> Self {
        Self { range, resolution }
    }

    /// Non-blocking poll. A dropped sender counts as a failure so the
    /// position can never stay pending forever.
    pub fn poll(&self) -> Option<RebalanceOutcome> {
        match self.resolution.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(RebalanceOutcome::Failed(
                "resolution channel dropped".to_string(),
            )),
        }
    }
}

pub trait LedgerGateway {
    fn read_state(&mut self) -> Result<PoolState, LedgerError>;

    /// Retire the old range and establish the new one. Returns immediately
    /// with a pending handle; eventual confirmation or failure arrives on
    /// the handle's channel.
    fn submit_rebalance(
        &mut self,
        range: Range,
        liquidity: f64,
    ) -> Result<PendingRebalance, LedgerError>;
}
