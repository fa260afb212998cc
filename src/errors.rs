use thiserror::Error;

/// Startup configuration errors. All of these are fatal: the controller
/// refuses to run rather than substitute defaults.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("horizon must be positive")]
    Horizon,
    #[error("sample count must be positive")]
    Samples,
    #[error("lambda must be positive, got {0}")]
    Lambda(f64),
    #[error("noise scale must be non-negative: {0}")]
    Sigma(&'static str),
    #[error("jump probability must be in [0, 1], got {0}")]
    JumpProb(f64),
    #[error("factor band must satisfy 0 < lo <= hi, got [{0}, {1}]")]
    FactorBand(f64, f64),
    #[error("tick spacing must be positive")]
    TickSpacing,
    #[error("min half-width must be at least the tick spacing, got {0}")]
    MinHalfWidth(f64),
    #[error("cost weight must be non-negative: {0}")]
    Weight(&'static str),
    #[error("control limit must be positive: {0}")]
    ControlLimit(&'static str),
    #[error("cycle period must be positive")]
    CyclePeriod,
    #[error("loop timing must be positive: {0}")]
    LoopTiming(&'static str),
    #[error("bootstrap half-width must be at least the min half-width, got {0}")]
    BootstrapHalfWidth(f64),
    #[error("liquidity must be positive")]
    Liquidity,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Market feed errors. Transient: the affected cycle is skipped.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("market feed unavailable: {0}")]
    Unavailable(String),
    #[error("market snapshot stale by {age_secs:.1}s")]
    Stale { age_secs: f64 },
}

/// Ledger gateway errors. Reads are transient; a failed submission clears
/// the pending flag and the next cycle re-plans from fresh state.
#[derive(Error, Debug, Clone)]
pub enum LedgerError {
    #[error("ledger read failed: {0}")]
    Read(String),
    #[error("rebalance rejected: {0}")]
    Rejected(String),
    #[error("submission failed: {0}")]
    Submission(String),
}

/// Planner errors.
#[derive(Error, Debug, Clone)]
pub enum PlanError {
    #[error("non-finite value in input state")]
    NonFiniteState,
    #[error("fused control sequence is non-finite")]
    NonFiniteControl,
}

/// Reasons a cycle stops before PLAN.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("non-finite value in fetched state")]
    NonFinite,
}
