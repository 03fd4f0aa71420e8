// =============================================================================
// Options Exit Engine
// =============================================================================
//
// Position-exit decisions for an options backtester: given a tracked
// position's daily mark-to-market path, decide when to close it, how much of
// it, and why.
// =============================================================================

pub mod backtest;
pub mod error;
pub mod exit;
pub mod runtime_config;
pub mod types;

pub use error::ConfigError;
pub use exit::{
    ExitConfig, ExitDecision, ExitEngine, ExitEvent, ExitReason, ExitRegistry,
    PartialExitTracker, TradeIdentity,
};
pub use types::{Greeks, MarketConditions, PathDay, Snapshot, TrackedTrade, TradeEntry};
