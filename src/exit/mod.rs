// =============================================================================
// Exit Decision Engine
// =============================================================================
//
// Decides when and how much of a tracked option position to close, and why.
//
//   config      profile -> ExitConfig registry (validated at construction)
//   conditions  per-profile thesis-invalidation predicates
//   tracker     one-shot TP1 state keyed by trade identity
//   decision    priority-ordered should_exit procedure
//   evaluator   path walk producing a single ExitEvent per trade
//   reason      exit reason vocabulary, decisions and events

pub mod conditions;
pub mod config;
pub mod decision;
pub mod evaluator;
pub mod reason;
pub mod tracker;

pub use conditions::ExitCondition;
pub use config::{ExitConfig, ExitRegistry};
pub use decision::{DecisionInput, ExitEngine};
pub use evaluator::pnl_pct;
pub use reason::{ExitDecision, ExitEvent, ExitReason};
pub use tracker::{PartialExitLedger, PartialExitTracker, SharedPartialExitTracker, TradeIdentity};
