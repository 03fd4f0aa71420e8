// =============================================================================
// Exit Decision Procedure - priority-ordered exit rules
// =============================================================================
//
// Rules are evaluated top to bottom; the first that fires wins:
//
//   1. RISK       pnl_pct <= max_loss_pct                -> full exit
//   2. TP2        pnl_pct >= tp2_pct                     -> full exit
//   3. TP1        pnl_pct >= tp1_pct, not yet fired      -> partial exit
//   4. CONDITION  profile predicate true                 -> full exit
//   5. TIME       days_held >= max_hold_days             -> full exit
//   6. otherwise                                         -> hold
//
// TP2 sits above TP1 so a move large enough for both always resolves as TP2.
// A TP1 that already fired for this identity is skipped and evaluation falls
// through to the condition and time rules.
//
// Unknown profiles only get a generic time stop.
// =============================================================================

use tracing::{debug, warn};

use crate::exit::config::{ExitConfig, ExitRegistry};
use crate::exit::reason::{ExitDecision, ExitReason};
use crate::exit::tracker::{PartialExitLedger, TradeIdentity};
use crate::types::{Greeks, MarketConditions};

/// Hold limit applied to profiles missing from the registry.
pub const DEFAULT_UNKNOWN_PROFILE_HOLD_DAYS: u32 = 14;

/// Below this |entry cost| a trade is treated as zero-cost (P&L% = 0).
pub const DEFAULT_MIN_ENTRY_COST: f64 = 0.01;

/// Everything the decision procedure sees for one day of one trade.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub identity: &'a TradeIdentity,
    pub days_held: u32,
    pub pnl_pct: f64,
    pub market: &'a MarketConditions,
    pub greeks: &'a Greeks,
}

// =============================================================================
// ExitEngine
// =============================================================================

/// Stateless exit engine: a validated registry plus fallback settings.
///
/// Per-run state (TP1 fires) lives in the `PartialExitLedger` the caller
/// passes in, never in the engine.
#[derive(Debug, Clone)]
pub struct ExitEngine {
    registry: ExitRegistry,
    unknown_profile_hold_days: u32,
    min_entry_cost: f64,
}

impl ExitEngine {
    pub fn new(registry: ExitRegistry) -> Self {
        Self {
            registry,
            unknown_profile_hold_days: DEFAULT_UNKNOWN_PROFILE_HOLD_DAYS,
            min_entry_cost: DEFAULT_MIN_ENTRY_COST,
        }
    }

    pub fn with_unknown_profile_hold_days(mut self, days: u32) -> Self {
        self.unknown_profile_hold_days = days;
        self
    }

    /// Zero-cost epsilon. Callers validate it; see `EngineSettings::validate`.
    pub fn with_min_entry_cost(mut self, epsilon: f64) -> Self {
        self.min_entry_cost = epsilon;
        self
    }

    pub fn registry(&self) -> &ExitRegistry {
        &self.registry
    }

    pub fn min_entry_cost(&self) -> f64 {
        self.min_entry_cost
    }

    /// Decide whether to exit `profile_id`'s position today, and how much.
    ///
    /// Infallible: unknown profiles and missing market data resolve to
    /// well-defined decisions.
    pub fn should_exit<L>(
        &self,
        ledger: &mut L,
        profile_id: &str,
        input: &DecisionInput<'_>,
    ) -> ExitDecision
    where
        L: PartialExitLedger + ?Sized,
    {
        match self.registry.get_config(profile_id) {
            Some(config) => decide(config, ledger, profile_id, input),
            None => self.unknown_profile(profile_id, input.days_held),
        }
    }

    fn unknown_profile(&self, profile_id: &str, days_held: u32) -> ExitDecision {
        if days_held >= self.unknown_profile_hold_days {
            warn!(
                profile = profile_id,
                days_held,
                limit = self.unknown_profile_hold_days,
                "Unknown profile, fallback time stop"
            );
            return ExitDecision::full(ExitReason::UnknownProfileTimeStop);
        }
        ExitDecision::hold()
    }
}

fn decide<L>(
    config: &ExitConfig,
    ledger: &mut L,
    profile_id: &str,
    input: &DecisionInput<'_>,
) -> ExitDecision
where
    L: PartialExitLedger + ?Sized,
{
    let pnl_pct = input.pnl_pct;

    // ── 1. Risk ─────────────────────────────────────────────────────────
    if pnl_pct <= config.max_loss_pct {
        debug!(
            profile = profile_id,
            pnl_pct,
            threshold = config.max_loss_pct,
            "Max loss hit"
        );
        return ExitDecision::full(ExitReason::MaxLoss(config.max_loss_pct));
    }

    // ── 2. TP2 (before TP1) ─────────────────────────────────────────────
    if let Some(tp2) = config.tp2_pct {
        if pnl_pct >= tp2 {
            debug!(profile = profile_id, pnl_pct, threshold = tp2, "TP2 hit");
            return ExitDecision::full(ExitReason::TakeProfit2(tp2));
        }
    }

    // ── 3. TP1, once per identity ───────────────────────────────────────
    if let Some((tp1, fraction)) = config.tp1() {
        if pnl_pct >= tp1 {
            if ledger.claim_tp1(input.identity) {
                debug!(
                    profile = profile_id,
                    trade = %input.identity,
                    pnl_pct,
                    threshold = tp1,
                    fraction,
                    "TP1 hit"
                );
                return ExitDecision::partial(fraction, ExitReason::TakeProfit1(tp1));
            }
            debug!(trade = %input.identity, "TP1 already fired, skipping");
        }
    }

    // ── 4. Condition ────────────────────────────────────────────────────
    if config.condition.evaluate(input.market, input.greeks) {
        debug!(
            profile = profile_id,
            condition = ?config.condition,
            "Condition exit"
        );
        return ExitDecision::full(ExitReason::Condition);
    }

    // ── 5. Time ─────────────────────────────────────────────────────────
    if input.days_held >= config.max_hold_days {
        debug!(
            profile = profile_id,
            days_held = input.days_held,
            limit = config.max_hold_days,
            "Time stop hit"
        );
        return ExitDecision::full(ExitReason::TimeStop(config.max_hold_days));
    }

    ExitDecision::hold()
}

// =============================================================================
// Tests
// =============================================================================
