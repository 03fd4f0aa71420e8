// =============================================================================
// Backtest Run - caller-side batch driver for the exit engine
// =============================================================================
//
// One `BacktestRun` is one independent evaluation batch. It owns a fresh
// partial-exit tracker, so TP1 state can never carry over from an earlier
// run.
//
// With `follow_remainder` on, a partial exit is followed by re-invoking the
// engine on the synthetic remainder trade (later days only, dollars scaled by
// the remaining fraction) until a terminal event. The remainder keeps the
// original trade identity, so its TP1 is already spent.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::exit::decision::ExitEngine;
use crate::exit::reason::ExitEvent;
use crate::exit::tracker::PartialExitTracker;
use crate::types::TrackedTrade;

/// A trade tagged with the profile it was opened under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfiledTrade {
    pub profile_id: String,
    #[serde(flatten)]
    pub trade: TrackedTrade,
}

/// Exit events produced for one trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub profile_id: String,
    pub events: Vec<ExitEvent>,
}

impl TradeOutcome {
    pub fn realized_pnl(&self) -> f64 {
        self.events.iter().map(ExitEvent::realized_pnl).sum()
    }
}

/// Aggregate view of a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub trades: usize,
    pub events: usize,
    pub partial_exits: usize,
    pub realized_pnl: f64,
    /// Event count per canonical reason string.
    pub by_reason: BTreeMap<String, usize>,
}

pub struct BacktestRun<'a> {
    run_id: Uuid,
    engine: &'a ExitEngine,
    tracker: PartialExitTracker,
    follow_remainder: bool,
    outcomes: Vec<TradeOutcome>,
}

impl<'a> BacktestRun<'a> {
    pub fn new(engine: &'a ExitEngine, follow_remainder: bool) -> Self {
        let run_id = Uuid::new_v4();
        info!(%run_id, follow_remainder, "Backtest run started");
        Self {
            run_id,
            engine,
            tracker: PartialExitTracker::new(),
            follow_remainder,
            outcomes: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Evaluate one trade and record its outcome.
    pub fn evaluate(&mut self, profile_id: &str, trade: &TrackedTrade) -> &TradeOutcome {
        let mut events = Vec::new();
        let mut event = self
            .engine
            .apply_to_tracked_trade(&mut self.tracker, profile_id, trade);
        events.push(event);

        if self.follow_remainder {
            let mut current = trade.clone();
            while event.is_partial() {
                let Some(rest) = current.remainder_after(event.exit_day, event.exit_fraction)
                else {
                    break;
                };
                debug!(
                    profile = profile_id,
                    from_day = event.exit_day,
                    remaining = 1.0 - event.exit_fraction,
                    "Following remainder"
                );
                event = self
                    .engine
                    .apply_to_tracked_trade(&mut self.tracker, profile_id, &rest);
                events.push(event);
                current = rest;
            }
        }

        self.outcomes.push(TradeOutcome {
            profile_id: profile_id.to_string(),
            events,
        });
        &self.outcomes[self.outcomes.len() - 1]
    }

    /// Evaluate every trade in order.
    pub fn evaluate_all(&mut self, trades: &[ProfiledTrade]) {
        for t in trades {
            self.evaluate(&t.profile_id, &t.trade);
        }
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            run_id: self.run_id.to_string(),
            trades: self.outcomes.len(),
            ..RunSummary::default()
        };

        for event in self.outcomes.iter().flat_map(|o| o.events.iter()) {
            summary.events += 1;
            if event.is_partial() {
                summary.partial_exits += 1;
            }
            summary.realized_pnl += event.realized_pnl();
            *summary
                .by_reason
                .entry(event.exit_reason.to_string())
                .or_insert(0) += 1;
        }

        info!(
            run_id = %summary.run_id,
            trades = summary.trades,
            events = summary.events,
            partial_exits = summary.partial_exits,
            realized_pnl = format!("{:.2}", summary.realized_pnl),
            "Backtest run summary"
        );
        summary
    }

    /// Finish the run, returning all outcomes.
    pub fn into_outcomes(self) -> Vec<TradeOutcome> {
        self.outcomes
    }
}

// =============================================================================
// Tests
// =============================================================================
