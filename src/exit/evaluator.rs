// =============================================================================
// Path Evaluator - turn a multi-day tracked trade into one exit event
// =============================================================================
//
// Walks the recorded path in day order, computing P&L% per day and asking the
// decision procedure whether to exit. The first day that fires ends the walk.
//
// Contract:
//   - pnl_pct = mtm_pnl / |entry_cost|, so losses are negative for both
//     debit (long) and credit (short) trades. Near-zero entry cost gives 0.
//   - exit_pnl is that day's raw mtm_pnl, unscaled by exit_fraction.
//   - A partial TP1 exit ends the walk. The remainder is not monitored
//     further here; callers re-invoke with a synthetic remainder trade.
//   - Exhausted path -> last day, "max_tracking_days", fraction 1.0.
//   - Empty path     -> sentinel "no_tracking_data" event.
// =============================================================================

use tracing::{debug, info};

use crate::exit::decision::{DecisionInput, ExitEngine};
use crate::exit::reason::{ExitEvent, ExitReason};
use crate::exit::tracker::{PartialExitLedger, TradeIdentity};
use crate::types::{PathDay, TrackedTrade};

/// P&L as a fraction of the absolute entry cost.
///
/// Returns 0 when `|entry_cost| < min_entry_cost`.
pub fn pnl_pct(mtm_pnl: f64, entry_cost: f64, min_entry_cost: f64) -> f64 {
    let basis = entry_cost.abs();
    if basis < min_entry_cost {
        return 0.0;
    }
    mtm_pnl / basis
}

impl ExitEngine {
    /// Walk `trade`'s path under `profile_id` until an exit fires.
    ///
    /// TP1 state is read from and written to `ledger`, keyed by the trade's
    /// full identity (profile, entry date, strike, expiry).
    pub fn apply_to_tracked_trade<L>(
        &self,
        ledger: &mut L,
        profile_id: &str,
        trade: &TrackedTrade,
    ) -> ExitEvent
    where
        L: PartialExitLedger + ?Sized,
    {
        let identity = TradeIdentity::new(profile_id, &trade.entry);

        let mut days: Vec<&PathDay> = trade.path.iter().collect();
        days.sort_by_key(|d| d.day_index);

        let Some(last) = days.last().copied() else {
            debug!(trade = %identity, "No tracking data");
            return ExitEvent::no_tracking_data();
        };

        let entry_cost = trade.entry.entry_cost;
        if entry_cost.abs() < self.min_entry_cost() {
            debug!(
                trade = %identity,
                entry_cost,
                "Degenerate entry cost, P&L% pinned to zero"
            );
        }

        for day in &days {
            let pct = pnl_pct(day.mtm_pnl, entry_cost, self.min_entry_cost());
            let input = DecisionInput {
                identity: &identity,
                days_held: day.day_index,
                pnl_pct: pct,
                market: &day.market_conditions,
                greeks: &day.greeks,
            };

            let decision = self.should_exit(ledger, profile_id, &input);
            if let (true, Some(reason)) = (decision.should_exit, decision.reason) {
                let event = ExitEvent {
                    exit_day: day.day_index,
                    exit_reason: reason,
                    exit_pnl: day.mtm_pnl,
                    exit_fraction: decision.fraction,
                    pnl_pct: pct,
                };
                info!(
                    trade = %identity,
                    day = event.exit_day,
                    reason = %event.exit_reason,
                    fraction = event.exit_fraction,
                    pnl = format!("{:.2}", event.exit_pnl),
                    pnl_pct = format!("{:.4}", event.pnl_pct),
                    partial = event.is_partial(),
                    "Exit triggered"
                );
                return event;
            }
        }

        let pct = pnl_pct(last.mtm_pnl, entry_cost, self.min_entry_cost());
        info!(
            trade = %identity,
            day = last.day_index,
            pnl = format!("{:.2}", last.mtm_pnl),
            "Path exhausted without exit"
        );
        ExitEvent {
            exit_day: last.day_index,
            exit_reason: ExitReason::MaxTrackingDays,
            exit_pnl: last.mtm_pnl,
            exit_fraction: 1.0,
            pnl_pct: pct,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::config::{ExitConfig, ExitRegistry, PROFILE_LDG, PROFILE_VOV};
    use crate::exit::decision::DEFAULT_MIN_ENTRY_COST;
    use crate::exit::tracker::{PartialExitTracker, SharedPartialExitTracker};
    use crate::types::{Snapshot, TradeEntry, RV10, RV20};
    use chrono::NaiveDate;

    fn engine() -> ExitEngine {
        ExitEngine::new(ExitRegistry::reference().unwrap())
    }

    fn trade(entry_cost: f64, strike: f64, pnls: &[f64]) -> TrackedTrade {
        TrackedTrade {
            entry: TradeEntry {
                entry_date: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
                entry_cost,
                strike,
                expiry: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            },
            path: pnls
                .iter()
                .enumerate()
                .map(|(i, p)| PathDay::bare(i as u32, *p))
                .collect(),
        }
    }

    #[test]
    fn pnl_pct_is_sign_invariant() {
        let long_loss = pnl_pct(-200.0, 1000.0, DEFAULT_MIN_ENTRY_COST);
        let short_loss = pnl_pct(-200.0, -1000.0, DEFAULT_MIN_ENTRY_COST);
        assert!((long_loss + 0.2).abs() < 1e-12);
        assert!((short_loss + 0.2).abs() < 1e-12);

        let short_gain = pnl_pct(300.0, -1000.0, DEFAULT_MIN_ENTRY_COST);
        assert!(short_gain > 0.0);
    }

    #[test]
    fn pnl_pct_zero_cost_guard() {
        assert_eq!(pnl_pct(50.0, 0.0, DEFAULT_MIN_ENTRY_COST), 0.0);
        assert_eq!(pnl_pct(50.0, -0.001, DEFAULT_MIN_ENTRY_COST), 0.0);
    }

    #[test]
    fn partial_exit_returns_raw_day_pnl() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 500.0, &[100.0, 500.0]);

        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_day, 1);
        assert!(event.exit_reason.to_string().contains("tp1"));
        assert_eq!(event.exit_fraction, 0.50);
        assert_eq!(event.exit_pnl, 500.0);
        assert!(event.is_partial());
    }

    #[test]
    fn walk_stops_at_partial_exit() {
        // Day 2 would hit TP2, but the walk ends at the day-1 TP1.
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 500.0, &[0.0, 600.0, 1500.0]);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_day, 1);
        assert_eq!(event.exit_reason, ExitReason::TakeProfit1(0.50));
    }

    #[test]
    fn empty_path_sentinel() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 500.0, &[]);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event, ExitEvent::no_tracking_data());
        assert_eq!(event.exit_reason.to_string(), "no_tracking_data");
        assert_eq!(event.exit_day, 0);
    }

    #[test]
    fn exhausted_path_reports_last_day() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 500.0, &[10.0, -20.0, 30.0]);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_day, 2);
        assert_eq!(event.exit_reason, ExitReason::MaxTrackingDays);
        assert_eq!(event.exit_fraction, 1.0);
        assert_eq!(event.exit_pnl, 30.0);
        assert!((event.pnl_pct - 0.03).abs() < 1e-12);
    }

    #[test]
    fn short_trade_loss_hits_max_loss() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        // Credit trade: collected 800, now losing 400 = -50%.
        let t = trade(-800.0, 450.0, &[-100.0, -400.0]);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_day, 1);
        assert_eq!(event.exit_reason, ExitReason::MaxLoss(-0.50));
        assert_eq!(event.exit_pnl, -400.0);
    }

    #[test]
    fn zero_cost_trade_never_hits_pnl_rules() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(0.0, 450.0, &[-10_000.0, 10_000.0]);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_reason, ExitReason::MaxTrackingDays);
        assert_eq!(event.pnl_pct, 0.0);
    }

    #[test]
    fn unsorted_path_walked_in_day_order() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let mut t = trade(1000.0, 500.0, &[]);
        t.path = vec![PathDay::bare(2, -600.0), PathDay::bare(1, 600.0)];
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(event.exit_day, 1);
        assert_eq!(event.exit_reason, ExitReason::TakeProfit1(0.50));
    }

    #[test]
    fn condition_exit_from_path_snapshot() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let mut t = trade(1000.0, 400.0, &[10.0, 20.0, 30.0]);
        t.path[2].market_conditions = Snapshot::new().with(RV10, 0.25).with(RV20, 0.20);
        let event = engine.apply_to_tracked_trade(&mut tracker, PROFILE_VOV, &t);
        assert_eq!(event.exit_day, 2);
        assert_eq!(event.exit_reason, ExitReason::Condition);
    }

    #[test]
    fn time_stop_from_day_index() {
        let engine = ExitEngine::new(
            ExitRegistry::new(vec![("short_hold".to_string(), ExitConfig::new(-0.5, 2))])
                .unwrap(),
        );
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 400.0, &[0.0, 0.0, 0.0, 0.0]);
        let event = engine.apply_to_tracked_trade(&mut tracker, "short_hold", &t);
        assert_eq!(event.exit_day, 2);
        assert_eq!(event.exit_reason, ExitReason::TimeStop(2));
    }

    #[test]
    fn same_day_trades_each_reach_tp1() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let a = trade(1000.0, 500.0, &[0.0, 550.0]);
        let b = trade(1000.0, 505.0, &[0.0, 550.0]);

        let ea = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &a);
        let eb = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &b);
        assert_eq!(ea.exit_reason, ExitReason::TakeProfit1(0.50));
        assert_eq!(eb.exit_reason, ExitReason::TakeProfit1(0.50));
    }

    #[test]
    fn replaying_trade_without_reset_skips_tp1() {
        let engine = engine();
        let mut tracker = PartialExitTracker::new();
        let t = trade(1000.0, 500.0, &[0.0, 550.0, 560.0]);

        let first = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(first.exit_reason, ExitReason::TakeProfit1(0.50));

        let replay = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(replay.exit_reason, ExitReason::MaxTrackingDays);

        tracker.reset();
        let fresh = engine.apply_to_tracked_trade(&mut tracker, PROFILE_LDG, &t);
        assert_eq!(fresh.exit_reason, ExitReason::TakeProfit1(0.50));
    }

    #[test]
    fn shared_tracker_drives_evaluator() {
        let engine = engine();
        let shared = SharedPartialExitTracker::new();
        let trades: Vec<TrackedTrade> = (0..4)
            .map(|i| trade(1000.0, 500.0 + i as f64, &[0.0, 700.0]))
            .collect();

        let events: Vec<ExitEvent> = std::thread::scope(|scope| {
            let handles: Vec<_> = trades
                .iter()
                .map(|t| {
                    let engine = &engine;
                    let shared = &shared;
                    scope.spawn(move || {
                        let mut ledger = shared;
                        engine.apply_to_tracked_trade(&mut ledger, PROFILE_LDG, t)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(events
            .iter()
            .all(|e| e.exit_reason == ExitReason::TakeProfit1(0.50)));
        assert_eq!(shared.len(), 4);
    }
}
