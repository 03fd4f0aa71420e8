// =============================================================================
// Exit Reasons, Decisions and Events
// =============================================================================
//
// `ExitReason` is the closed vocabulary of why a position was (partly)
// closed. Threshold-bearing variants carry their threshold so the canonical
// string form ("max_loss_-50%", "time_stop_day14", ...) can be rebuilt
// losslessly via `Display`.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Why an exit fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExitReason {
    /// P&L% at or below the max-loss threshold (negative fraction).
    MaxLoss(f64),
    /// P&L% at or above the full-exit profit threshold.
    TakeProfit2(f64),
    /// P&L% at or above the first, partial profit threshold.
    TakeProfit1(f64),
    /// Profile-specific thesis invalidation.
    Condition,
    /// Held for at least this many days.
    TimeStop(u32),
    /// No registered profile; generic time stop applied.
    UnknownProfileTimeStop,
    /// Path exhausted without any rule firing.
    MaxTrackingDays,
    /// Path was empty.
    NoTrackingData,
}

fn pct(threshold: f64) -> String {
    format!("{:.0}%", threshold * 100.0)
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxLoss(t) => write!(f, "max_loss_{}", pct(*t)),
            Self::TakeProfit2(t) => write!(f, "tp2_{}", pct(*t)),
            Self::TakeProfit1(t) => write!(f, "tp1_{}", pct(*t)),
            Self::Condition => write!(f, "condition_exit"),
            Self::TimeStop(days) => write!(f, "time_stop_day{days}"),
            Self::UnknownProfileTimeStop => write!(f, "unknown_profile_time_stop"),
            Self::MaxTrackingDays => write!(f, "max_tracking_days"),
            Self::NoTrackingData => write!(f, "no_tracking_data"),
        }
    }
}

// =============================================================================
// ExitDecision
// =============================================================================

/// Verdict of a single `should_exit` call.
///
/// A hold is `should_exit == false`, `fraction == 0.0`, `reason == None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitDecision {
    pub should_exit: bool,
    pub fraction: f64,
    pub reason: Option<ExitReason>,
}

impl ExitDecision {
    pub fn hold() -> Self {
        Self {
            should_exit: false,
            fraction: 0.0,
            reason: None,
        }
    }

    pub fn full(reason: ExitReason) -> Self {
        Self::partial(1.0, reason)
    }

    pub fn partial(fraction: f64, reason: ExitReason) -> Self {
        Self {
            should_exit: true,
            fraction,
            reason: Some(reason),
        }
    }

    /// Canonical reason string; empty on hold.
    pub fn reason_str(&self) -> String {
        self.reason.map(|r| r.to_string()).unwrap_or_default()
    }
}

// =============================================================================
// ExitEvent
// =============================================================================

/// Single exit produced by walking a tracked trade's path.
///
/// `exit_pnl` is the raw mark-to-market dollar P&L of the whole position on
/// the exit day. It is NOT scaled by `exit_fraction`; use `realized_pnl()`
/// for the dollars actually closed.
///
/// A partial event (`is_partial()`) is not a terminal close: the path walk
/// stops at the partial exit and the remainder is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitEvent {
    pub exit_day: u32,
    pub exit_reason: ExitReason,
    pub exit_pnl: f64,
    pub exit_fraction: f64,
    pub pnl_pct: f64,
}

impl ExitEvent {
    /// Sentinel for a trade with no recorded path.
    pub fn no_tracking_data() -> Self {
        Self {
            exit_day: 0,
            exit_reason: ExitReason::NoTrackingData,
            exit_pnl: 0.0,
            exit_fraction: 0.0,
            pnl_pct: 0.0,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.exit_fraction > 0.0 && self.exit_fraction < 1.0
    }

    /// Dollar P&L attributable to the closed fraction.
    pub fn realized_pnl(&self) -> f64 {
        self.exit_pnl * self.exit_fraction
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings_embed_thresholds() {
        assert_eq!(ExitReason::MaxLoss(-0.50).to_string(), "max_loss_-50%");
        assert_eq!(ExitReason::MaxLoss(-1.50).to_string(), "max_loss_-150%");
        assert_eq!(ExitReason::TakeProfit2(1.25).to_string(), "tp2_125%");
        assert_eq!(ExitReason::TakeProfit1(0.50).to_string(), "tp1_50%");
        assert_eq!(ExitReason::TimeStop(14).to_string(), "time_stop_day14");
        assert_eq!(ExitReason::Condition.to_string(), "condition_exit");
        assert_eq!(
            ExitReason::UnknownProfileTimeStop.to_string(),
            "unknown_profile_time_stop"
        );
        assert_eq!(ExitReason::NoTrackingData.to_string(), "no_tracking_data");
        assert_eq!(ExitReason::MaxTrackingDays.to_string(), "max_tracking_days");
    }

    #[test]
    fn hold_decision_is_empty() {
        let d = ExitDecision::hold();
        assert!(!d.should_exit);
        assert_eq!(d.fraction, 0.0);
        assert_eq!(d.reason_str(), "");
    }

    #[test]
    fn partial_event_is_flagged() {
        let event = ExitEvent {
            exit_day: 1,
            exit_reason: ExitReason::TakeProfit1(0.5),
            exit_pnl: 500.0,
            exit_fraction: 0.5,
            pnl_pct: 0.5,
        };
        assert!(event.is_partial());
        assert!((event.realized_pnl() - 250.0).abs() < 1e-9);

        let full = ExitEvent {
            exit_fraction: 1.0,
            ..event
        };
        assert!(!full.is_partial());
        assert!(!ExitEvent::no_tracking_data().is_partial());
    }

    #[test]
    fn reason_serialises_as_tagged() {
        let json = serde_json::to_string(&ExitReason::TimeStop(5)).unwrap();
        assert_eq!(json, r#"{"kind":"time_stop","value":5}"#);
        let json = serde_json::to_string(&ExitReason::Condition).unwrap();
        assert_eq!(json, r#"{"kind":"condition"}"#);
    }
}
