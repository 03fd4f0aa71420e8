// =============================================================================
// Condition Exits - per-profile thesis-invalidation predicates
// =============================================================================
//
// Each strategy profile names one predicate. A predicate inspects the day's
// market and Greeks snapshots and answers "has this profile's thesis broken
// down?".
//
// Contract shared by all predicates:
//   - Missing or null input  -> that clause is not met (never an error).
//   - Zero is a real value and is compared normally.
//   - Pure: same inputs, same answer.
//
// Predicates:
//   - TrendBroken:              slope_MA20 <= 0  OR  close < MA20
//   - TermStructureNormalized:  RV10 >= RV20
//   - Never:                    always false (profile relies on risk /
//                               profit / time rules only)
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::types::{Greeks, MarketConditions, CLOSE, MA20, RV10, RV20, SLOPE_MA20};

/// Reference to a profile's condition predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCondition {
    /// Directional thesis lost: trend slope no longer positive, or price has
    /// fallen below its moving average.
    TrendBroken,
    /// Volatility term structure back to normal: short-horizon realized vol
    /// has caught up with the longer horizon.
    TermStructureNormalized,
    /// No condition exit for this profile.
    #[default]
    Never,
}

impl ExitCondition {
    /// Evaluate the predicate. Total over every combination of present and
    /// absent inputs.
    pub fn evaluate(&self, market: &MarketConditions, greeks: &Greeks) -> bool {
        let fired = match self {
            Self::TrendBroken => trend_broken(market),
            Self::TermStructureNormalized => term_structure_normalized(market),
            Self::Never => false,
        };
        trace!(condition = ?self, fired, greeks = greeks.len(), "condition evaluated");
        fired
    }
}

fn trend_broken(market: &MarketConditions) -> bool {
    if let Some(slope) = market.get(SLOPE_MA20) {
        if slope <= 0.0 {
            return true;
        }
    }

    match (market.get(CLOSE), market.get(MA20)) {
        (Some(close), Some(ma20)) => close < ma20,
        _ => false,
    }
}

fn term_structure_normalized(market: &MarketConditions) -> bool {
    match (market.get(RV10), market.get(RV20)) {
        (Some(rv10), Some(rv20)) => rv10 >= rv20,
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Snapshot;

    fn none() -> Snapshot {
        Snapshot::new()
    }

    #[test]
    fn trend_broken_on_flat_slope() {
        // Zero slope is "not positive" and must trigger.
        let market = Snapshot::new().with(SLOPE_MA20, 0.0);
        assert!(ExitCondition::TrendBroken.evaluate(&market, &none()));
    }

    #[test]
    fn trend_broken_on_negative_slope() {
        let market = Snapshot::new().with(SLOPE_MA20, -0.01);
        assert!(ExitCondition::TrendBroken.evaluate(&market, &none()));
    }

    #[test]
    fn trend_broken_on_close_below_ma() {
        let market = Snapshot::new()
            .with(SLOPE_MA20, 0.02)
            .with(CLOSE, 99.0)
            .with(MA20, 100.0);
        assert!(ExitCondition::TrendBroken.evaluate(&market, &none()));
    }

    #[test]
    fn trend_intact() {
        let market = Snapshot::new()
            .with(SLOPE_MA20, 0.02)
            .with(CLOSE, 101.0)
            .with(MA20, 100.0);
        assert!(!ExitCondition::TrendBroken.evaluate(&market, &none()));
    }

    #[test]
    fn trend_null_inputs_do_not_fire() {
        // Null slope must not be treated as zero.
        let market = Snapshot::new().with_null(SLOPE_MA20).with(CLOSE, 90.0);
        assert!(!ExitCondition::TrendBroken.evaluate(&market, &none()));
        assert!(!ExitCondition::TrendBroken.evaluate(&none(), &none()));
    }

    #[test]
    fn trend_close_clause_works_without_slope() {
        let market = Snapshot::new().with(CLOSE, 0.0).with(MA20, 10.0);
        assert!(ExitCondition::TrendBroken.evaluate(&market, &none()));
    }

    #[test]
    fn term_structure_normalized_when_short_vol_catches_up() {
        let equal = Snapshot::new().with(RV10, 0.2).with(RV20, 0.2);
        assert!(ExitCondition::TermStructureNormalized.evaluate(&equal, &none()));

        let inverted = Snapshot::new().with(RV10, 0.15).with(RV20, 0.2);
        assert!(!ExitCondition::TermStructureNormalized.evaluate(&inverted, &none()));
    }

    #[test]
    fn term_structure_missing_leg_does_not_fire() {
        let market = Snapshot::new().with(RV10, 0.3).with_null(RV20);
        assert!(!ExitCondition::TermStructureNormalized.evaluate(&market, &none()));
    }

    #[test]
    fn never_is_never() {
        let market = Snapshot::new()
            .with(SLOPE_MA20, -1.0)
            .with(RV10, 1.0)
            .with(RV20, 0.1);
        assert!(!ExitCondition::Never.evaluate(&market, &none()));
        assert_eq!(ExitCondition::default(), ExitCondition::Never);
    }

    #[test]
    fn predicates_are_idempotent() {
        let market = Snapshot::new()
            .with(SLOPE_MA20, 0.0)
            .with(RV10, 0.25)
            .with(RV20, 0.2);
        for cond in [
            ExitCondition::TrendBroken,
            ExitCondition::TermStructureNormalized,
            ExitCondition::Never,
        ] {
            let first = cond.evaluate(&market, &none());
            let second = cond.evaluate(&market, &none());
            assert_eq!(first, second, "{cond:?} not idempotent");
        }
    }
}
