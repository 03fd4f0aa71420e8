// =============================================================================
// Shared types used across the exit engine
// =============================================================================
//
// Everything here is produced by the external simulator and is read-only to
// the engine: sparse daily snapshots, the trade entry, and the recorded
// mark-to-market path.
// =============================================================================

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// Snapshot keys
// =============================================================================

/// 20-day moving-average slope (smoothed trend indicator).
pub const SLOPE_MA20: &str = "slope_MA20";

/// Underlying close price.
pub const CLOSE: &str = "close";

/// 20-day moving-average level.
pub const MA20: &str = "MA20";

/// 10-day realized volatility.
pub const RV10: &str = "RV10";

/// 20-day realized volatility.
pub const RV20: &str = "RV20";

// =============================================================================
// Snapshot
// =============================================================================

/// Sparse key/value mapping of daily indicators.
///
/// Used for both the market-conditions snapshot and the Greeks snapshot. A
/// key may be missing entirely or present with an explicit `null`; both read
/// back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(HashMap<String, Option<f64>>);

/// Market indicators for one day.
pub type MarketConditions = Snapshot;

/// Option Greeks for one day.
pub type Greeks = Snapshot;

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a present value.
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), Some(value));
        self
    }

    /// Builder-style insert of an explicit null.
    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Look up a value. Missing keys, explicit nulls and non-finite numbers
    /// all return `None`; zero is a real value.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0
            .get(key)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Tracked trade
// =============================================================================

/// Entry leg of a tracked option position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub entry_date: NaiveDate,

    /// Signed premium: positive = debit (long), negative = credit (short).
    pub entry_cost: f64,

    pub strike: f64,

    pub expiry: NaiveDate,
}

/// One recorded day of a position's mark-to-market path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDay {
    /// Days since entry, 0-based.
    pub day_index: u32,

    /// Signed dollar P&L on this day for the whole position.
    pub mtm_pnl: f64,

    #[serde(default)]
    pub market_conditions: MarketConditions,

    #[serde(default)]
    pub greeks: Greeks,
}

impl PathDay {
    /// A day with empty snapshots.
    pub fn bare(day_index: u32, mtm_pnl: f64) -> Self {
        Self {
            day_index,
            mtm_pnl,
            market_conditions: Snapshot::default(),
            greeks: Snapshot::default(),
        }
    }
}

/// A simulator-produced trade: entry plus its daily path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTrade {
    pub entry: TradeEntry,

    /// Ordered by `day_index`.
    #[serde(default)]
    pub path: Vec<PathDay>,
}

impl TrackedTrade {
    /// Build the synthetic trade that represents what is still open after a
    /// partial exit on `exit_day` closing `exit_fraction` of the position.
    ///
    /// Keeps only the days strictly after `exit_day`; entry cost and every
    /// day's P&L are scaled by the remaining fraction so dollar figures refer
    /// to the remainder. Entry date, strike and expiry are unchanged, so the
    /// remainder shares the original trade identity.
    ///
    /// Returns `None` when nothing remains (fraction >= 1 or no later days).
    pub fn remainder_after(&self, exit_day: u32, exit_fraction: f64) -> Option<TrackedTrade> {
        let remaining = 1.0 - exit_fraction;
        if remaining <= 0.0 {
            return None;
        }

        let path: Vec<PathDay> = self
            .path
            .iter()
            .filter(|d| d.day_index > exit_day)
            .map(|d| PathDay {
                mtm_pnl: d.mtm_pnl * remaining,
                ..d.clone()
            })
            .collect();

        if path.is_empty() {
            return None;
        }

        Some(TrackedTrade {
            entry: TradeEntry {
                entry_cost: self.entry.entry_cost * remaining,
                ..self.entry.clone()
            },
            path,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
