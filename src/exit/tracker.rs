// =============================================================================
// Partial-Exit Tracking - one-shot TP1 state per trade identity
// =============================================================================
//
// TP1 may fire at most once per trade identity. The tracker remembers which
// identities have fired. It is an explicit value owned by one backtest run:
// a fresh `PartialExitTracker::new()` per run means state from one run can
// never leak into the next. `reset()` exists for callers that reuse one
// instance across batches.
//
// `SharedPartialExitTracker` puts the same state behind a mutex so trades can
// be evaluated from several threads; the check-and-set of `claim_tp1` runs
// under a single lock acquisition.
// =============================================================================

use std::collections::HashSet;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TradeEntry;

// =============================================================================
// TradeIdentity
// =============================================================================

/// Key distinguishing one tracked position from another.
///
/// Two trades opened under the same profile on the same day are still
/// distinct when their strike or expiry differ. Strikes are stored in
/// thousandths so the key is hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeIdentity {
    pub profile_id: String,
    pub entry_date: NaiveDate,
    pub strike_milli: i64,
    pub expiry: NaiveDate,
}

impl TradeIdentity {
    pub fn new(profile_id: impl Into<String>, entry: &TradeEntry) -> Self {
        Self {
            profile_id: profile_id.into(),
            entry_date: entry.entry_date,
            strike_milli: (entry.strike * 1000.0).round() as i64,
            expiry: entry.expiry,
        }
    }
}

impl std::fmt::Display for TradeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{:.3}:{}",
            self.profile_id,
            self.entry_date,
            self.strike_milli as f64 / 1000.0,
            self.expiry
        )
    }
}

// =============================================================================
// Ledger trait
// =============================================================================

/// Storage for one-shot TP1 state consulted by the decision procedure.
pub trait PartialExitLedger {
    /// Record a TP1 fire for `identity`. Returns `true` only the first time;
    /// later calls for the same identity return `false` and change nothing.
    fn claim_tp1(&mut self, identity: &TradeIdentity) -> bool;

    /// Whether TP1 already fired for `identity`.
    fn has_fired(&self, identity: &TradeIdentity) -> bool;
}

// =============================================================================
// PartialExitTracker
// =============================================================================

/// Single-threaded tracker, scoped to one backtest run.
#[derive(Debug, Clone, Default)]
pub struct PartialExitTracker {
    fired: HashSet<TradeIdentity>,
}

impl PartialExitTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every recorded fire.
    pub fn reset(&mut self) {
        let cleared = self.fired.len();
        self.fired.clear();
        debug!(cleared, "partial-exit tracker reset");
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

impl PartialExitLedger for PartialExitTracker {
    fn claim_tp1(&mut self, identity: &TradeIdentity) -> bool {
        if self.fired.contains(identity) {
            return false;
        }
        self.fired.insert(identity.clone());
        true
    }

    fn has_fired(&self, identity: &TradeIdentity) -> bool {
        self.fired.contains(identity)
    }
}

// =============================================================================
// SharedPartialExitTracker
// =============================================================================

/// Mutex-protected tracker for parallel trade evaluation.
///
/// Pass `&mut &shared` wherever a `PartialExitLedger` is expected.
#[derive(Debug, Default)]
pub struct SharedPartialExitTracker {
    inner: Mutex<PartialExitTracker>,
}

impl SharedPartialExitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Unwrap into a plain tracker once parallel work is done.
    pub fn into_inner(self) -> PartialExitTracker {
        self.inner.into_inner()
    }
}

impl PartialExitLedger for &SharedPartialExitTracker {
    fn claim_tp1(&mut self, identity: &TradeIdentity) -> bool {
        self.inner.lock().claim_tp1(identity)
    }

    fn has_fired(&self, identity: &TradeIdentity) -> bool {
        self.inner.lock().has_fired(identity)
    }
}

// =============================================================================
// Tests
// =============================================================================
