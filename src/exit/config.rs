// =============================================================================
// Exit Configuration Registry
// =============================================================================
//
// One immutable `ExitConfig` per strategy profile. The registry is built once
// at startup and validated up front; a malformed entry is a programming error
// and fails construction instead of surfacing during evaluation.
//
// Reference table:
//
//   Profile          max_loss   tp1 (fraction)   tp2    hold   condition
//   Profile_1_LDG    -50%       50% (0.50)       100%   14     trend broken
//   Profile_2_SDG    -40%       -                75%    5      never
//   Profile_3_CHARM  -150%      60% (1.00)       -      14     never
//   Profile_4_VANNA  -50%       50% (0.50)       125%   14     trend broken
//   Profile_5_SKEW   -50%       -                100%   5      never
//   Profile_6_VOV    -50%       50% (0.50)       100%   14     term structure
//
// CHARM is a short-premium profile, so its loss budget exceeds the credit.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::exit::conditions::ExitCondition;

// =============================================================================
// ExitConfig
// =============================================================================

/// Risk, profit-target and time-stop parameters for one strategy profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitConfig {
    /// Loss threshold as a negative fraction of |entry cost|.
    pub max_loss_pct: f64,

    /// Time-stop backstop in days held.
    pub max_hold_days: u32,

    /// First (partial) profit threshold.
    #[serde(default)]
    pub tp1_pct: Option<f64>,

    /// Fraction of the position closed at TP1, in (0, 1].
    #[serde(default)]
    pub tp1_fraction: Option<f64>,

    /// Second (full) profit threshold. Checked before TP1.
    #[serde(default)]
    pub tp2_pct: Option<f64>,

    #[serde(default)]
    pub condition: ExitCondition,
}

impl ExitConfig {
    /// A config with risk and time rules only.
    pub fn new(max_loss_pct: f64, max_hold_days: u32) -> Self {
        Self {
            max_loss_pct,
            max_hold_days,
            tp1_pct: None,
            tp1_fraction: None,
            tp2_pct: None,
            condition: ExitCondition::Never,
        }
    }

    pub fn with_tp1(mut self, pct: f64, fraction: f64) -> Self {
        self.tp1_pct = Some(pct);
        self.tp1_fraction = Some(fraction);
        self
    }

    pub fn with_tp2(mut self, pct: f64) -> Self {
        self.tp2_pct = Some(pct);
        self
    }

    pub fn with_condition(mut self, condition: ExitCondition) -> Self {
        self.condition = condition;
        self
    }

    /// TP1 threshold and fraction, when configured.
    pub fn tp1(&self) -> Option<(f64, f64)> {
        self.tp1_pct.zip(self.tp1_fraction)
    }

    /// Check every structural invariant of this config.
    pub fn validate(&self, profile: &str) -> Result<()> {
        let profile = profile.to_string();

        if !(self.max_loss_pct.is_finite() && self.max_loss_pct < 0.0) {
            return Err(ConfigError::MaxLossNotNegative {
                profile,
                value: self.max_loss_pct,
            });
        }

        if self.max_hold_days == 0 {
            return Err(ConfigError::ZeroHoldDays { profile });
        }

        if self.tp1_pct.is_some() != self.tp1_fraction.is_some() {
            return Err(ConfigError::Tp1Incomplete { profile });
        }

        if let Some(tp1) = self.tp1_pct {
            check_threshold(&profile, "tp1_pct", tp1)?;
        }
        if let Some(fraction) = self.tp1_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::Tp1FractionOutOfRange {
                    profile,
                    value: fraction,
                });
            }
        }
        if let Some(tp2) = self.tp2_pct {
            check_threshold(&profile, "tp2_pct", tp2)?;
        }

        if let (Some(tp1), Some(tp2)) = (self.tp1_pct, self.tp2_pct) {
            if tp2 <= tp1 {
                return Err(ConfigError::Tp2NotAboveTp1 { profile, tp1, tp2 });
            }
        }

        Ok(())
    }
}

fn check_threshold(profile: &str, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            profile: profile.to_string(),
            field,
            value,
        })
    }
}

// =============================================================================
// Reference profiles
// =============================================================================

pub const PROFILE_LDG: &str = "Profile_1_LDG";
pub const PROFILE_SDG: &str = "Profile_2_SDG";
pub const PROFILE_CHARM: &str = "Profile_3_CHARM";
pub const PROFILE_VANNA: &str = "Profile_4_VANNA";
pub const PROFILE_SKEW: &str = "Profile_5_SKEW";
pub const PROFILE_VOV: &str = "Profile_6_VOV";

/// The six built-in profile configs.
pub fn reference_profiles() -> Vec<(String, ExitConfig)> {
    vec![
        (
            PROFILE_LDG.to_string(),
            ExitConfig::new(-0.50, 14)
                .with_tp1(0.50, 0.50)
                .with_tp2(1.00)
                .with_condition(ExitCondition::TrendBroken),
        ),
        (
            PROFILE_SDG.to_string(),
            ExitConfig::new(-0.40, 5).with_tp2(0.75),
        ),
        (
            PROFILE_CHARM.to_string(),
            ExitConfig::new(-1.50, 14).with_tp1(0.60, 1.00),
        ),
        (
            PROFILE_VANNA.to_string(),
            ExitConfig::new(-0.50, 14)
                .with_tp1(0.50, 0.50)
                .with_tp2(1.25)
                .with_condition(ExitCondition::TrendBroken),
        ),
        (
            PROFILE_SKEW.to_string(),
            ExitConfig::new(-0.50, 5).with_tp2(1.00),
        ),
        (
            PROFILE_VOV.to_string(),
            ExitConfig::new(-0.50, 14)
                .with_tp1(0.50, 0.50)
                .with_tp2(1.00)
                .with_condition(ExitCondition::TermStructureNormalized),
        ),
    ]
}

// =============================================================================
// ExitRegistry
// =============================================================================

/// Immutable profile-id -> `ExitConfig` mapping.
#[derive(Debug, Clone)]
pub struct ExitRegistry {
    configs: HashMap<String, ExitConfig>,
}

impl ExitRegistry {
    /// Build a registry, validating every entry. Fails on the first bad
    /// entry or duplicate id.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ExitConfig)>,
    {
        let mut configs = HashMap::new();

        for (profile, config) in entries {
            if profile.trim().is_empty() {
                return Err(ConfigError::EmptyProfileId);
            }
            config.validate(&profile)?;
            if configs.contains_key(&profile) {
                return Err(ConfigError::DuplicateProfile(profile));
            }
            debug!(
                profile = %profile,
                max_loss_pct = config.max_loss_pct,
                tp1 = ?config.tp1(),
                tp2 = ?config.tp2_pct,
                max_hold_days = config.max_hold_days,
                condition = ?config.condition,
                "exit profile registered"
            );
            configs.insert(profile, config);
        }

        Ok(Self { configs })
    }

    /// Registry populated with the six built-in profiles.
    pub fn reference() -> Result<Self> {
        Self::new(reference_profiles())
    }

    /// Look up a profile. `None` for unknown ids.
    pub fn get_config(&self, profile_id: &str) -> Option<&ExitConfig> {
        self.configs.get(profile_id)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Registered profile ids, sorted.
    pub fn profile_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// =============================================================================
// Tests
// =============================================================================
