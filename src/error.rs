//! Error types for exit-engine configuration.
//!
//! Evaluation itself never fails; only building a profile registry or
//! validating engine settings can.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("profile id must not be empty")]
    EmptyProfileId,

    #[error("duplicate profile id: {0}")]
    DuplicateProfile(String),

    #[error("{profile}: max_loss_pct must be strictly negative, got {value}")]
    MaxLossNotNegative { profile: String, value: f64 },

    #[error("{profile}: max_hold_days must be positive")]
    ZeroHoldDays { profile: String },

    #[error("{profile}: tp1_pct and tp1_fraction must be set together")]
    Tp1Incomplete { profile: String },

    #[error("{profile}: tp1_fraction must be in (0, 1], got {value}")]
    Tp1FractionOutOfRange { profile: String, value: f64 },

    #[error("{profile}: {field} must be a positive finite threshold, got {value}")]
    InvalidThreshold {
        profile: String,
        field: &'static str,
        value: f64,
    },

    #[error("{profile}: tp2_pct ({tp2}) must exceed tp1_pct ({tp1})")]
    Tp2NotAboveTp1 { profile: String, tp1: f64, tp2: f64 },

    #[error("min_entry_cost must be finite and non-negative, got {0}")]
    InvalidMinEntryCost(f64),

    #[error("unknown_profile_max_hold_days must be positive")]
    ZeroFallbackHoldDays,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
