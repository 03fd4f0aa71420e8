// =============================================================================
// Engine Settings - JSON-backed configuration
// =============================================================================
//
// The few tunables the exit engine exposes beyond its profile table: the
// fallback hold limit for unknown profiles, the zero-cost epsilon, and the
// driver's remainder follow-through switch. An optional `profiles` map
// replaces the built-in profile table wholesale.
//
// Every field carries `#[serde(default)]` so a partial or empty file loads.
// Only a missing file falls back to defaults; a file that exists but does not
// parse, or describes invalid settings, is an error.
//
// =============================================================================

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

use crate::exit::config::{ExitConfig, ExitRegistry};
use crate::exit::decision::{
    ExitEngine, DEFAULT_MIN_ENTRY_COST, DEFAULT_UNKNOWN_PROFILE_HOLD_DAYS,
};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_unknown_profile_max_hold_days() -> u32 {
    DEFAULT_UNKNOWN_PROFILE_HOLD_DAYS
}

fn default_min_entry_cost() -> f64 {
    DEFAULT_MIN_ENTRY_COST
}

// =============================================================================
// EngineSettings
// =============================================================================

/// Top-level settings for the exit engine and its backtest driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Days held before an unknown profile is closed.
    #[serde(default = "default_unknown_profile_max_hold_days")]
    pub unknown_profile_max_hold_days: u32,

    /// |entry cost| below this is treated as a zero-cost trade.
    #[serde(default = "default_min_entry_cost")]
    pub min_entry_cost: f64,

    /// Driver only: keep evaluating the remainder after a partial exit.
    #[serde(default)]
    pub follow_remainder: bool,

    /// Replacement profile table. `None` keeps the built-in six profiles.
    #[serde(default)]
    pub profiles: Option<BTreeMap<String, ExitConfig>>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            unknown_profile_max_hold_days: default_unknown_profile_max_hold_days(),
            min_entry_cost: default_min_entry_cost(),
            follow_remainder: false,
            profiles: None,
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file at `path`.
    ///
    /// A missing file yields the defaults with a warning. Any other read or
    /// parse failure is returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read engine settings from {}", path.display())
                })
            }
        };

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine settings from {}", path.display()))?;

        info!(
            path = %path.display(),
            custom_profiles = settings.profiles.as_ref().map(BTreeMap::len),
            follow_remainder = settings.follow_remainder,
            "engine settings loaded"
        );

        Ok(settings)
    }

    /// Check the engine-level tunables.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.min_entry_cost.is_finite() && self.min_entry_cost >= 0.0) {
            return Err(ConfigError::InvalidMinEntryCost(self.min_entry_cost));
        }
        if self.unknown_profile_max_hold_days == 0 {
            return Err(ConfigError::ZeroFallbackHoldDays);
        }
        Ok(())
    }

    /// Build the profile registry these settings describe. Fails fast on
    /// any invalid profile.
    pub fn registry(&self) -> Result<ExitRegistry> {
        let registry = match &self.profiles {
            Some(profiles) => ExitRegistry::new(profiles.clone()),
            None => ExitRegistry::reference(),
        };
        registry.context("invalid exit profile configuration")
    }

    /// Build a ready-to-use engine. Fails fast on invalid settings or
    /// profiles.
    pub fn build_engine(&self) -> Result<ExitEngine> {
        self.validate().context("invalid engine settings")?;
        Ok(ExitEngine::new(self.registry()?)
            .with_unknown_profile_hold_days(self.unknown_profile_max_hold_days)
            .with_min_entry_cost(self.min_entry_cost))
    }
}
