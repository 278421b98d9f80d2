//! Detector configuration shared by one analysis session

use super::env_or;
use crate::error::{ConfigError, DepthWatchError, Result};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Rule used to decide that a level's quantity is abnormal vs. its baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AbnormalVolumeRule {
    /// quantity > mean + k * std_dev
    #[default]
    ZScore,

    /// quantity > mean * k
    Multiplier,
}

impl AbnormalVolumeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbnormalVolumeRule::ZScore => "z_score",
            AbnormalVolumeRule::Multiplier => "multiplier",
        }
    }
}

impl fmt::Display for AbnormalVolumeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AbnormalVolumeRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z_score" | "zscore" | "z-score" => Ok(AbnormalVolumeRule::ZScore),
            "multiplier" | "ratio" => Ok(AbnormalVolumeRule::Multiplier),
            other => Err(format!(
                "unknown abnormal volume rule '{}', expected z_score or multiplier",
                other
            )),
        }
    }
}

/// Session-wide detection configuration
///
/// ## Environment Variables
///
/// - `DEPTH_WATCH_SPREAD_THRESHOLD`: spread that opens a widening episode (default: 10)
/// - `DEPTH_WATCH_RECOVERY_THRESHOLD`: spread at or below which an episode closes (default: spread threshold)
/// - `DEPTH_WATCH_DEPTH`: levels per side considered by the detectors (default: 20)
/// - `DEPTH_WATCH_BASELINE_WINDOW`: warm-up / rolling window in snapshots (default: 20)
/// - `DEPTH_WATCH_K_FACTOR`: z-score or multiplier for abnormal volume (default: 3)
/// - `DEPTH_WATCH_ABNORMAL_RULE`: `z_score` or `multiplier` (default: z_score)
/// - `DEPTH_WATCH_MIN_SIGNIFICANT_QTY`: minimum quantity for disappearance events (default: 1)
/// - `DEPTH_WATCH_MIN_WALL_QTY`: absolute floor for abnormal volume events (default: 0, off)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Spread (quote currency) above which a widening episode opens
    #[schemars(with = "String")]
    pub spread_threshold: Decimal,

    /// Spread at or below which an open episode closes (hysteresis when lower)
    #[schemars(with = "String")]
    pub recovery_threshold: Decimal,

    /// Number of levels per side the detectors look at
    #[schemars(range(min = 1))]
    pub depth: usize,

    /// Snapshots a level must observe before detection runs on it
    #[schemars(range(min = 1))]
    pub baseline_window: usize,

    /// Z-score or multiplier, depending on `abnormal_rule`
    pub k_factor: f64,

    pub abnormal_rule: AbnormalVolumeRule,

    /// Levels at or below this quantity never raise disappearance events
    #[schemars(with = "String")]
    pub min_significant_qty: Decimal,

    /// Levels at or below this quantity never raise abnormal-volume events
    #[schemars(with = "String")]
    pub min_wall_qty: Decimal,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            spread_threshold: Decimal::from(10),
            recovery_threshold: Decimal::from(10),
            depth: 20,
            baseline_window: 20,
            k_factor: 3.0,
            abnormal_rule: AbnormalVolumeRule::ZScore,
            min_significant_qty: Decimal::ONE,
            min_wall_qty: Decimal::ZERO,
        }
    }
}

impl SessionConfig {
    /// Validates every field and the relations between them.
    ///
    /// # Validation Rules
    /// - `spread_threshold > 0`
    /// - `0 < recovery_threshold <= spread_threshold`
    /// - `depth > 0`, `baseline_window > 0`
    /// - `k_factor` finite and `> 0`
    /// - `min_significant_qty >= 0`, `min_wall_qty >= 0`
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.spread_threshold <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveSpreadThreshold(
                self.spread_threshold,
            ));
        }
        if self.recovery_threshold <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveRecoveryThreshold(
                self.recovery_threshold,
            ));
        }
        if self.recovery_threshold > self.spread_threshold {
            return Err(ConfigError::RecoveryAboveSpread {
                recovery: self.recovery_threshold,
                spread: self.spread_threshold,
            });
        }
        if self.depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.baseline_window == 0 {
            return Err(ConfigError::ZeroBaselineWindow);
        }
        if !self.k_factor.is_finite() || self.k_factor <= 0.0 {
            return Err(ConfigError::InvalidKFactor(self.k_factor));
        }
        if self.min_significant_qty < Decimal::ZERO {
            return Err(ConfigError::NegativeMinSignificantQty(
                self.min_significant_qty,
            ));
        }
        if self.min_wall_qty < Decimal::ZERO {
            return Err(ConfigError::NegativeMinWallQty(self.min_wall_qty));
        }
        Ok(())
    }

    /// Load configuration from `DEPTH_WATCH_*` environment variables
    ///
    /// Unset variables keep their default. The result is validated.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let defaults = Self::default();

        let spread_threshold = env_or("DEPTH_WATCH_SPREAD_THRESHOLD", defaults.spread_threshold)?;
        // Without an explicit recovery threshold there is no hysteresis band
        let recovery_threshold = env_or("DEPTH_WATCH_RECOVERY_THRESHOLD", spread_threshold)?;

        let config = Self {
            spread_threshold,
            recovery_threshold,
            depth: env_or("DEPTH_WATCH_DEPTH", defaults.depth)?,
            baseline_window: env_or("DEPTH_WATCH_BASELINE_WINDOW", defaults.baseline_window)?,
            k_factor: env_or("DEPTH_WATCH_K_FACTOR", defaults.k_factor)?,
            abnormal_rule: env_or("DEPTH_WATCH_ABNORMAL_RULE", defaults.abnormal_rule)?,
            min_significant_qty: env_or(
                "DEPTH_WATCH_MIN_SIGNIFICANT_QTY",
                defaults.min_significant_qty,
            )?,
            min_wall_qty: env_or("DEPTH_WATCH_MIN_WALL_QTY", defaults.min_wall_qty)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields keep their default, except a missing
    /// `recovery_threshold` which follows `spread_threshold`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let has_recovery = value.get("recovery_threshold").is_some();

        let mut config: Self = serde_json::from_value(value)?;
        if !has_recovery {
            config.recovery_threshold = config.spread_threshold;
        }
        config.validate().map_err(DepthWatchError::from)?;
        Ok(config)
    }
}
