use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepthWatchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid report options: {0}")]
    InvalidReportOptions(String),
}

/// Configuration errors, fatal at construction time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("spread_threshold must be > 0, got {0}")]
    NonPositiveSpreadThreshold(Decimal),

    #[error("recovery_threshold must be > 0, got {0}")]
    NonPositiveRecoveryThreshold(Decimal),

    #[error("recovery_threshold ({recovery}) must not exceed spread_threshold ({spread})")]
    RecoveryAboveSpread { recovery: Decimal, spread: Decimal },

    #[error("depth must be > 0")]
    ZeroDepth,

    #[error("baseline_window must be > 0")]
    ZeroBaselineWindow,

    #[error("k_factor must be finite and > 0, got {0}")]
    InvalidKFactor(f64),

    #[error("min_significant_qty must be >= 0, got {0}")]
    NegativeMinSignificantQty(Decimal),

    #[error("min_wall_qty must be >= 0, got {0}")]
    NegativeMinWallQty(Decimal),

    #[error("buffer_capacity must be > 0")]
    ZeroBufferCapacity,

    #[error("{name}: {reason}")]
    Env { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::NonPositiveSpreadThreshold(_) => "spread_threshold",
            ConfigError::NonPositiveRecoveryThreshold(_) => "recovery_threshold",
            ConfigError::RecoveryAboveSpread { .. } => "recovery_threshold",
            ConfigError::ZeroDepth => "depth",
            ConfigError::ZeroBaselineWindow => "baseline_window",
            ConfigError::InvalidKFactor(_) => "k_factor",
            ConfigError::NegativeMinSignificantQty(_) => "min_significant_qty",
            ConfigError::NegativeMinWallQty(_) => "min_wall_qty",
            ConfigError::ZeroBufferCapacity => "buffer_capacity",
            ConfigError::Env { name, .. } => name,
        }
    }
}

pub type Result<T> = std::result::Result<T, DepthWatchError>;
