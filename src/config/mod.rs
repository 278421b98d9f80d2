//! Configuration Management
//!
//! Session configuration (detector thresholds, window sizes) and feed
//! configuration (buffer capacity, capture duration). Both are explicit
//! immutable values handed to constructors, never read from global state.

pub mod feed;
pub mod session;

// Re-export
pub use feed::FeedConfig;
pub use session::{AbnormalVolumeRule, SessionConfig};

use crate::error::ConfigError;
use std::fmt::Display;
use std::str::FromStr;

/// Read an environment variable, falling back to `default` when unset
pub(crate) fn env_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
            name,
            reason: format!("cannot parse {:?}: {}", raw, e),
        }),
        Err(_) => Ok(default),
    }
}
