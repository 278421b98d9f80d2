//! Feed Configuration
//!
//! Buffering and capture-duration settings for live (push-based) feeds.

use super::env_or;
use crate::error::ConfigError;
use std::time::Duration;

/// Feed configuration
///
/// ## Environment Variables
///
/// - `DEPTH_WATCH_BUFFER_CAPACITY`: snapshots held before the oldest is dropped (default: 1024)
/// - `DEPTH_WATCH_DURATION_SECS`: stop the session after this many seconds (default: unlimited)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Bounded buffer size between producer and session
    pub buffer_capacity: usize,

    /// Fixed capture duration; `None` runs until the feed ends or is cancelled
    pub max_duration: Option<Duration>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
            max_duration: None,
        }
    }
}

impl FeedConfig {
    /// Load feed configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let buffer_capacity = env_or("DEPTH_WATCH_BUFFER_CAPACITY", defaults.buffer_capacity)?;
        let duration_secs: u64 = env_or("DEPTH_WATCH_DURATION_SECS", 0)?;

        let config = Self {
            buffer_capacity,
            max_duration: (duration_secs > 0).then(|| Duration::from_secs(duration_secs)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroBufferCapacity);
        }
        Ok(())
    }
}
