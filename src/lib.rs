// Library exports for depth-watch

pub mod config; // Configuration management
pub mod error;
pub mod orderbook; // Snapshot model and analytics core

// Snapshot feeds: JSON-lines replay, bounded live buffer, session runner
#[cfg(feature = "feed")]
pub mod feed;

// Markdown report and charting rows
#[cfg(feature = "report")]
pub mod report;

pub use error::{DepthWatchError, Result};
