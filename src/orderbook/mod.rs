//! Order book model and depth analytics
//!
//! - Snapshot model with top-of-book classification (healthy, crossed, malformed)
//! - Local L2 book maintained from snapshots and deltas
//! - Spread and wall analytics over snapshot sequences

pub mod analytics;
pub mod snapshot;
pub mod types;

pub use snapshot::{MalformedReason, OrderBookSnapshot, SnapshotAnomaly, TopOfBook};
pub use types::{OrderBook, PriceLevel, Side};
