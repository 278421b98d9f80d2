//! Order book snapshot model
//!
//! One immutable observed book state (top `D` levels per side) and its
//! top-of-book classification. Snapshots that cannot yield a valid spread
//! sample are reported as [`SnapshotAnomaly`] values, not errors.

use super::types::{PriceLevel, Side};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Observed order book state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Capture time (milliseconds since Unix epoch)
    pub timestamp: i64,

    /// Bid levels, best (highest) price first
    #[serde(default)]
    pub bids: Vec<PriceLevel>,

    /// Ask levels, best (lowest) price first
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

/// Validated best bid/ask pair of a healthy book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopOfBook {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
    /// Always strictly positive
    pub spread: Decimal,
}

impl TopOfBook {
    pub fn mid_price(&self) -> Decimal {
        (self.best_bid + self.best_ask) / Decimal::TWO
    }
}

/// Why a snapshot could not be used as a spread sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    MissingBid,
    MissingAsk,
    NonPositivePrice,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingBid => write!(f, "no bid levels"),
            MalformedReason::MissingAsk => write!(f, "no ask levels"),
            MalformedReason::NonPositivePrice => write!(f, "best price is not positive"),
        }
    }
}

/// Per-snapshot data-quality anomaly
///
/// Routed to the session's anomaly channel; never aborts processing.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotAnomaly {
    #[error("malformed snapshot: {reason}")]
    Malformed { reason: MalformedReason },

    #[error("crossed book: best bid {best_bid} >= best ask {best_ask}")]
    CrossedBook {
        #[schemars(with = "String")]
        best_bid: Decimal,
        #[schemars(with = "String")]
        best_ask: Decimal,
    },

    #[error("out-of-order snapshot: earlier than last accepted timestamp {last_timestamp}")]
    OutOfOrder { last_timestamp: i64 },

    #[error("feed gap: {dropped} snapshot(s) dropped")]
    FeedGap { dropped: u64 },
}

impl SnapshotAnomaly {
    pub fn kind(&self) -> &'static str {
        match self {
            SnapshotAnomaly::Malformed { .. } => "malformed",
            SnapshotAnomaly::CrossedBook { .. } => "crossed_book",
            SnapshotAnomaly::OutOfOrder { .. } => "out_of_order",
            SnapshotAnomaly::FeedGap { .. } => "feed_gap",
        }
    }
}

impl OrderBookSnapshot {
    pub fn new(timestamp: i64, bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self {
            timestamp,
            bids,
            asks,
        }
    }

    /// Levels of one side, best price first
    pub fn levels(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// At most `depth` levels of one side
    pub fn top_levels(&self, side: Side, depth: usize) -> &[PriceLevel] {
        let levels = self.levels(side);
        &levels[..levels.len().min(depth)]
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    /// Raw `best_ask - best_bid`; negative on a crossed book
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }

    /// Classify the snapshot's top of book
    ///
    /// - empty side or non-positive best price → `Malformed`
    /// - `best_bid >= best_ask` → `CrossedBook`
    pub fn top_of_book(&self) -> Result<TopOfBook, SnapshotAnomaly> {
        let best_bid = self.best_bid().ok_or(SnapshotAnomaly::Malformed {
            reason: MalformedReason::MissingBid,
        })?;
        let best_ask = self.best_ask().ok_or(SnapshotAnomaly::Malformed {
            reason: MalformedReason::MissingAsk,
        })?;

        if best_bid.price <= Decimal::ZERO || best_ask.price <= Decimal::ZERO {
            return Err(SnapshotAnomaly::Malformed {
                reason: MalformedReason::NonPositivePrice,
            });
        }

        if best_bid.price >= best_ask.price {
            return Err(SnapshotAnomaly::CrossedBook {
                best_bid: best_bid.price,
                best_ask: best_ask.price,
            });
        }

        Ok(TopOfBook {
            best_bid: best_bid.price,
            best_ask: best_ask.price,
            spread: best_ask.price - best_bid.price,
        })
    }
}
