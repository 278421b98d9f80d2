//! Order book data structures and types
//!
//! Price levels, book sides and the local book used to turn depth deltas
//! into snapshots.

use super::snapshot::OrderBookSnapshot;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side (support)
    Bid,

    /// Sell side (resistance)
    Ask,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Bid, Side::Ask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One resting price level
///
/// Serialized as a `[price, quantity]` pair, the layout depth feeds use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Decimal, Decimal)", into = "(Decimal, Decimal)")]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self { price, quantity }
    }
}

impl From<(Decimal, Decimal)> for PriceLevel {
    fn from((price, quantity): (Decimal, Decimal)) -> Self {
        Self { price, quantity }
    }
}

impl From<PriceLevel> for (Decimal, Decimal) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.quantity)
    }
}

/// Local order book state for a single trading symbol
///
/// Maintains sorted bid/ask levels using BTreeMap. Updated from depth deltas
/// or replaced wholesale by a full snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    /// Trading pair symbol (uppercase, e.g., "BTCUSDT")
    pub symbol: String,

    /// Bid levels: price → quantity (iterate in reverse for best bid first)
    pub bids: BTreeMap<Decimal, Decimal>,

    /// Ask levels: price → quantity (ascending, best ask first)
    pub asks: BTreeMap<Decimal, Decimal>,

    /// Timestamp of last applied update (milliseconds since Unix epoch)
    pub timestamp: i64,
}

impl OrderBook {
    /// Create a new empty order book for the given symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            ..Default::default()
        }
    }

    /// Get best bid price (highest bid)
    pub fn best_bid(&self) -> Option<&Decimal> {
        self.bids.keys().next_back() // BTreeMap is ascending, so last key is highest
    }

    /// Get best ask price (lowest ask)
    pub fn best_ask(&self) -> Option<&Decimal> {
        self.asks.keys().next()
    }

    /// Update a bid level (remove if quantity is zero)
    pub fn update_bid(&mut self, price: Decimal, quantity: Decimal) {
        if quantity.is_zero() {
            self.bids.remove(&price);
        } else {
            self.bids.insert(price, quantity);
        }
    }

    /// Update an ask level (remove if quantity is zero)
    pub fn update_ask(&mut self, price: Decimal, quantity: Decimal) {
        if quantity.is_zero() {
            self.asks.remove(&price);
        } else {
            self.asks.insert(price, quantity);
        }
    }

    /// Merge an incremental depth update
    pub fn apply_delta(&mut self, timestamp: i64, bids: &[PriceLevel], asks: &[PriceLevel]) {
        for level in bids {
            self.update_bid(level.price, level.quantity);
        }
        for level in asks {
            self.update_ask(level.price, level.quantity);
        }
        self.timestamp = self.timestamp.max(timestamp);
    }

    /// Replace the whole book with the contents of a snapshot
    pub fn reset_from(&mut self, snapshot: &OrderBookSnapshot) {
        self.bids.clear();
        self.asks.clear();
        self.timestamp = snapshot.timestamp;
        for level in &snapshot.bids {
            self.update_bid(level.price, level.quantity);
        }
        for level in &snapshot.asks {
            self.update_ask(level.price, level.quantity);
        }
    }

    /// Drop levels beyond the best `max_levels` on each side
    pub fn trim(&mut self, max_levels: usize) {
        while self.bids.len() > max_levels {
            self.bids.pop_first();
        }
        while self.asks.len() > max_levels {
            self.asks.pop_last();
        }
    }

    /// Take the top `depth` levels of each side, best price first
    pub fn snapshot(&self, depth: usize) -> OrderBookSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, qty)| PriceLevel::new(*price, *qty))
            .collect();

        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, qty)| PriceLevel::new(*price, *qty))
            .collect();

        OrderBookSnapshot::new(self.timestamp, bids, asks)
    }
}
