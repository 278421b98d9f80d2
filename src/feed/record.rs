//! Feed record decoding and local book maintenance
//!
//! A feed is a sequence of JSON lines. Full snapshots pass through as-is
//! (and reset the local book); deltas are merged into the local book and
//! its top `D` levels become the next snapshot.

use crate::orderbook::snapshot::OrderBookSnapshot;
use crate::orderbook::types::{OrderBook, PriceLevel};
use serde::{Deserialize, Serialize};

/// Incremental depth update; quantity zero removes a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthDelta {
    pub timestamp: i64,

    #[serde(default)]
    pub bids: Vec<PriceLevel>,

    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

/// One line of a JSON-lines feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRecord {
    Snapshot(OrderBookSnapshot),
    Delta(DepthDelta),
}

impl FeedRecord {
    pub fn timestamp(&self) -> i64 {
        match self {
            FeedRecord::Snapshot(s) => s.timestamp,
            FeedRecord::Delta(d) => d.timestamp,
        }
    }

    /// Decode one line
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim())
    }
}

/// Levels kept per side of the local book when `depth` is smaller
pub const LOCAL_BOOK_LEVELS: usize = 200;

/// Turns feed records into snapshots of at most `depth` levels per side
///
/// The local book keeps `max(depth, LOCAL_BOOK_LEVELS)` levels per side so a
/// long delta stream cannot grow it without bound.
#[derive(Debug, Clone)]
pub struct BookBuilder {
    book: OrderBook,
    depth: usize,
}

impl BookBuilder {
    pub fn new(symbol: impl Into<String>, depth: usize) -> Self {
        Self {
            book: OrderBook::new(symbol),
            depth,
        }
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    fn max_levels(&self) -> usize {
        self.depth.max(LOCAL_BOOK_LEVELS)
    }

    /// Apply a record and return the resulting snapshot
    ///
    /// Snapshot records are forwarded unchanged apart from depth truncation,
    /// so crossed or malformed source data still reaches the detectors.
    pub fn apply(&mut self, record: FeedRecord) -> OrderBookSnapshot {
        match record {
            FeedRecord::Snapshot(mut snapshot) => {
                self.book.reset_from(&snapshot);
                self.book.trim(self.max_levels());
                snapshot.bids.truncate(self.depth);
                snapshot.asks.truncate(self.depth);
                snapshot
            }
            FeedRecord::Delta(delta) => {
                self.book
                    .apply_delta(delta.timestamp, &delta.bids, &delta.asks);
                self.book.trim(self.max_levels());
                // Stamp with the delta itself so a late delta stays detectable
                let mut snapshot = self.book.snapshot(self.depth);
                snapshot.timestamp = delta.timestamp;
                snapshot
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_decode_snapshot_and_delta_lines() {
        let snapshot = FeedRecord::from_line(
            r#"{"type":"snapshot","timestamp":1000,"bids":[["100","1"]],"asks":[["101","2"]]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.timestamp(), 1000);
        assert!(matches!(snapshot, FeedRecord::Snapshot(_)));

        let delta =
            FeedRecord::from_line(r#"  {"type":"delta","timestamp":2000,"asks":[[101, 0]]}  "#)
                .unwrap();
        let FeedRecord::Delta(delta) = delta else {
            panic!("expected delta");
        };
        assert!(delta.bids.is_empty());
        assert_eq!(delta.asks[0].quantity, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(FeedRecord::from_line(r#"{"type":"trade","timestamp":1}"#).is_err());
        assert!(FeedRecord::from_line("not json").is_err());
    }

    #[test]
    fn test_builder_merges_deltas() {
        let mut builder = BookBuilder::new("btcusdt", 2);
        let first = builder.apply(FeedRecord::Snapshot(OrderBookSnapshot::new(
            1_000,
            vec![
                PriceLevel::new(dec("100"), dec("1")),
                PriceLevel::new(dec("99"), dec("1")),
                PriceLevel::new(dec("98"), dec("1")),
            ],
            vec![PriceLevel::new(dec("101"), dec("1"))],
        )));
        assert_eq!(first.bids.len(), 2);

        let next = builder.apply(FeedRecord::Delta(DepthDelta {
            timestamp: 2_000,
            bids: vec![PriceLevel::new(dec("100"), dec("0"))],
            asks: vec![PriceLevel::new(dec("100.5"), dec("3"))],
        }));

        assert_eq!(next.timestamp, 2_000);
        assert_eq!(
            next.bids,
            vec![
                PriceLevel::new(dec("99"), dec("1")),
                PriceLevel::new(dec("98"), dec("1")),
            ]
        );
        assert_eq!(next.asks[0].price, dec("100.5"));
        assert_eq!(builder.book().symbol, "BTCUSDT");
    }

    #[test]
    fn test_local_book_stays_bounded() {
        let mut builder = BookBuilder::new("BTCUSDT", 5);
        for i in 0..1_000i64 {
            let snapshot = builder.apply(FeedRecord::Delta(DepthDelta {
                timestamp: i,
                bids: vec![PriceLevel::new(Decimal::from(10_000 - i), dec("1"))],
                asks: vec![PriceLevel::new(Decimal::from(20_000 + i), dec("1"))],
            }));
            assert_eq!(snapshot.bids[0].price, Decimal::from(10_000));
        }

        let book = builder.book();
        assert_eq!(book.bids.len(), LOCAL_BOOK_LEVELS);
        assert_eq!(book.asks.len(), LOCAL_BOOK_LEVELS);
        assert_eq!(book.best_ask(), Some(&Decimal::from(20_000)));

        let mut deep = BookBuilder::new("BTCUSDT", 300);
        for i in 0..400i64 {
            deep.apply(FeedRecord::Delta(DepthDelta {
                timestamp: i,
                bids: vec![PriceLevel::new(Decimal::from(10_000 - i), dec("1"))],
                asks: vec![],
            }));
        }
        assert_eq!(deep.book().bids.len(), 300);
    }

    #[test]
    fn test_crossed_snapshot_passes_through() {
        let mut builder = BookBuilder::new("BTCUSDT", 5);
        let crossed = OrderBookSnapshot::new(
            1,
            vec![PriceLevel::new(dec("50010"), dec("1"))],
            vec![PriceLevel::new(dec("50005"), dec("1"))],
        );
        assert_eq!(builder.apply(FeedRecord::Snapshot(crossed.clone())), crossed);
    }
}
