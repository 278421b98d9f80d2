// Shared builders for integration tests

use depth_watch::config::SessionConfig;
use depth_watch::orderbook::{OrderBookSnapshot, PriceLevel};
use rust_decimal::Decimal;
use std::str::FromStr;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn levels(pairs: &[(&str, &str)]) -> Vec<PriceLevel> {
    pairs
        .iter()
        .map(|(p, q)| PriceLevel::new(dec(p), dec(q)))
        .collect()
}

pub fn snapshot(timestamp: i64, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> OrderBookSnapshot {
    OrderBookSnapshot::new(timestamp, levels(bids), levels(asks))
}

/// Thresholds of 10 without hysteresis, small warm-up window
pub fn config(window: usize) -> SessionConfig {
    SessionConfig {
        spread_threshold: dec("10"),
        recovery_threshold: dec("10"),
        depth: 10,
        baseline_window: window,
        k_factor: 3.0,
        min_significant_qty: dec("1"),
        ..Default::default()
    }
}

/// One JSON-lines snapshot record
pub fn snapshot_line(timestamp: i64, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    let render = |side: &[(&str, &str)]| {
        side.iter()
            .map(|(p, q)| format!(r#"["{}","{}"]"#, p, q))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        r#"{{"type":"snapshot","timestamp":{},"bids":[{}],"asks":[{}]}}"#,
        timestamp,
        render(bids),
        render(asks)
    )
}
