//! Spread-widening detection with hysteresis
//!
//! Two-state machine over healthy spread samples:
//! - Normal → Widening when spread > `spread_threshold`
//! - Widening → Normal when spread <= `recovery_threshold`
//!
//! Crossed and malformed snapshots never reach the state machine.

use crate::config::SessionConfig;
use crate::error::ConfigError;
use crate::orderbook::analytics::types::{WideningEvent, WideningTransition};
use crate::orderbook::snapshot::OrderBookSnapshot;
use rust_decimal::Decimal;

/// Spread monitor state; at most one episode can be open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadState {
    Normal,
    Widening {
        start_time: i64,
        peak_spread: Decimal,
        peak_time: i64,
        last_observed: i64,
    },
}

impl SpreadState {
    fn open_event(&self) -> Option<WideningEvent> {
        match *self {
            SpreadState::Normal => None,
            SpreadState::Widening {
                start_time,
                peak_spread,
                peak_time,
                last_observed,
            } => Some(WideningEvent {
                start_time,
                peak_spread,
                peak_time,
                last_observed,
                end_time: None,
                recovery_duration_ms: None,
            }),
        }
    }
}

/// Tracks spread over a snapshot sequence and reports widening episodes
#[derive(Debug, Clone)]
pub struct SpreadMonitor {
    spread_threshold: Decimal,
    recovery_threshold: Decimal,
    state: SpreadState,
    last_timestamp: Option<i64>,
}

impl SpreadMonitor {
    /// Build a monitor from a validated configuration
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            spread_threshold: config.spread_threshold,
            recovery_threshold: config.recovery_threshold,
            state: SpreadState::Normal,
            last_timestamp: None,
        })
    }

    pub fn state(&self) -> &SpreadState {
        &self.state
    }

    pub fn is_widening(&self) -> bool {
        matches!(self.state, SpreadState::Widening { .. })
    }

    /// Currently open episode, if any
    pub fn open_episode(&self) -> Option<WideningEvent> {
        self.state.open_event()
    }

    /// Consume one snapshot
    ///
    /// Returns the transitions it caused (zero or one). Crossed, malformed
    /// and out-of-order snapshots leave the monitor untouched.
    pub fn process(&mut self, snapshot: &OrderBookSnapshot) -> Vec<WideningTransition> {
        let top = match snapshot.top_of_book() {
            Ok(top) => top,
            Err(anomaly) => {
                tracing::debug!(
                    timestamp = snapshot.timestamp,
                    "Spread monitor skipping snapshot: {}",
                    anomaly
                );
                return Vec::new();
            }
        };

        if let Some(last) = self.last_timestamp {
            if snapshot.timestamp < last {
                tracing::debug!(
                    timestamp = snapshot.timestamp,
                    last_timestamp = last,
                    "Spread monitor skipping out-of-order snapshot"
                );
                return Vec::new();
            }
        }
        self.last_timestamp = Some(snapshot.timestamp);

        self.step(snapshot.timestamp, top.spread).into_iter().collect()
    }

    /// Flush an open episode at session end
    ///
    /// The episode is reported as `Unresolved` (no end time, no recovery
    /// duration) and the monitor returns to Normal.
    pub fn finish(&mut self) -> Option<WideningTransition> {
        let open = self.state.open_event()?;
        self.state = SpreadState::Normal;

        tracing::info!(
            start_time = open.start_time,
            peak_spread = %open.peak_spread,
            "Session ended with unresolved spread widening"
        );

        Some(WideningTransition::Unresolved(open))
    }

    fn step(&mut self, timestamp: i64, spread: Decimal) -> Option<WideningTransition> {
        match &mut self.state {
            SpreadState::Normal => {
                if spread <= self.spread_threshold {
                    return None;
                }

                self.state = SpreadState::Widening {
                    start_time: timestamp,
                    peak_spread: spread,
                    peak_time: timestamp,
                    last_observed: timestamp,
                };

                tracing::warn!(
                    timestamp,
                    spread = %spread,
                    threshold = %self.spread_threshold,
                    "Spread alert: widening opened"
                );

                self.state.open_event().map(WideningTransition::Opened)
            }
            SpreadState::Widening {
                start_time,
                peak_spread,
                peak_time,
                last_observed,
            } => {
                if spread > self.recovery_threshold {
                    if spread > self.spread_threshold {
                        tracing::debug!(
                            timestamp,
                            spread = %spread,
                            "Spread still above threshold"
                        );
                    }
                    if spread > *peak_spread {
                        *peak_spread = spread;
                        *peak_time = timestamp;
                    }
                    *last_observed = timestamp;
                    return None;
                }

                let recovery_duration_ms = (timestamp - *start_time).max(0);
                let closed = WideningEvent {
                    start_time: *start_time,
                    peak_spread: *peak_spread,
                    peak_time: *peak_time,
                    last_observed: timestamp,
                    end_time: Some(timestamp),
                    recovery_duration_ms: Some(recovery_duration_ms),
                };
                self.state = SpreadState::Normal;

                tracing::info!(
                    start_time = closed.start_time,
                    end_time = timestamp,
                    peak_spread = %closed.peak_spread,
                    recovery_ms = recovery_duration_ms,
                    "Spread widening recovered"
                );

                Some(WideningTransition::Closed(closed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderbook::types::PriceLevel;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn monitor(threshold: &str, recovery: &str) -> SpreadMonitor {
        SpreadMonitor::new(&SessionConfig {
            spread_threshold: dec(threshold),
            recovery_threshold: dec(recovery),
            ..Default::default()
        })
        .unwrap()
    }

    /// Snapshot with best bid 50000 and the given spread
    fn with_spread(timestamp: i64, spread: i64) -> OrderBookSnapshot {
        let bid = Decimal::from(50_000);
        OrderBookSnapshot::new(
            timestamp,
            vec![PriceLevel::new(bid, Decimal::ONE)],
            vec![PriceLevel::new(bid + Decimal::from(spread), Decimal::ONE)],
        )
    }

    fn run(monitor: &mut SpreadMonitor, spreads: &[i64]) -> Vec<WideningTransition> {
        spreads
            .iter()
            .enumerate()
            .flat_map(|(i, s)| monitor.process(&with_spread(i as i64 * 1_000, *s)))
            .collect()
    }

    #[test]
    fn test_widening_episode_open_peak_close() {
        let mut monitor = monitor("10", "10");
        let transitions = run(&mut monitor, &[1, 1, 1, 12, 15, 9, 1, 1]);

        assert_eq!(transitions.len(), 2);
        let WideningTransition::Opened(opened) = &transitions[0] else {
            panic!("expected opened, got {:?}", transitions[0]);
        };
        assert_eq!(opened.start_time, 3_000);
        assert_eq!(opened.peak_spread, Decimal::from(12));

        let WideningTransition::Closed(closed) = &transitions[1] else {
            panic!("expected closed, got {:?}", transitions[1]);
        };
        assert_eq!(closed.start_time, 3_000);
        assert_eq!(closed.peak_spread, Decimal::from(15));
        assert_eq!(closed.peak_time, 4_000);
        assert_eq!(closed.end_time, Some(5_000));
        assert_eq!(closed.recovery_duration_ms, Some(2_000));
        assert!(!monitor.is_widening());
    }

    #[test]
    fn test_spread_equal_to_threshold_does_not_open() {
        let mut monitor = monitor("10", "10");
        assert!(run(&mut monitor, &[10, 10, 10]).is_empty());
    }

    #[test]
    fn test_hysteresis_prevents_chattering() {
        let mut monitor = monitor("10", "5");
        // Oscillates around the opening threshold but never drops to 5
        let transitions = run(&mut monitor, &[11, 9, 11, 8, 12, 6, 5]);

        assert_eq!(transitions.len(), 2);
        assert!(matches!(transitions[0], WideningTransition::Opened(_)));
        let closed = transitions[1].event();
        assert_eq!(closed.peak_spread, Decimal::from(12));
        assert_eq!(closed.end_time, Some(6_000));
    }

    #[test]
    fn test_crossed_book_does_not_change_state() {
        let mut monitor = monitor("10", "10");
        let crossed = with_spread(0, -5);
        assert!(monitor.process(&crossed).is_empty());
        assert_eq!(monitor.state(), &SpreadState::Normal);

        monitor.process(&with_spread(1_000, 20));
        let before = monitor.state().clone();
        assert!(monitor.process(&with_spread(2_000, -5)).is_empty());
        assert_eq!(monitor.state(), &before);
    }

    #[test]
    fn test_malformed_snapshot_is_ignored() {
        let mut monitor = monitor("10", "10");
        monitor.process(&with_spread(0, 20));
        let no_asks = OrderBookSnapshot::new(
            1_000,
            vec![PriceLevel::new(Decimal::from(50_000), Decimal::ONE)],
            vec![],
        );
        assert!(monitor.process(&no_asks).is_empty());
        assert!(monitor.is_widening());
    }

    #[test]
    fn test_finish_flushes_open_episode() {
        let mut monitor = monitor("10", "10");
        monitor.process(&with_spread(0, 12));
        monitor.process(&with_spread(10_000, 20));
        monitor.process(&with_spread(30_000, 18));

        let flushed = monitor.finish().unwrap();
        let WideningTransition::Unresolved(event) = flushed else {
            panic!("expected unresolved");
        };
        assert_eq!(event.peak_spread, Decimal::from(20));
        assert_eq!(event.end_time, None);
        assert_eq!(event.recovery_duration_ms, None);
        assert_eq!(event.last_observed, 30_000);
        assert!(monitor.finish().is_none());
    }

    /// Collects formatted log output in memory
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_opening_episode_logs_warning() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut monitor = monitor("10", "10");
            run(&mut monitor, &[1, 12, 15]);
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Spread alert").count(), 1);
        assert!(output.contains("WARN"));
        assert!(output.contains("spread=12"));
    }

    #[test]
    fn test_out_of_order_snapshot_is_ignored() {
        let mut monitor = monitor("10", "10");
        monitor.process(&with_spread(5_000, 12));
        assert!(monitor.process(&with_spread(4_000, 1)).is_empty());
        assert!(monitor.is_widening());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SpreadMonitor::new(&SessionConfig {
            spread_threshold: dec("5"),
            recovery_threshold: dec("7"),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
