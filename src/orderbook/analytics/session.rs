//! Analysis session for one trading pair
//!
//! Owns both detectors, the event log and the anomaly channel. Each snapshot
//! is classified once, then either handed to both detectors or skipped by
//! both. Detection is a pure function of the ordered snapshots and the
//! configuration; the session id only labels logs and reports.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::orderbook::analytics::{
    event_log::{AnomalyLog, EventLog},
    spread::SpreadMonitor,
    stats::{SessionStatistics, StatsAccumulator},
    types::{MarketEvent, WideningTransition},
    walls::WallDetector,
};
use crate::orderbook::snapshot::{OrderBookSnapshot, SnapshotAnomaly};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of feeding one snapshot to the session
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Evaluated by both detectors; carries the events it produced
    Accepted { events: Vec<MarketEvent> },

    /// Skipped by both detectors and recorded in the anomaly channel
    Skipped(SnapshotAnomaly),
}

impl ProcessOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProcessOutcome::Accepted { .. })
    }

    pub fn events(&self) -> &[MarketEvent] {
        match self {
            ProcessOutcome::Accepted { events } => events,
            ProcessOutcome::Skipped(_) => &[],
        }
    }
}

/// Everything a finished session produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutput {
    pub session_id: Uuid,
    pub config: SessionConfig,
    pub events: EventLog,
    pub anomalies: AnomalyLog,
    pub statistics: SessionStatistics,
}

/// Snapshot-driven analysis of one pair
#[derive(Debug)]
pub struct AnalysisSession {
    id: Uuid,
    config: SessionConfig,
    spread_monitor: SpreadMonitor,
    wall_detector: WallDetector,
    events: EventLog,
    anomalies: AnomalyLog,
    stats: StatsAccumulator,
    last_timestamp: Option<i64>,
}

impl AnalysisSession {
    /// Create a session; rejects invalid configuration
    pub fn new(config: SessionConfig) -> Result<Self> {
        let spread_monitor = SpreadMonitor::new(&config)?;
        let wall_detector = WallDetector::new(&config)?;
        let id = Uuid::new_v4();

        tracing::info!(
            session_id = %id,
            spread_threshold = %config.spread_threshold,
            recovery_threshold = %config.recovery_threshold,
            depth = config.depth,
            baseline_window = config.baseline_window,
            k_factor = config.k_factor,
            abnormal_rule = %config.abnormal_rule,
            "Analysis session started"
        );

        Ok(Self {
            id,
            config,
            spread_monitor,
            wall_detector,
            events: EventLog::new(),
            anomalies: AnomalyLog::new(),
            stats: StatsAccumulator::default(),
            last_timestamp: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn anomalies(&self) -> &AnomalyLog {
        &self.anomalies
    }

    pub fn spread_monitor(&self) -> &SpreadMonitor {
        &self.spread_monitor
    }

    pub fn wall_detector(&self) -> &WallDetector {
        &self.wall_detector
    }

    /// Consume one snapshot to completion
    pub fn process(&mut self, snapshot: &OrderBookSnapshot) -> ProcessOutcome {
        self.stats.record_seen();

        if let Some(last) = self.last_timestamp {
            if snapshot.timestamp < last {
                tracing::warn!(
                    session_id = %self.id,
                    timestamp = snapshot.timestamp,
                    last_timestamp = last,
                    "Out-of-order snapshot skipped"
                );
                self.stats.record_out_of_order();
                return self.skip(
                    snapshot.timestamp,
                    SnapshotAnomaly::OutOfOrder {
                        last_timestamp: last,
                    },
                );
            }
        }

        let top = match snapshot.top_of_book() {
            Ok(top) => top,
            Err(anomaly) => {
                match &anomaly {
                    SnapshotAnomaly::CrossedBook { best_bid, best_ask } => {
                        tracing::warn!(
                            session_id = %self.id,
                            timestamp = snapshot.timestamp,
                            best_bid = %best_bid,
                            best_ask = %best_ask,
                            "Crossed book snapshot skipped"
                        );
                        self.stats.record_crossed();
                    }
                    other => {
                        tracing::warn!(
                            session_id = %self.id,
                            timestamp = snapshot.timestamp,
                            "Malformed snapshot skipped: {}",
                            other
                        );
                        self.stats.record_malformed();
                    }
                }
                return self.skip(snapshot.timestamp, anomaly);
            }
        };

        self.last_timestamp = Some(snapshot.timestamp);
        self.stats.record_healthy(snapshot.timestamp, top.spread);

        // Spread first: the log orders same-timestamp events Spread < Wall
        let mut events: Vec<MarketEvent> = self
            .spread_monitor
            .process(snapshot)
            .into_iter()
            .map(MarketEvent::from)
            .collect();
        events.extend(
            self.wall_detector
                .process(snapshot)
                .into_iter()
                .map(MarketEvent::from),
        );

        self.events.extend(events.iter().cloned());

        ProcessOutcome::Accepted { events }
    }

    /// Record snapshots lost upstream (buffer overflow)
    ///
    /// Detector state is untouched; the gap is stamped with the timestamp of
    /// the last snapshot seen before it.
    pub fn record_gap(&mut self, dropped: u64, after_timestamp: i64) {
        if dropped == 0 {
            return;
        }
        tracing::warn!(
            session_id = %self.id,
            dropped,
            after_timestamp,
            "Feed gap recorded"
        );
        self.anomalies
            .append(after_timestamp, SnapshotAnomaly::FeedGap { dropped });
    }

    /// Timestamp of the last accepted snapshot
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Close an open widening episode as unresolved and log it
    ///
    /// Returns the flushed transition. Calling it again is a no-op.
    pub fn flush(&mut self) -> Option<WideningTransition> {
        let unresolved = self.spread_monitor.finish()?;
        self.events.append(unresolved.clone());
        Some(unresolved)
    }

    /// End the session, flushing an open widening episode as unresolved
    pub fn finish(mut self) -> SessionOutput {
        self.flush();

        let statistics = self.stats.finish(&self.events, &self.anomalies);

        tracing::info!(
            session_id = %self.id,
            snapshots = statistics.snapshots_seen,
            healthy = self.stats.healthy(),
            episodes = statistics.total_episodes(),
            wall_events = statistics.wall_events(),
            anomalies = self.anomalies.len(),
            "Analysis session finished"
        );

        SessionOutput {
            session_id: self.id,
            config: self.config,
            events: self.events,
            anomalies: self.anomalies,
            statistics,
        }
    }

    fn skip(&mut self, timestamp: i64, anomaly: SnapshotAnomaly) -> ProcessOutcome {
        self.anomalies.append(timestamp, anomaly.clone());
        ProcessOutcome::Skipped(anomaly)
    }
}
