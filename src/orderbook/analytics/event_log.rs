//! Append-only, time-ordered logs of detector output
//!
//! [`EventLog`] holds market events keyed by (snapshot timestamp, detector).
//! [`AnomalyLog`] holds data-quality anomalies in arrival order.

use crate::orderbook::analytics::types::{
    DataQualityAnomaly, DetectorKind, MarketEvent, WallEvent, WideningTransition,
};
use crate::orderbook::snapshot::SnapshotAnomaly;
use serde::{Deserialize, Serialize};

/// Ordered collection of every emitted event of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<MarketEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event
    ///
    /// Inserted after every entry whose (timestamp, detector) key is less
    /// than or equal to its own; events sharing a key keep emission order.
    pub fn append(&mut self, event: impl Into<MarketEvent>) {
        let event = event.into();
        let key = event.order_key();

        let in_order = self
            .events
            .last()
            .map(|last| last.order_key() <= key)
            .unwrap_or(true);

        if in_order {
            self.events.push(event);
        } else {
            let at = self.events.partition_point(|e| e.order_key() <= key);
            tracing::debug!(
                timestamp = key.0,
                position = at,
                len = self.events.len(),
                "Late event inserted into event log"
            );
            self.events.insert(at, event);
        }
    }

    pub fn extend<I, E>(&mut self, events: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<MarketEvent>,
    {
        for event in events {
            self.append(event);
        }
    }

    pub fn all(&self) -> &[MarketEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketEvent> {
        self.events.iter()
    }

    /// Widening transitions (opened, closed, unresolved) in log order
    pub fn widening_transitions(&self) -> impl Iterator<Item = &WideningTransition> {
        self.events.iter().filter_map(|e| match e {
            MarketEvent::Widening(t) => Some(t),
            MarketEvent::Wall(_) => None,
        })
    }

    /// Finalized episodes only (closed or unresolved), one per episode
    pub fn widening_episodes(&self) -> impl Iterator<Item = &WideningTransition> {
        self.widening_transitions().filter(|t| t.is_terminal())
    }

    pub fn wall_events(&self) -> impl Iterator<Item = &WallEvent> {
        self.events.iter().filter_map(|e| match e {
            MarketEvent::Wall(w) => Some(w),
            MarketEvent::Widening(_) => None,
        })
    }

    /// Events produced by one detector
    pub fn by_detector(&self, detector: DetectorKind) -> impl Iterator<Item = &MarketEvent> {
        self.events.iter().filter(move |e| e.detector() == detector)
    }

    /// Events whose timestamp falls in `[from, to]`
    pub fn between(&self, from: i64, to: i64) -> &[MarketEvent] {
        let start = self.events.partition_point(|e| e.timestamp() < from);
        let end = self.events.partition_point(|e| e.timestamp() <= to);
        &self.events[start..end.max(start)]
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a MarketEvent;
    type IntoIter = std::slice::Iter<'a, MarketEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Append-only channel of data-quality anomalies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyLog {
    entries: Vec<DataQualityAnomaly>,
}

impl AnomalyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, timestamp: i64, anomaly: SnapshotAnomaly) {
        self.entries.push(DataQualityAnomaly { timestamp, anomaly });
    }

    pub fn all(&self) -> &[DataQualityAnomaly] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataQualityAnomaly> {
        self.entries.iter()
    }

    /// Number of entries of one anomaly kind (`"crossed_book"`, `"feed_gap"`, ...)
    pub fn count_kind(&self, kind: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.anomaly.kind() == kind)
            .count()
    }

    /// Total snapshots lost to buffer overflow
    pub fn dropped_snapshots(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e.anomaly {
                SnapshotAnomaly::FeedGap { dropped } => dropped,
                _ => 0,
            })
            .sum()
    }
}
