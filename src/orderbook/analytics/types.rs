//! Core event types emitted by the detectors
//!
//! This module defines every record the analytics core hands to downstream
//! consumers (event log, report, charting rows).

use crate::orderbook::snapshot::SnapshotAnomaly;
use crate::orderbook::types::Side;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Supporting Enums
// ============================================================================

/// Detector that produced an event
///
/// Ordering is the tie-break used by the event log for events stamped with
/// the same snapshot timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    Spread,
    Wall,
}

/// Fake-wall event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WallKind {
    /// Quantity far above the level's rolling baseline
    AbnormalVolume,

    /// Significant level vanished between two consecutive snapshots
    SuddenDisappearance,
}

impl WallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WallKind::AbnormalVolume => "abnormal_volume",
            WallKind::SuddenDisappearance => "sudden_disappearance",
        }
    }
}

impl fmt::Display for WallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Core Entities
// ============================================================================

/// Spread-widening episode
///
/// Open while `end_time` is `None`. `recovery_duration_ms` is only set once
/// the episode has closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WideningEvent {
    /// Timestamp of the snapshot that opened the episode (ms)
    pub start_time: i64,

    /// Widest spread observed while the episode was open
    #[schemars(with = "String")]
    pub peak_spread: Decimal,

    /// Timestamp at which the peak was first reached (ms)
    pub peak_time: i64,

    /// Timestamp of the latest snapshot evaluated while the episode was open (ms)
    pub last_observed: i64,

    /// Timestamp of the recovering snapshot (ms), `None` while open
    pub end_time: Option<i64>,

    /// `end_time - start_time`, `None` while open
    pub recovery_duration_ms: Option<i64>,
}

impl WideningEvent {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn recovery_duration(&self) -> Option<chrono::Duration> {
        self.recovery_duration_ms.map(chrono::Duration::milliseconds)
    }
}

/// State change reported by the spread monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "phase", content = "episode", rename_all = "snake_case")]
pub enum WideningTransition {
    /// Spread crossed above the threshold on this snapshot
    Opened(WideningEvent),

    /// Spread recovered on this snapshot
    Closed(WideningEvent),

    /// Session ended while the episode was still open
    Unresolved(WideningEvent),
}

impl WideningTransition {
    pub fn event(&self) -> &WideningEvent {
        match self {
            WideningTransition::Opened(e)
            | WideningTransition::Closed(e)
            | WideningTransition::Unresolved(e) => e,
        }
    }

    /// Timestamp of the snapshot (or flush) the transition belongs to
    pub fn timestamp(&self) -> i64 {
        match self {
            WideningTransition::Opened(e) => e.start_time,
            WideningTransition::Closed(e) => e.end_time.unwrap_or(e.start_time),
            WideningTransition::Unresolved(e) => e.last_observed,
        }
    }

    /// True for the record that finalizes an episode
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WideningTransition::Opened(_))
    }

    pub fn phase(&self) -> &'static str {
        match self {
            WideningTransition::Opened(_) => "opened",
            WideningTransition::Closed(_) => "closed",
            WideningTransition::Unresolved(_) => "unresolved",
        }
    }
}

/// Anomalous liquidity ("fake wall") event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WallEvent {
    /// Snapshot timestamp (ms)
    pub timestamp: i64,

    pub side: Side,

    /// Depth index (0 = best level) of the level in the snapshot it was seen in
    pub level_index: usize,

    #[schemars(with = "String")]
    pub price: Decimal,

    pub kind: WallKind,

    /// `quantity / baseline_mean` for abnormal volume, previous quantity for disappearance
    pub magnitude: f64,

    /// Baseline mean at the level when the decision was made
    pub baseline_mean: Option<f64>,
}

/// Any event recorded in the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MarketEvent {
    Widening(WideningTransition),
    Wall(WallEvent),
}

impl MarketEvent {
    pub fn timestamp(&self) -> i64 {
        match self {
            MarketEvent::Widening(t) => t.timestamp(),
            MarketEvent::Wall(w) => w.timestamp,
        }
    }

    pub fn detector(&self) -> DetectorKind {
        match self {
            MarketEvent::Widening(_) => DetectorKind::Spread,
            MarketEvent::Wall(_) => DetectorKind::Wall,
        }
    }

    /// Ordering key used by the event log
    pub fn order_key(&self) -> (i64, DetectorKind) {
        (self.timestamp(), self.detector())
    }
}

impl From<WideningTransition> for MarketEvent {
    fn from(transition: WideningTransition) -> Self {
        MarketEvent::Widening(transition)
    }
}

impl From<WallEvent> for MarketEvent {
    fn from(event: WallEvent) -> Self {
        MarketEvent::Wall(event)
    }
}

/// Entry of the data-quality anomaly channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DataQualityAnomaly {
    /// Timestamp of the offending snapshot (or of the last snapshot before a gap)
    pub timestamp: i64,

    pub anomaly: SnapshotAnomaly,
}
