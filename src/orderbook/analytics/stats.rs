//! Session summary statistics
//!
//! Spread figures cover healthy snapshots only; recovery figures cover closed
//! episodes only (unresolved episodes have no recovery time).

use crate::orderbook::analytics::event_log::{AnomalyLog, EventLog};
use crate::orderbook::analytics::types::{WallKind, WideningTransition};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Aggregate figures for one finished session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionStatistics {
    /// Snapshots handed to the session (including skipped ones)
    pub snapshots_seen: u64,

    /// Snapshots evaluated by both detectors
    pub healthy_snapshots: u64,
    pub crossed_snapshots: u64,
    pub malformed_snapshots: u64,
    pub out_of_order_snapshots: u64,

    /// Snapshots lost to feed buffer overflow
    pub dropped_snapshots: u64,

    #[schemars(with = "Option<String>")]
    pub avg_spread: Option<Decimal>,
    #[schemars(with = "Option<String>")]
    pub min_spread: Option<Decimal>,
    #[schemars(with = "Option<String>")]
    pub max_spread: Option<Decimal>,

    pub closed_episodes: u64,
    pub unresolved_episodes: u64,

    /// Mean recovery of closed episodes (ms)
    pub avg_recovery_ms: Option<f64>,
    /// Longest recovery of closed episodes (ms)
    pub max_recovery_ms: Option<i64>,

    pub abnormal_volume_events: u64,
    pub disappearance_events: u64,

    /// First and last accepted snapshot timestamps (ms)
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

impl SessionStatistics {
    pub fn total_episodes(&self) -> u64 {
        self.closed_episodes + self.unresolved_episodes
    }

    pub fn wall_events(&self) -> u64 {
        self.abnormal_volume_events + self.disappearance_events
    }

    /// Share of seen snapshots that were usable, in percent
    pub fn healthy_ratio(&self) -> Option<f64> {
        (self.snapshots_seen > 0)
            .then(|| self.healthy_snapshots as f64 / self.snapshots_seen as f64 * 100.0)
    }
}

/// Running counters kept while the session consumes snapshots
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsAccumulator {
    snapshots_seen: u64,
    healthy: u64,
    crossed: u64,
    malformed: u64,
    out_of_order: u64,
    spread_sum: Decimal,
    min_spread: Option<Decimal>,
    max_spread: Option<Decimal>,
    first_timestamp: Option<i64>,
    last_timestamp: Option<i64>,
}

impl StatsAccumulator {
    pub(crate) fn record_seen(&mut self) {
        self.snapshots_seen += 1;
    }

    pub(crate) fn record_healthy(&mut self, timestamp: i64, spread: Decimal) {
        self.healthy += 1;
        self.spread_sum += spread;
        self.min_spread = Some(self.min_spread.map_or(spread, |m| m.min(spread)));
        self.max_spread = Some(self.max_spread.map_or(spread, |m| m.max(spread)));
        self.first_timestamp.get_or_insert(timestamp);
        self.last_timestamp = Some(timestamp);
    }

    pub(crate) fn record_crossed(&mut self) {
        self.crossed += 1;
    }

    pub(crate) fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    pub(crate) fn record_out_of_order(&mut self) {
        self.out_of_order += 1;
    }

    pub(crate) fn healthy(&self) -> u64 {
        self.healthy
    }

    /// Combine running counters with the finished logs
    pub(crate) fn finish(&self, events: &EventLog, anomalies: &AnomalyLog) -> SessionStatistics {
        let avg_spread = (self.healthy > 0).then(|| self.spread_sum / Decimal::from(self.healthy));

        let mut closed_episodes = 0u64;
        let mut unresolved_episodes = 0u64;
        let mut recoveries = Vec::new();
        for transition in events.widening_episodes() {
            match transition {
                WideningTransition::Closed(episode) => {
                    closed_episodes += 1;
                    if let Some(ms) = episode.recovery_duration_ms {
                        recoveries.push(ms);
                    }
                }
                WideningTransition::Unresolved(_) => unresolved_episodes += 1,
                WideningTransition::Opened(_) => {}
            }
        }

        let avg_recovery_ms = (!recoveries.is_empty())
            .then(|| recoveries.iter().sum::<i64>() as f64 / recoveries.len() as f64);
        let max_recovery_ms = recoveries.iter().copied().max();

        let (abnormal_volume_events, disappearance_events) =
            events
                .wall_events()
                .fold((0u64, 0u64), |(abnormal, gone), w| match w.kind {
                    WallKind::AbnormalVolume => (abnormal + 1, gone),
                    WallKind::SuddenDisappearance => (abnormal, gone + 1),
                });

        SessionStatistics {
            snapshots_seen: self.snapshots_seen,
            healthy_snapshots: self.healthy,
            crossed_snapshots: self.crossed,
            malformed_snapshots: self.malformed,
            out_of_order_snapshots: self.out_of_order,
            dropped_snapshots: anomalies.dropped_snapshots(),
            avg_spread,
            min_spread: self.min_spread,
            max_spread: self.max_spread,
            closed_episodes,
            unresolved_episodes,
            avg_recovery_ms,
            max_recovery_ms,
            abnormal_volume_events,
            disappearance_events,
            first_timestamp: self.first_timestamp,
            last_timestamp: self.last_timestamp,
        }
    }
}
