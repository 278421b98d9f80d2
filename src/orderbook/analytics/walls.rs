//! Fake wall detection (abnormal volume, sudden disappearance)
//!
//! Detects liquidity anomalies that suggest non-genuine resting interest:
//! - Abnormal volume: level quantity far above its rolling baseline
//!   (z-score `q > mean + k·σ`, or multiplier `q > mean·k`)
//! - Sudden disappearance: a significant level from the previous snapshot is
//!   gone from the current top `D` (matched by price, not index)
//!
//! No detection runs at a level until its baseline holds `W` samples.
//! Abnormal volume also needs the quantity above `min_wall_qty`, so thin
//! levels with a near-zero baseline stay quiet.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::{AbnormalVolumeRule, SessionConfig};
use crate::error::ConfigError;
use crate::orderbook::analytics::{
    baseline::{BaselineArena, BaselineStats},
    types::{WallEvent, WallKind},
};
use crate::orderbook::snapshot::OrderBookSnapshot;
use crate::orderbook::types::{PriceLevel, Side};

/// Top-`D` levels of the last healthy snapshot
#[derive(Debug, Clone, Default)]
struct PreviousLevels {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl PreviousLevels {
    fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }
}

/// Rolling-baseline wall detector for one trading pair
#[derive(Debug, Clone)]
pub struct WallDetector {
    depth: usize,
    k_factor: f64,
    rule: AbnormalVolumeRule,
    min_significant_qty: Decimal,
    min_wall_qty: Decimal,
    baselines: BaselineArena,
    previous: Option<PreviousLevels>,
    last_timestamp: Option<i64>,
}

impl WallDetector {
    /// Build a detector from a validated configuration
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            depth: config.depth,
            k_factor: config.k_factor,
            rule: config.abnormal_rule,
            min_significant_qty: config.min_significant_qty,
            min_wall_qty: config.min_wall_qty,
            baselines: BaselineArena::new(config.depth, config.baseline_window),
            previous: None,
            last_timestamp: None,
        })
    }

    /// Samples currently held by a level's baseline
    pub fn baseline_len(&self, side: Side, level_index: usize) -> usize {
        self.baselines
            .get(side, level_index)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Warmed-up baseline statistics for a level
    pub fn baseline_stats(&self, side: Side, level_index: usize) -> Option<BaselineStats> {
        self.baselines.stats(side, level_index)
    }

    /// Consume one snapshot and return the wall events it triggers
    ///
    /// Crossed, malformed and out-of-order snapshots are ignored entirely:
    /// no detection, no baseline update, previous levels kept.
    pub fn process(&mut self, snapshot: &OrderBookSnapshot) -> Vec<WallEvent> {
        if let Err(anomaly) = snapshot.top_of_book() {
            tracing::debug!(
                timestamp = snapshot.timestamp,
                "Wall detector skipping snapshot: {}",
                anomaly
            );
            return Vec::new();
        }

        if let Some(last) = self.last_timestamp {
            if snapshot.timestamp < last {
                return Vec::new();
            }
        }
        self.last_timestamp = Some(snapshot.timestamp);

        let mut events = Vec::new();

        for side in Side::BOTH {
            let current = snapshot.top_levels(side, self.depth);
            self.detect_abnormal_volume(snapshot.timestamp, side, current, &mut events);
            if let Some(previous) = &self.previous {
                self.detect_disappearances(
                    snapshot.timestamp,
                    side,
                    previous.side(side),
                    current,
                    &mut events,
                );
            }
        }

        // Baselines take the new sample only after it has been judged
        for side in Side::BOTH {
            for (index, level) in snapshot.top_levels(side, self.depth).iter().enumerate() {
                self.baselines
                    .record(side, index, level.quantity.to_f64().unwrap_or(0.0));
            }
        }

        self.previous = Some(PreviousLevels {
            bids: snapshot.top_levels(Side::Bid, self.depth).to_vec(),
            asks: snapshot.top_levels(Side::Ask, self.depth).to_vec(),
        });

        events
    }

    /// Abnormal-volume threshold for a baseline under the configured rule
    fn abnormal_limit(&self, stats: &BaselineStats) -> f64 {
        match self.rule {
            AbnormalVolumeRule::ZScore => stats.mean + self.k_factor * stats.std_dev,
            AbnormalVolumeRule::Multiplier => stats.mean * self.k_factor,
        }
    }

    fn detect_abnormal_volume(
        &self,
        timestamp: i64,
        side: Side,
        current: &[PriceLevel],
        events: &mut Vec<WallEvent>,
    ) {
        for (index, level) in current.iter().enumerate() {
            if level.quantity <= self.min_wall_qty {
                continue;
            }
            // Warm-up not complete: silently deferred
            let Some(stats) = self.baselines.stats(side, index) else {
                continue;
            };
            if stats.mean <= 0.0 {
                continue;
            }

            let quantity = level.quantity.to_f64().unwrap_or(0.0);
            let limit = self.abnormal_limit(&stats);
            if quantity <= limit {
                continue;
            }

            let magnitude = quantity / stats.mean;
            tracing::debug!(
                timestamp,
                side = %side,
                level_index = index,
                price = %level.price,
                quantity,
                baseline_mean = stats.mean,
                baseline_std_dev = stats.std_dev,
                "Abnormal volume detected"
            );

            events.push(WallEvent {
                timestamp,
                side,
                level_index: index,
                price: level.price,
                kind: WallKind::AbnormalVolume,
                magnitude,
                baseline_mean: Some(stats.mean),
            });
        }
    }

    fn detect_disappearances(
        &self,
        timestamp: i64,
        side: Side,
        previous: &[PriceLevel],
        current: &[PriceLevel],
        events: &mut Vec<WallEvent>,
    ) {
        for (index, prior) in previous.iter().enumerate() {
            if prior.quantity <= self.min_significant_qty {
                continue;
            }

            let still_resting = current
                .iter()
                .any(|level| level.price == prior.price && !level.quantity.is_zero());
            if still_resting {
                continue;
            }

            let Some(baseline) = self.baselines.get(side, index) else {
                continue;
            };
            if !baseline.is_warm() {
                continue;
            }

            let previous_quantity = prior.quantity.to_f64().unwrap_or(0.0);
            tracing::debug!(
                timestamp,
                side = %side,
                level_index = index,
                price = %prior.price,
                previous_quantity,
                "Level disappeared"
            );

            events.push(WallEvent {
                timestamp,
                side,
                level_index: index,
                price: prior.price,
                kind: WallKind::SuddenDisappearance,
                magnitude: previous_quantity,
                baseline_mean: baseline.stats().map(|s| s.mean),
            });
        }
    }
}
