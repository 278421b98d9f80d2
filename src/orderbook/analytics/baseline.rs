//! Rolling quantity baselines per (side, depth level)
//!
//! Each level keeps a fixed-capacity circular buffer of its last `W`
//! observed quantities. Mean and standard deviation come from `statrs`.
//! Memory per session is bounded by `2 × depth × window` samples.

use crate::orderbook::types::Side;
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Summary of a warmed-up baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    pub mean: f64,
    /// Population standard deviation of the window
    pub std_dev: f64,
    pub samples: usize,
}

/// Fixed-capacity circular buffer of quantities for one level
#[derive(Debug, Clone)]
pub struct RollingBaseline {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl RollingBaseline {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a sample, evicting the oldest one once full
    pub fn push(&mut self, quantity: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(quantity);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once the window holds `capacity` samples
    pub fn is_warm(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Statistics over the current window, `None` until warmed up
    pub fn stats(&self) -> Option<BaselineStats> {
        if !self.is_warm() || self.samples.is_empty() {
            return None;
        }

        let mean = self.samples.iter().mean();
        let std_dev = self.samples.iter().population_std_dev();

        if !mean.is_finite() || !std_dev.is_finite() {
            return None;
        }

        Some(BaselineStats {
            mean,
            std_dev,
            samples: self.samples.len(),
        })
    }
}

/// Arena of baselines indexed by (side, level_index)
#[derive(Debug, Clone)]
pub struct BaselineArena {
    depth: usize,
    levels: Vec<RollingBaseline>,
}

impl BaselineArena {
    pub fn new(depth: usize, window: usize) -> Self {
        Self {
            depth,
            levels: (0..depth * Side::BOTH.len())
                .map(|_| RollingBaseline::new(window))
                .collect(),
        }
    }

    fn slot(&self, side: Side, level_index: usize) -> Option<usize> {
        if level_index >= self.depth {
            return None;
        }
        let offset = match side {
            Side::Bid => 0,
            Side::Ask => self.depth,
        };
        Some(offset + level_index)
    }

    pub fn get(&self, side: Side, level_index: usize) -> Option<&RollingBaseline> {
        self.slot(side, level_index).map(|i| &self.levels[i])
    }

    /// Record a quantity; indices beyond the configured depth are ignored
    pub fn record(&mut self, side: Side, level_index: usize, quantity: f64) {
        if let Some(i) = self.slot(side, level_index) {
            self.levels[i].push(quantity);
        }
    }

    /// Warmed-up statistics for a level
    pub fn stats(&self, side: Side, level_index: usize) -> Option<BaselineStats> {
        self.get(side, level_index)?.stats()
    }
}
