//! Fixed symmetric range, rebalanced whenever the price leaves it, with a
//! hard cap on rebalances per calendar day.

use std::collections::HashMap;

use tracing::info;

use crate::engine::EngineError;
use crate::range;

use super::{day_key, Executor, RebalancePolicy};

/// Out-of-range rebalancer with a per-day budget. Once the day's budget is
/// spent, out-of-range bars are skipped until the next calendar day.
#[derive(Debug, Clone)]
pub struct SingleThreshold {
    range_pct: f64,
    max_rebalances_per_day: u32,
    day_rebalance_counts: HashMap<(i32, u32), u32>,
}

impl SingleThreshold {
    pub fn new(range_pct: f64, max_rebalances_per_day: u32) -> Result<Self, range::RangeError> {
        if range_pct <= 0.0 {
            return Err(range::RangeError::NonPositiveRange(range_pct));
        }
        Ok(Self {
            range_pct,
            max_rebalances_per_day,
            day_rebalance_counts: HashMap::new(),
        })
    }
}

impl RebalancePolicy for SingleThreshold {
    fn name(&self) -> &'static str {
        "single_threshold"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_symmetric(self.range_pct)?;
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        if !exec.is_out_of_range() {
            return Ok(());
        }

        let timestamp = exec.timestamp();
        let key = day_key(timestamp);
        let count = *self.day_rebalance_counts.entry(key).or_insert(0);
        if count >= self.max_rebalances_per_day {
            info!(
                "({timestamp}) skipping rebalance, reached max rebalances: {}",
                self.max_rebalances_per_day
            );
            return Ok(());
        }

        exec.rebalance_and_open_symmetric(self.range_pct)?;
        self.day_rebalance_counts.insert(key, count + 1);
        Ok(())
    }
}
