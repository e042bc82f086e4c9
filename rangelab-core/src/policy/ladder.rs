//! Laddered ranges: a list of (range, per-day rebalance budget) tiers.
//!
//! Each out-of-range event consumes one unit of the day's budget; the tier in
//! effect is found by walking the cumulative budgets, so narrower tiers burn
//! out first and rebalances escalate to wider ranges as the day wears on. A
//! widest-tier position that survives a full day triggers a forced reset back
//! to the narrowest tier.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use crate::engine::EngineError;
use crate::range::RangeError;

use super::{day_key, Executor, RebalancePolicy};

/// Errors from ladder construction, shared by every ladder-based policy.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LadderError {
    #[error("ranges and max_rebalances must have the same length ({ranges} vs {caps})")]
    MismatchedLengths { ranges: usize, caps: usize },
    #[error("ladder needs at least one tier")]
    Empty,
    #[error(transparent)]
    Range(#[from] RangeError),
}

/// The reusable ladder state machine. `Ladder` wraps it directly; the
/// time-gated and HODL variants compose it with their own gates.
#[derive(Debug, Clone)]
pub struct LadderState {
    ranges: Vec<f64>,
    max_rebalances: Vec<u32>,
    day_rebalance_counts: HashMap<(i32, u32), u32>,
    widest_active_since: Option<NaiveDateTime>,
}

impl LadderState {
    pub fn new(ranges: Vec<f64>, max_rebalances: Vec<u32>) -> Result<Self, LadderError> {
        if ranges.len() != max_rebalances.len() {
            return Err(LadderError::MismatchedLengths {
                ranges: ranges.len(),
                caps: max_rebalances.len(),
            });
        }
        if ranges.is_empty() {
            return Err(LadderError::Empty);
        }
        for &range in &ranges {
            if range <= 0.0 {
                return Err(RangeError::NonPositiveRange(range).into());
            }
        }
        Ok(Self {
            ranges,
            max_rebalances,
            day_rebalance_counts: HashMap::new(),
            widest_active_since: None,
        })
    }

    pub fn narrowest_range(&self) -> f64 {
        self.ranges[0]
    }

    /// One bar of ladder logic: widest-tier timeout first, then the
    /// out-of-range tier walk.
    pub fn step(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let now = exec.timestamp();

        if let Some(since) = self.widest_active_since {
            if now - since >= Duration::days(1) {
                info!(
                    "({now}) rebalancing and resetting rebalances count because widest range is active since {since}"
                );
                exec.rebalance_and_open_symmetric(self.ranges[0])?;
                self.day_rebalance_counts.insert(day_key(now), 0);
                self.widest_active_since = None;
                return Ok(());
            }
        }

        if exec.is_out_of_range() {
            self.on_rebalance_needed(exec, now)?;
        }
        Ok(())
    }

    fn on_rebalance_needed(
        &mut self,
        exec: &mut Executor,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        let key = day_key(now);
        let count = *self.day_rebalance_counts.entry(key).or_insert(0);

        let mut cumulative = 0u32;
        let mut chosen = None;
        for (i, &range) in self.ranges.iter().enumerate() {
            cumulative += self.max_rebalances[i];
            if count < cumulative {
                chosen = Some(range);
                break;
            }
        }

        let Some(range) = chosen else {
            info!("({now}) skipping rebalance because reached max rebalances count for widest range");
            return Ok(());
        };

        exec.rebalance_and_open_symmetric(range)?;

        if range == *self.ranges.last().expect("ladder is non-empty") {
            self.widest_active_since = Some(now);
        } else {
            self.widest_active_since = None;
        }
        self.day_rebalance_counts.insert(key, count + 1);
        info!(
            "({now}) rebalance count for current day: {}",
            self.day_rebalance_counts[&key]
        );
        Ok(())
    }

    /// Forget the widest-tier timer (used when leaving HODL mode).
    pub fn clear(&mut self) {
        self.widest_active_since = None;
    }
}

/// The plain laddered policy.
#[derive(Debug, Clone)]
pub struct Ladder {
    state: LadderState,
}

impl Ladder {
    pub fn new(ranges: Vec<f64>, max_rebalances: Vec<u32>) -> Result<Self, LadderError> {
        Ok(Self {
            state: LadderState::new(ranges, max_rebalances)?,
        })
    }
}

impl RebalancePolicy for Ladder {
    fn name(&self) -> &'static str {
        "ladder"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_symmetric(self.state.narrowest_range())?;
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        self.state.step(exec)
    }
}
