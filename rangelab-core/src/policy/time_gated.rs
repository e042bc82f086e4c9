//! Laddered ranges with a minimum elapsed time between rebalances.
//!
//! The cooldown overrides the ladder entirely: while it is running, the bar
//! is skipped before any tier logic is consulted.

use chrono::Duration;

use crate::engine::EngineError;

use super::ladder::{LadderError, LadderState};
use super::{Executor, RebalancePolicy};

/// Ladder plus a fixed cooldown measured from the last successful open.
#[derive(Debug, Clone)]
pub struct TimeGated {
    state: LadderState,
    min_between_rebalances: Duration,
}

impl TimeGated {
    pub fn new(
        ranges: Vec<f64>,
        max_rebalances: Vec<u32>,
        min_minutes_between_rebalances: u32,
    ) -> Result<Self, LadderError> {
        Ok(Self {
            state: LadderState::new(ranges, max_rebalances)?,
            min_between_rebalances: Duration::minutes(min_minutes_between_rebalances as i64),
        })
    }

    fn cooldown_elapsed(&self, exec: &Executor) -> bool {
        match exec.last_open() {
            Some(event) => exec.timestamp() - event.timestamp >= self.min_between_rebalances,
            None => true,
        }
    }
}

impl RebalancePolicy for TimeGated {
    fn name(&self) -> &'static str {
        "time_gated"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_symmetric(self.state.narrowest_range())?;
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        if !self.cooldown_elapsed(exec) {
            return Ok(());
        }
        self.state.step(exec)
    }
}
