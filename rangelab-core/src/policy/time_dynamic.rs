//! Symmetric ranges whose width is derived from recent daily price movement,
//! recomputed on every out-of-range event, with a simple HODL sub-state for
//! violent markets.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::EngineError;
use crate::range::RangeError;

use super::{Executor, RebalancePolicy};

/// How the dynamic width is derived from the last N days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeMode {
    /// Max price change over the whole N-day window.
    Max,
    /// Mean of each day's max change.
    Average,
}

/// HODL tuning for the time-dynamic policy. Durations in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeDynamicHodlConfig {
    /// Entering: price moved more than this percent inside the window below.
    pub max_price_change_pct: f64,
    pub price_movement_window_hours: f64,
    /// Exiting: movement over the return window at or below this percent.
    pub return_price_pct: f64,
    pub return_duration_hours: f64,
}

/// The time-dynamic-ranges policy.
#[derive(Debug, Clone)]
pub struct TimeDynamic {
    mode: RangeMode,
    last_days: u32,
    hodl: TimeDynamicHodlConfig,

    enough_data: bool,
    hodl_since: Option<NaiveDateTime>,
}

fn hours(h: f64) -> Duration {
    Duration::minutes((h * 60.0) as i64)
}

impl TimeDynamic {
    pub fn new(
        mode: RangeMode,
        last_days: u32,
        hodl: TimeDynamicHodlConfig,
    ) -> Result<Self, RangeError> {
        if last_days == 0 {
            return Err(RangeError::NonPositiveRange(0.0));
        }
        if hodl.return_duration_hours <= 0.0 {
            return Err(RangeError::NonPositiveRange(hodl.return_duration_hours));
        }
        Ok(Self {
            mode,
            last_days,
            hodl,
            enough_data: false,
            hodl_since: None,
        })
    }

    fn has_enough_data(&mut self, exec: &Executor) -> bool {
        if self.enough_data {
            return true;
        }
        let elapsed = exec.timestamp() - exec.start_timestamp();
        self.enough_data = elapsed >= Duration::days(self.last_days as i64);
        self.enough_data
    }

    fn dynamic_range_pct(&self, exec: &Executor) -> f64 {
        match self.mode {
            RangeMode::Max => {
                exec.max_price_change_in_past_period(Duration::days(self.last_days as i64))
            }
            RangeMode::Average => exec.average_max_daily_price_change(self.last_days),
        }
    }

    fn reinvest(&self, exec: &mut Executor) -> Result<(), EngineError> {
        let range_pct = self.dynamic_range_pct(exec);
        if range_pct <= 0.0 {
            // Dead-flat history yields a zero-width range; nothing to open.
            debug!(
                "({}) computed dynamic range is zero, skipping investment",
                exec.timestamp()
            );
            return Ok(());
        }
        exec.rebalance_and_open_symmetric(range_pct)?;
        Ok(())
    }

    fn should_enter_hodl(&self, exec: &Executor) -> bool {
        let change =
            exec.max_price_change_in_past_period(hours(self.hodl.price_movement_window_hours));
        if change > self.hodl.max_price_change_pct {
            info!(
                "({}) price change in last {} h: {change:.2}% > {:.2}%, going into HODL",
                exec.timestamp(),
                self.hodl.price_movement_window_hours,
                self.hodl.max_price_change_pct
            );
            return true;
        }
        false
    }

    fn should_exit_hodl(&self, exec: &Executor, since: NaiveDateTime) -> bool {
        let now = exec.timestamp();
        if now - since < hours(self.hodl.return_duration_hours) {
            return false;
        }
        let change = exec.max_price_change_in_past_period(hours(self.hodl.return_duration_hours));
        if change <= self.hodl.return_price_pct {
            info!(
                "({now}) price change during last {} h {change:.2}% is below {:.2}%, exiting HODL",
                self.hodl.return_duration_hours, self.hodl.return_price_pct
            );
            true
        } else {
            debug!(
                "({now}) price change during last {} h {change:.2}% still above {:.2}%, staying in HODL",
                self.hodl.return_duration_hours, self.hodl.return_price_pct
            );
            false
        }
    }
}

impl RebalancePolicy for TimeDynamic {
    fn name(&self) -> &'static str {
        "time_dynamic"
    }

    fn initialize(&mut self, _exec: &mut Executor) -> Result<(), EngineError> {
        // Invests on the first eligible bar instead; the dynamic width needs
        // history the first bar does not have.
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        if !self.has_enough_data(exec) {
            return Ok(());
        }

        if let Some(since) = self.hodl_since {
            if self.should_exit_hodl(exec, since) {
                self.hodl_since = None;
                self.reinvest(exec)?;
            }
            return Ok(());
        }

        if self.should_enter_hodl(exec) {
            self.hodl_since = Some(exec.timestamp());
            exec.close_all()?;
            exec.clear_range();
            return Ok(());
        }

        if exec.ledger.is_empty() || exec.is_out_of_range() {
            self.reinvest(exec)?;
        }
        Ok(())
    }
}
