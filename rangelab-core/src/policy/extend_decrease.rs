//! Volatility-reactive range width: widen when recent movement runs above the
//! daily average, narrow back once it subsides.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::EngineError;
use crate::range::{validate_threshold, RangeError};

use super::{Executor, RebalancePolicy};

/// Widening trigger: max price change over `max_change_hours` compared
/// against the average daily max change over `average_days`, switching to
/// `range_pct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidenConfig {
    pub max_change_hours: f64,
    pub average_days: u32,
    pub range_pct: f64,
}

/// Narrowing trigger: same comparison with its own window parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NarrowConfig {
    pub max_change_hours: f64,
    pub average_days: u32,
}

/// Errors from extend-and-decrease construction.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExtendDecreaseError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("max change window ({hours} h) must be shorter than the averaging window ({days} days)")]
    WindowTooLong { hours: f64, days: u32 },
}

/// The extend-and-decrease policy.
#[derive(Debug, Clone)]
pub struct ExtendAndDecrease {
    initial_range_pct: f64,
    out_of_range_threshold: f64,
    widen: WidenConfig,
    narrow: NarrowConfig,

    initialized: bool,
    range_increased: bool,
}

impl ExtendAndDecrease {
    pub fn new(
        initial_range_pct: f64,
        out_of_range_threshold: f64,
        widen: WidenConfig,
        narrow: NarrowConfig,
    ) -> Result<Self, ExtendDecreaseError> {
        if initial_range_pct <= 0.0 {
            return Err(RangeError::NonPositiveRange(initial_range_pct).into());
        }
        if widen.range_pct <= 0.0 {
            return Err(RangeError::NonPositiveRange(widen.range_pct).into());
        }
        validate_threshold(out_of_range_threshold)?;
        for (hours, days) in [
            (widen.max_change_hours, widen.average_days),
            (narrow.max_change_hours, narrow.average_days),
        ] {
            if hours >= days as f64 * 24.0 {
                return Err(ExtendDecreaseError::WindowTooLong { hours, days });
            }
        }
        Ok(Self {
            initial_range_pct,
            out_of_range_threshold,
            widen,
            narrow,
            initialized: false,
            range_increased: false,
        })
    }

    fn warmup(&self) -> Duration {
        Duration::days(self.widen.average_days.max(self.narrow.average_days) as i64)
    }

    fn maybe_narrow(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let max_change =
            exec.max_price_change_in_past_period(hours(self.narrow.max_change_hours));
        let average_change = exec.average_max_daily_price_change(self.narrow.average_days);
        if max_change < average_change {
            info!(
                "maximum price change ({max_change:.4}) in the last {} h < {average_change:.4} average daily max over {} days, returning to the initial {}% range",
                self.narrow.max_change_hours, self.narrow.average_days, self.initial_range_pct
            );
            exec.rebalance_and_open_symmetric(self.initial_range_pct)?;
            self.range_increased = false;
        }
        Ok(())
    }

    fn maybe_widen(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let max_change =
            exec.max_price_change_in_past_period(hours(self.widen.max_change_hours));
        let average_change = exec.average_max_daily_price_change(self.widen.average_days);
        if max_change > average_change {
            info!(
                "maximum price change ({max_change:.4}) in the last {} h > {average_change:.4} average daily max over {} days, increasing the range to {}%",
                self.widen.max_change_hours, self.widen.average_days, self.widen.range_pct
            );
            exec.rebalance_and_open_symmetric(self.widen.range_pct)?;
            self.range_increased = true;
        }
        Ok(())
    }
}

fn hours(h: f64) -> Duration {
    Duration::minutes((h * 60.0) as i64)
}

impl RebalancePolicy for ExtendAndDecrease {
    fn name(&self) -> &'static str {
        "extend_and_decrease"
    }

    fn initialize(&mut self, _exec: &mut Executor) -> Result<(), EngineError> {
        // First position waits until enough history exists for both averages.
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        if !self.initialized {
            if exec.timestamp() >= exec.start_timestamp() + self.warmup() {
                exec.rebalance_and_open_symmetric(self.initial_range_pct)?;
                self.initialized = true;
            }
            return Ok(());
        }

        let out_of_range = exec
            .ledger
            .first()
            .cloned()
            .map(|p| {
                let price = exec.price();
                price < p.lower_price
                    || price > p.upper_price
                    || exec.position_out_of_range_level(&p) > self.out_of_range_threshold
            })
            .unwrap_or(false);

        if out_of_range {
            let active_range = if self.range_increased {
                self.widen.range_pct
            } else {
                self.initial_range_pct
            };
            exec.rebalance_and_open_symmetric(active_range)?;
        } else if self.range_increased {
            self.maybe_narrow(exec)?;
        } else {
            self.maybe_widen(exec)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widen() -> WidenConfig {
        WidenConfig {
            max_change_hours: 12.0,
            average_days: 3,
            range_pct: 10.0,
        }
    }

    fn narrow() -> NarrowConfig {
        NarrowConfig {
            max_change_hours: 8.0,
            average_days: 3,
        }
    }

    #[test]
    fn rejects_window_longer_than_average() {
        let bad = WidenConfig {
            max_change_hours: 80.0,
            average_days: 3,
            range_pct: 10.0,
        };
        assert_eq!(
            ExtendAndDecrease::new(2.0, 100.0, bad, narrow()).unwrap_err(),
            ExtendDecreaseError::WindowTooLong {
                hours: 80.0,
                days: 3
            }
        );
    }

    #[test]
    fn rejects_bad_threshold_and_ranges() {
        assert!(ExtendAndDecrease::new(0.0, 100.0, widen(), narrow()).is_err());
        assert!(ExtendAndDecrease::new(2.0, 0.0, widen(), narrow()).is_err());
        assert!(ExtendAndDecrease::new(2.0, 100.0, widen(), narrow()).is_ok());
    }

    #[test]
    fn warmup_is_the_longer_average_window() {
        let policy = ExtendAndDecrease::new(2.0, 100.0, widen(), narrow()).unwrap();
        assert_eq!(policy.warmup(), Duration::days(3));
    }
}
