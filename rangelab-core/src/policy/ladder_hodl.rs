//! Laddered ranges with a HODL escape hatch.
//!
//! On top of the ladder, a second state machine pulls capital out of the pool
//! when the market turns violent — a large price move inside a look-back
//! window combined with repeated same-direction rebalances — and only returns
//! once a minimum parking duration has passed and the trailing price movement
//! has calmed below a threshold.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::EngineError;
use crate::range::{validate_threshold, RangeError};
use crate::series::PricePoint;

use super::ladder::{LadderError, LadderState};
use super::{Executor, RebalanceDirection, RebalancePolicy};

/// HODL entry/exit tuning. Durations are in hours to match how the strategy
/// is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HodlConfig {
    /// Same-direction rebalance count that (with the window below) arms the
    /// entry condition; `None` disables the count check.
    pub max_rebalances_count: Option<u32>,
    pub max_rebalances_window_hours: Option<f64>,
    /// Price move (percent) inside the look-back window that arms entry.
    pub max_price_change_pct: f64,
    pub price_movement_window_hours: f64,
    /// Trailing movement (percent) below which HODL is exited.
    pub return_price_pct: f64,
    /// Minimum parking duration before the exit test starts.
    pub return_duration_hours: f64,
    /// Width of the parking range; 0 parks capital uninvested.
    pub parking_range_pct: f64,
}

fn hours(h: f64) -> Duration {
    Duration::minutes((h * 60.0) as i64)
}

/// Ladder policy with the HODL state machine layered on.
#[derive(Debug, Clone)]
pub struct LadderHodl {
    state: LadderState,
    threshold_up: f64,
    threshold_down: f64,
    config: HodlConfig,

    hodl_active: bool,
    rebalances_up: Vec<chrono::NaiveDateTime>,
    rebalances_down: Vec<chrono::NaiveDateTime>,
    return_window_prices: Vec<PricePoint>,
    seen_open_events: usize,
}

impl LadderHodl {
    pub fn new(
        ranges: Vec<f64>,
        max_rebalances: Vec<u32>,
        threshold_up: f64,
        threshold_down: f64,
        config: HodlConfig,
    ) -> Result<Self, LadderError> {
        validate_threshold(threshold_up)?;
        validate_threshold(threshold_down)?;
        if config.return_duration_hours <= 0.0 {
            return Err(RangeError::NonPositiveRange(config.return_duration_hours).into());
        }
        Ok(Self {
            state: LadderState::new(ranges, max_rebalances)?,
            threshold_up,
            threshold_down,
            config,
            hodl_active: false,
            rebalances_up: Vec::new(),
            rebalances_down: Vec::new(),
            return_window_prices: Vec::new(),
            seen_open_events: 0,
        })
    }

    /// Pull direction-tagged opens recorded since the last bar into the
    /// per-direction timestamp lists.
    fn absorb_open_events(&mut self, exec: &Executor) {
        let events = exec.open_events();
        for event in &events[self.seen_open_events..] {
            match event.direction {
                Some(RebalanceDirection::Up) => self.rebalances_up.push(event.timestamp),
                Some(RebalanceDirection::Down) => self.rebalances_down.push(event.timestamp),
                None => {}
            }
        }
        self.seen_open_events = events.len();
    }

    fn should_leave_lp(&self, exec: &Executor) -> bool {
        self.price_moved_too_much(exec) && self.rebalanced_too_often(exec)
    }

    fn price_moved_too_much(&self, exec: &Executor) -> bool {
        exec.max_price_change_in_past_period(hours(self.config.price_movement_window_hours))
            > self.config.max_price_change_pct
    }

    fn rebalanced_too_often(&self, exec: &Executor) -> bool {
        let (Some(count), Some(window_hours)) = (
            self.config.max_rebalances_count,
            self.config.max_rebalances_window_hours,
        ) else {
            return true;
        };
        let oldest_allowed = exec.timestamp() - hours(window_hours);
        for timestamps in [&self.rebalances_up, &self.rebalances_down] {
            let recent = timestamps.iter().filter(|&&t| t >= oldest_allowed).count();
            if recent >= count as usize {
                info!(
                    "({}) reached max rebalances {count} during last {window_hours} h in one direction",
                    exec.timestamp()
                );
                return true;
            }
        }
        false
    }

    fn enter_hodl(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let now = exec.timestamp();
        let price = exec.price();
        if self.config.parking_range_pct <= 0.0 {
            info!(
                "({now}) going into HODL mode: removing all liquidity and rebalancing at price {price:.2}"
            );
            exec.close_all()?;
            exec.even_rebalance(price)?;
            exec.clear_range();
        } else {
            info!(
                "({now}) going into HODL mode: entering a {}% parking range",
                self.config.parking_range_pct
            );
            exec.rebalance_and_open_symmetric(self.config.parking_range_pct)?;
        }
        self.hodl_active = true;
        Ok(())
    }

    fn exit_hodl(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        self.state.clear();
        self.rebalances_up.clear();
        self.rebalances_down.clear();
        self.return_window_prices.clear();
        self.hodl_active = false;
        exec.rebalance_and_open_symmetric(self.state.narrowest_range())?;
        Ok(())
    }

    /// Trailing `(max - min) / min` movement of the return-window buffer.
    fn trailing_movement_pct(&self) -> f64 {
        let mut min_price = f64::MAX;
        let mut max_price = f64::MIN;
        for point in &self.return_window_prices {
            min_price = min_price.min(point.price);
            max_price = max_price.max(point.price);
        }
        if self.return_window_prices.is_empty() || min_price <= 0.0 {
            return 0.0;
        }
        (max_price - min_price) / min_price * 100.0
    }

    fn hodl_bar(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let now = exec.timestamp();
        self.return_window_prices.push(PricePoint {
            timestamp: now,
            price: exec.price(),
        });

        // The buffer must span the full return window before the exit test
        // runs; drop the oldest point once it does.
        let window_spanned = now - hours(self.config.return_duration_hours)
            >= self.return_window_prices[0].timestamp;
        if !window_spanned {
            return Ok(());
        }
        self.return_window_prices.remove(0);

        let movement = self.trailing_movement_pct();
        if movement < self.config.return_price_pct {
            info!(
                "({now}) going back to LPing, max price movement during the last {} h is {movement:.2}%",
                self.config.return_duration_hours
            );
            self.exit_hodl(exec)?;
        }
        Ok(())
    }
}

impl RebalancePolicy for LadderHodl {
    fn name(&self) -> &'static str {
        "ladder_hodl"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_symmetric(self.state.narrowest_range())?;
        self.absorb_open_events(exec);
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        self.absorb_open_events(exec);

        if self.hodl_active {
            return self.hodl_bar(exec);
        }

        if self.should_leave_lp(exec) {
            let change = exec
                .max_price_change_in_past_period(hours(self.config.price_movement_window_hours));
            info!(
                "({}) conditions to get out of LPing met: price moved {change:.2}% (> {}%) in the last {} hours",
                exec.timestamp(),
                self.config.max_price_change_pct,
                self.config.price_movement_window_hours
            );
            self.enter_hodl(exec)?;
        } else {
            self.state.step(exec)?;
        }

        // Displacement check against the active position, independent of the
        // ladder's out-of-range test.
        if let Some(position) = exec.ledger.first().cloned() {
            if exec.position_threshold_reached(
                &position,
                self.threshold_up,
                self.threshold_down,
                None,
            ) {
                exec.rebalance_and_open_symmetric(self.state.narrowest_range())?;
            }
        }

        self.absorb_open_events(exec);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HodlConfig {
        HodlConfig {
            max_rebalances_count: Some(3),
            max_rebalances_window_hours: Some(12.0),
            max_price_change_pct: 1.0,
            price_movement_window_hours: 24.0,
            return_price_pct: 12.0,
            return_duration_hours: 10.0,
            parking_range_pct: 0.0,
        }
    }

    #[test]
    fn rejects_out_of_bounds_thresholds() {
        assert!(LadderHodl::new(vec![2.0], vec![3], 0.0, 50.0, config()).is_err());
        assert!(LadderHodl::new(vec![2.0], vec![3], 50.0, 101.0, config()).is_err());
        assert!(LadderHodl::new(vec![2.0], vec![3], 100.0, 100.0, config()).is_ok());
    }

    #[test]
    fn rejects_non_positive_return_duration() {
        let mut cfg = config();
        cfg.return_duration_hours = 0.0;
        assert!(LadderHodl::new(vec![2.0], vec![3], 50.0, 50.0, cfg).is_err());
    }

    #[test]
    fn trailing_movement_uses_min_as_denominator() {
        let mut policy = LadderHodl::new(vec![2.0], vec![3], 50.0, 50.0, config()).unwrap();
        let ts = chrono::NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for (i, price) in [100.0, 110.0, 105.0].iter().enumerate() {
            policy.return_window_prices.push(PricePoint {
                timestamp: ts + Duration::hours(i as i64),
                price: *price,
            });
        }
        assert!((policy.trailing_movement_pct() - 10.0).abs() < 1e-9);
    }
}
