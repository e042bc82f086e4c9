//! One asymmetric range, rebalanced when the price displacement from the
//! opening price crosses a directional threshold.

use crate::engine::EngineError;
use crate::range::{self, RangeError};

use super::{Executor, RebalancePolicy};

/// Asymmetric-range policy with independent up/down displacement thresholds.
#[derive(Debug, Clone)]
pub struct AsymmetricThreshold {
    down_pct: f64,
    up_pct: f64,
    threshold_up: f64,
    threshold_down: f64,
    start_price: Option<f64>,
}

impl AsymmetricThreshold {
    pub fn new(
        down_pct: f64,
        up_pct: f64,
        threshold_up: f64,
        threshold_down: f64,
    ) -> Result<Self, RangeError> {
        // Bounds are validated eagerly so a bad width fails before any bar.
        range::asymmetric_bounds(100.0, down_pct, up_pct)?;
        range::validate_threshold(threshold_up)?;
        range::validate_threshold(threshold_down)?;
        Ok(Self {
            down_pct,
            up_pct,
            threshold_up,
            threshold_down,
            start_price: None,
        })
    }
}

impl RebalancePolicy for AsymmetricThreshold {
    fn name(&self) -> &'static str {
        "asymmetric_threshold"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_asymmetric(self.down_pct, self.up_pct)?;
        self.start_price = Some(exec.price());
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let Some(position) = exec.ledger.first().cloned() else {
            return Ok(());
        };
        if exec.position_threshold_reached(
            &position,
            self.threshold_up,
            self.threshold_down,
            self.start_price,
        ) {
            exec.rebalance_and_open_asymmetric(self.down_pct, self.up_pct)?;
            self.start_price = Some(exec.price());
        }
        Ok(())
    }
}
