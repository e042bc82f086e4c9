//! Invest once into a symmetric range and hold it for the whole run.

use crate::engine::EngineError;
use crate::range;

use super::{Executor, RebalancePolicy};

/// Buy-and-LP baseline: a single position, never rebalanced.
#[derive(Debug, Clone)]
pub struct ConstantRange {
    range_pct: f64,
}

impl ConstantRange {
    pub fn new(range_pct: f64) -> Result<Self, range::RangeError> {
        if range_pct <= 0.0 {
            return Err(range::RangeError::NonPositiveRange(range_pct));
        }
        Ok(Self { range_pct })
    }
}

impl RebalancePolicy for ConstantRange {
    fn name(&self) -> &'static str {
        "constant_range"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        exec.rebalance_and_open_symmetric(self.range_pct)?;
        Ok(())
    }

    fn decide(&mut self, _exec: &mut Executor) -> Result<(), EngineError> {
        Ok(())
    }
}
