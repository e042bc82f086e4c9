//! Overlapping centered ranges: several symmetric positions of different
//! widths held at once, each recycled individually when the price leaves it.

use tracing::info;

use crate::engine::EngineError;
use crate::range::RangeError;

use super::ladder::LadderError;
use super::{Executor, RebalancePolicy};

/// Weighted set of concentric symmetric ranges.
#[derive(Debug, Clone)]
pub struct Overlapping {
    ranges: Vec<f64>,
    weights: Vec<f64>,
}

impl Overlapping {
    pub fn new(ranges: Vec<f64>, weights: Vec<f64>) -> Result<Self, LadderError> {
        if ranges.len() != weights.len() {
            return Err(LadderError::MismatchedLengths {
                ranges: ranges.len(),
                caps: weights.len(),
            });
        }
        if ranges.is_empty() {
            return Err(LadderError::Empty);
        }
        for &value in ranges.iter().chain(weights.iter()) {
            if value <= 0.0 {
                return Err(RangeError::NonPositiveRange(value).into());
            }
        }
        Ok(Self { ranges, weights })
    }

    fn chart_widest(&self, exec: &mut Executor) {
        if let Some(widest) = exec.ledger.widest() {
            let (lower, upper) = (widest.lower_price, widest.upper_price);
            exec.set_range(lower, upper);
        }
    }
}

impl RebalancePolicy for Overlapping {
    fn name(&self) -> &'static str {
        "overlapping"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let price = exec.price();
        exec.even_rebalance(price)?;

        let weight_sum: f64 = self.weights.iter().sum();
        let (base_holdings, quote_holdings) = exec.holdings();
        for (range_pct, weight) in self.ranges.iter().zip(&self.weights) {
            let share = weight / weight_sum;
            exec.open_symmetric_sized(
                *range_pct,
                Some(base_holdings * share),
                Some(quote_holdings * share),
            )?;
        }
        self.chart_widest(exec);
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let price = exec.price();
        let snapshot: Vec<_> = exec
            .ledger
            .iter()
            .map(|p| (p.id, p.lower_price, p.upper_price))
            .collect();

        for (id, lower, upper) in snapshot {
            if lower < price && price < upper {
                continue;
            }
            let Some(range_pct) = exec.ledger.range_tag(id) else {
                continue;
            };
            info!("({}) position {id} got out of range", exec.timestamp());
            exec.close(id, None)?;
            exec.even_rebalance(price)?;
            exec.open_symmetric(range_pct)?;
        }

        self.chart_widest(exec);
        Ok(())
    }
}
