//! Divisional partial rebalancing.
//!
//! Instead of one all-or-nothing rebalance, each position carries `division`
//! evenly spaced price thresholds on each side of its opening price. Crossing
//! threshold `i` withdraws `(i+1)/division` of the position's liquidity and
//! opens a fresh full position alongside it; once `division` positions are
//! being tracked at once, the next crossing collapses everything into a
//! single fresh symmetric position.

use tracing::debug;

use crate::domain::PositionId;
use crate::engine::EngineError;
use crate::range::RangeError;

use super::{Executor, RebalanceDirection, RebalancePolicy};

/// One precomputed price level of a position's threshold ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PriceThreshold {
    pub index: usize,
    pub price: f64,
    pub direction: RebalanceDirection,
}

/// Per-position tracking data.
#[derive(Debug, Clone)]
struct TrackedPosition {
    id: PositionId,
    thresholds_up: Vec<PriceThreshold>,
    thresholds_down: Vec<PriceThreshold>,
    /// Threshold the last partial rebalance was applied at, to avoid firing
    /// twice while the price lingers in the same band.
    last_applied: Option<PriceThreshold>,
}

/// The divisional partial-rebalance policy.
#[derive(Debug, Clone)]
pub struct PartialRebalance {
    range_pct: f64,
    division: u32,
    /// `range_pct / division` — spacing between consecutive thresholds.
    step_pct: f64,
    tracked: Vec<TrackedPosition>,
}

impl PartialRebalance {
    pub fn new(range_pct: f64, division: u32) -> Result<Self, RangeError> {
        if range_pct <= 0.0 {
            return Err(RangeError::NonPositiveRange(range_pct));
        }
        if division == 0 {
            return Err(RangeError::NonPositiveRange(0.0));
        }
        Ok(Self {
            range_pct,
            division,
            step_pct: range_pct / division as f64,
            tracked: Vec::new(),
        })
    }

    /// Fraction of liquidity withdrawn when threshold `index` is crossed:
    /// `(index + 1) / division`, strictly increasing in the index.
    pub(crate) fn withdraw_fraction(&self, threshold_index: usize) -> f64 {
        (threshold_index as f64 + 1.0) / self.division as f64
    }

    /// Threshold ladders on both sides of `price`: up levels at
    /// `price * (1 + i*step)`, down levels at `price / (1 + i*step)`.
    pub(crate) fn threshold_ladders(
        &self,
        price: f64,
    ) -> (Vec<PriceThreshold>, Vec<PriceThreshold>) {
        let mut up = Vec::with_capacity(self.division as usize);
        let mut down = Vec::with_capacity(self.division as usize);
        for i in 1..=self.division as usize {
            let factor = 1.0 + i as f64 * self.step_pct / 100.0;
            up.push(PriceThreshold {
                index: i - 1,
                price: price * factor,
                direction: RebalanceDirection::Up,
            });
            down.push(PriceThreshold {
                index: i - 1,
                price: price / factor,
                direction: RebalanceDirection::Down,
            });
        }
        (up, down)
    }

    /// The furthest threshold bracketing `price`, or `None` while the price
    /// stays inside the first band. When a bar jumps several thresholds at
    /// once only this furthest one applies.
    fn surpassed_threshold(
        price: f64,
        up: &[PriceThreshold],
        down: &[PriceThreshold],
    ) -> Option<PriceThreshold> {
        if price >= up[0].price {
            return up
                .iter()
                .rev()
                .find(|threshold| price >= threshold.price)
                .copied();
        }
        if price <= down[0].price {
            return down
                .iter()
                .rev()
                .find(|threshold| price <= threshold.price)
                .copied();
        }
        None
    }

    pub(crate) fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    fn open_tracked_position(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let price = exec.price();
        let mint = exec.rebalance_and_open_symmetric(self.range_pct)?;
        let (thresholds_up, thresholds_down) = self.threshold_ladders(price);
        self.tracked.push(TrackedPosition {
            id: mint.id,
            thresholds_up,
            thresholds_down,
            last_applied: None,
        });
        Ok(())
    }

    /// Returns `true` when the tracked entry was fully withdrawn and removed.
    fn partial_rebalance(
        &mut self,
        exec: &mut Executor,
        tracked_index: usize,
        threshold: PriceThreshold,
    ) -> Result<bool, EngineError> {
        let id = self.tracked[tracked_index].id;
        let fraction = self.withdraw_fraction(threshold.index);
        let liquidity = exec.ledger.get(id).map(|p| p.liquidity).unwrap_or_default();
        let withdraw_amount = (liquidity as f64 * fraction) as u128;
        let full = fraction >= 1.0;

        debug!(
            "({}) threshold {} (index {}) crossed, withdrawing {:.0}% of position {id}",
            exec.timestamp(),
            threshold.price,
            threshold.index,
            fraction * 100.0
        );

        exec.close(id, if full { None } else { Some(withdraw_amount) })?;
        if full {
            self.tracked.remove(tracked_index);
        } else {
            self.tracked[tracked_index].last_applied = Some(threshold);
        }

        let price = exec.price();
        // Rebalance and reinvest the idle wallet; tracked positions stay in
        // the pool untouched.
        exec.even_rebalance(price)?;
        let mint = exec.open_symmetric(self.range_pct)?;
        let (thresholds_up, thresholds_down) = self.threshold_ladders(price);
        self.tracked.push(TrackedPosition {
            id: mint.id,
            thresholds_up,
            thresholds_down,
            last_applied: None,
        });
        Ok(full)
    }

    fn collapse_into_single(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        debug!(
            "({}) tracked position count reached the division, collapsing into one position",
            exec.timestamp()
        );
        for tracked in std::mem::take(&mut self.tracked) {
            exec.close(tracked.id, None)?;
        }
        self.open_tracked_position(exec)
    }
}

impl RebalancePolicy for PartialRebalance {
    fn name(&self) -> &'static str {
        "partial_rebalance"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        self.open_tracked_position(exec)
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let price = exec.price();

        let mut index = 0;
        while index < self.tracked.len() {
            let tracked = &self.tracked[index];
            let threshold = Self::surpassed_threshold(
                price,
                &tracked.thresholds_up,
                &tracked.thresholds_down,
            );

            let Some(threshold) = threshold else {
                // Positions are processed oldest-first; the first quiet one
                // ends the bar's processing.
                return Ok(());
            };
            if tracked.last_applied == Some(threshold) {
                return Ok(());
            }

            if self.tracked.len() == self.division as usize {
                return self.collapse_into_single(exec);
            }
            let removed = self.partial_rebalance(exec, index, threshold)?;
            if !removed {
                index += 1;
            }
        }
        Ok(())
    }
}
