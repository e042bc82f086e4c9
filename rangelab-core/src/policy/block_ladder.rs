//! Block-laddered ranges: liquidity split across `2k+1` contiguous
//! fixed-width price blocks, shifted block-by-block as the price walks.
//!
//! The active (center) block holds 1/n of each balance, every side block 2/n.
//! When the price escapes the middle block, the block on the far side is
//! closed, the freed capital is swapped across, and a new block is opened on
//! the side the price moved toward — bounded by a rolling 24-hour rebalance
//! cap.

use chrono::{Duration, NaiveDateTime};
use tracing::info;

use crate::domain::PositionTag;
use crate::engine::EngineError;
use crate::range::{self, RangeError};

use super::{Executor, RebalanceDirection, RebalancePolicy};

/// The fixed-block laddering policy.
#[derive(Debug, Clone)]
pub struct BlockLadder {
    range_pct: f64,
    side_blocks: u32,
    max_rebalances_per_24h: u32,
    rebalance_times: Vec<NaiveDateTime>,
}

impl BlockLadder {
    pub fn new(
        range_pct: f64,
        side_blocks: u32,
        max_rebalances_per_24h: u32,
    ) -> Result<Self, RangeError> {
        if range_pct <= 0.0 {
            return Err(RangeError::NonPositiveRange(range_pct));
        }
        if side_blocks == 0 {
            return Err(RangeError::NonPositiveRange(0.0));
        }
        Ok(Self {
            range_pct,
            side_blocks,
            max_rebalances_per_24h,
            rebalance_times: Vec::new(),
        })
    }

    fn can_rebalance(&self, now: NaiveDateTime) -> bool {
        let day_ago = now - Duration::days(1);
        let recent = self.rebalance_times.iter().filter(|&&t| t > day_ago).count();
        recent < self.max_rebalances_per_24h as usize
    }

    /// Contiguous block bounds around `init_price`: the active block plus
    /// `side_blocks` on each side, returned as (index, lower, upper) sorted
    /// by lower bound.
    fn layout(&self, init_price: f64) -> Vec<(i32, f64, f64)> {
        let k = self.side_blocks as i32;
        let (active_lower, active_upper) =
            range::symmetric_bounds(init_price, self.range_pct).expect("validated positive");

        let mut blocks = vec![(0, active_lower, active_upper)];
        let mut last_upper = active_upper;
        let mut last_lower = active_lower;
        for i in 1..=k {
            let upper = range::block_above(last_upper, self.range_pct);
            blocks.push((i, last_upper, upper));
            last_upper = upper;

            let lower = range::block_below(last_lower, self.range_pct);
            blocks.push((-i, lower, last_lower));
            last_lower = lower;
        }
        blocks.sort_by(|a, b| a.1.total_cmp(&b.1));
        blocks
    }

    fn record_rebalance(&mut self, exec: &mut Executor, now: NaiveDateTime) {
        self.rebalance_times.push(now);
        if let Some(middle) = exec.ledger.middle() {
            let (lower, upper) = (middle.lower_price, middle.upper_price);
            exec.set_range(lower, upper);
        }
    }
}

impl RebalancePolicy for BlockLadder {
    fn name(&self) -> &'static str {
        "block_ladder"
    }

    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let price = exec.price();
        let timestamp = exec.timestamp();
        exec.even_rebalance(price)?;

        let block_count = self.side_blocks * 2 + 1;
        let share = 1.0 / block_count as f64;
        let (base_holdings, quote_holdings) = exec.holdings();

        for (index, lower, upper) in self.layout(price) {
            // The active block takes a single share, side blocks two each.
            let weight = if index == 0 { share } else { share * 2.0 };
            exec.open_custom(
                lower,
                upper,
                Some(base_holdings * weight),
                Some(quote_holdings * weight),
                Some(PositionTag::BlockIndex(index)),
                None,
            )?;
            info!("({timestamp}) opened position for block number {index}");
        }

        if let Some(middle) = exec.ledger.middle() {
            let (lower, upper) = (middle.lower_price, middle.upper_price);
            exec.set_range(lower, upper);
        }
        Ok(())
    }

    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError> {
        let Some(middle) = exec.ledger.middle() else {
            return Ok(());
        };
        let price = exec.price();
        let direction = if price > middle.upper_price {
            RebalanceDirection::Up
        } else if price < middle.lower_price {
            RebalanceDirection::Down
        } else {
            return Ok(());
        };

        let now = exec.timestamp();
        if !self.can_rebalance(now) {
            info!(
                "({now}) skipping rebalance - reached max ({}) 24h rebalances",
                self.max_rebalances_per_24h
            );
            return Ok(());
        }

        info!("({now}) got out of the active block, direction: {direction:?}");

        match direction {
            RebalanceDirection::Up => {
                // Drop the lowest block, convert the freed base into quote,
                // and extend the ladder above the current top.
                let victim = exec.ledger.lowest().expect("ledger non-empty").id;
                exec.close(victim, None)?;

                let (base_holdings, _) = exec.holdings();
                let quote_to_buy = base_holdings / price * (1.0 - exec.fee_rate());
                let swap = exec.swap_buy(quote_to_buy)?;
                info!(
                    "({now}) bought {:.5} quote, sold {:.2} base, fee {:.2} base",
                    swap.amount_out, swap.amount_in, swap.fee
                );

                let lower = exec.ledger.highest().expect("ledger non-empty").upper_price;
                let upper = range::block_above(lower, self.range_pct);
                exec.open_custom(
                    lower,
                    upper,
                    None,
                    None,
                    Some(PositionTag::BlockIndex(self.side_blocks as i32)),
                    Some(direction),
                )?;
            }
            RebalanceDirection::Down => {
                let victim = exec.ledger.highest().expect("ledger non-empty").id;
                exec.close(victim, None)?;

                let (_, quote_holdings) = exec.holdings();
                let swap = exec.swap_sell(quote_holdings)?;
                info!(
                    "({now}) sold {:.5} quote, got {:.2} base, fee {:.10} quote",
                    swap.amount_in, swap.amount_out, swap.fee
                );

                let upper = exec.ledger.lowest().expect("ledger non-empty").lower_price;
                let lower = range::block_below(upper, self.range_pct);
                exec.open_custom(
                    lower,
                    upper,
                    None,
                    None,
                    Some(PositionTag::BlockIndex(-(self.side_blocks as i32))),
                    Some(direction),
                )?;
            }
        }

        self.record_rebalance(exec, now);
        Ok(())
    }
}
