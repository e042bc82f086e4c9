//! Policy registry — converts a serde-tagged `PolicyConfig` into a runtime
//! trait object.
//!
//! The mapping is an explicit match, populated here and nowhere else; adding
//! a strategy means adding a config variant, a constructor arm, and a
//! registry row.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::range::RangeError;

use super::extend_decrease::{ExtendDecreaseError, NarrowConfig, WidenConfig};
use super::ladder::LadderError;
use super::{
    AsymmetricThreshold, BlockLadder, ConstantRange, ExtendAndDecrease, HodlConfig, Ladder,
    LadderHodl, Overlapping, PartialRebalance, RangeMode, RebalancePolicy, SingleThreshold,
    TimeDynamic, TimeDynamicHodlConfig, TimeGated,
};

/// Errors from policy construction. All are configuration mistakes and abort
/// before any bar is processed.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid range parameters: {0}")]
    Range(#[from] RangeError),
    #[error("invalid ladder: {0}")]
    Ladder(#[from] LadderError),
    #[error("invalid extend-and-decrease configuration: {0}")]
    ExtendDecrease(#[from] ExtendDecreaseError),
}

/// Serializable strategy selection plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// One symmetric position, never rebalanced.
    ConstantRange { range_pct: f64 },
    /// Fixed range, rebalanced out-of-range, capped per calendar day.
    SingleThreshold {
        range_pct: f64,
        max_rebalances_per_day: u32,
    },
    /// Tiered (range, per-day budget) ladder.
    Ladder {
        ranges: Vec<f64>,
        max_rebalances: Vec<u32>,
    },
    /// Ladder with a minimum cooldown between rebalances.
    TimeGated {
        ranges: Vec<f64>,
        max_rebalances: Vec<u32>,
        min_minutes_between_rebalances: u32,
    },
    /// Ladder with the HODL state machine.
    LadderHodl {
        ranges: Vec<f64>,
        max_rebalances: Vec<u32>,
        threshold_up: f64,
        threshold_down: f64,
        hodl: HodlConfig,
    },
    /// 2k+1 contiguous fixed-width blocks shifted with the price.
    BlockLadder {
        range_pct: f64,
        side_blocks: u32,
        max_rebalances_per_24h: u32,
    },
    /// One asymmetric range with displacement thresholds.
    Asymmetric {
        down_pct: f64,
        up_pct: f64,
        threshold_up: f64,
        threshold_down: f64,
    },
    /// Widen on volatility spikes, narrow back when calm.
    ExtendAndDecrease {
        initial_range_pct: f64,
        out_of_range_threshold: f64,
        widen: WidenConfig,
        narrow: NarrowConfig,
    },
    /// Range width derived from recent daily movement.
    TimeDynamic {
        mode: RangeMode,
        last_days: u32,
        hodl: TimeDynamicHodlConfig,
    },
    /// Divisional partial rebalancing.
    PartialRebalance { range_pct: f64, division: u32 },
    /// Weighted concentric ranges recycled individually.
    Overlapping {
        ranges: Vec<f64>,
        weights: Vec<f64>,
    },
}

/// Build the configured policy, validating every parameter up front.
pub fn build_policy(config: &PolicyConfig) -> Result<Box<dyn RebalancePolicy>, PolicyError> {
    Ok(match config.clone() {
        PolicyConfig::ConstantRange { range_pct } => Box::new(ConstantRange::new(range_pct)?),
        PolicyConfig::SingleThreshold {
            range_pct,
            max_rebalances_per_day,
        } => Box::new(SingleThreshold::new(range_pct, max_rebalances_per_day)?),
        PolicyConfig::Ladder {
            ranges,
            max_rebalances,
        } => Box::new(Ladder::new(ranges, max_rebalances)?),
        PolicyConfig::TimeGated {
            ranges,
            max_rebalances,
            min_minutes_between_rebalances,
        } => Box::new(TimeGated::new(
            ranges,
            max_rebalances,
            min_minutes_between_rebalances,
        )?),
        PolicyConfig::LadderHodl {
            ranges,
            max_rebalances,
            threshold_up,
            threshold_down,
            hodl,
        } => Box::new(LadderHodl::new(
            ranges,
            max_rebalances,
            threshold_up,
            threshold_down,
            hodl,
        )?),
        PolicyConfig::BlockLadder {
            range_pct,
            side_blocks,
            max_rebalances_per_24h,
        } => Box::new(BlockLadder::new(
            range_pct,
            side_blocks,
            max_rebalances_per_24h,
        )?),
        PolicyConfig::Asymmetric {
            down_pct,
            up_pct,
            threshold_up,
            threshold_down,
        } => Box::new(AsymmetricThreshold::new(
            down_pct,
            up_pct,
            threshold_up,
            threshold_down,
        )?),
        PolicyConfig::ExtendAndDecrease {
            initial_range_pct,
            out_of_range_threshold,
            widen,
            narrow,
        } => Box::new(ExtendAndDecrease::new(
            initial_range_pct,
            out_of_range_threshold,
            widen,
            narrow,
        )?),
        PolicyConfig::TimeDynamic {
            mode,
            last_days,
            hodl,
        } => Box::new(TimeDynamic::new(mode, last_days, hodl)?),
        PolicyConfig::PartialRebalance {
            range_pct,
            division,
        } => Box::new(PartialRebalance::new(range_pct, division)?),
        PolicyConfig::Overlapping { ranges, weights } => {
            Box::new(Overlapping::new(ranges, weights)?)
        }
    })
}

/// One registry row for listings and pickers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub id: &'static str,
    pub summary: &'static str,
    pub parameters: &'static str,
}

/// The strategy table, in presentation order.
pub fn registry() -> Vec<StrategyInfo> {
    vec![
        StrategyInfo {
            id: "constant_range",
            summary: "Invest once into a symmetric range, never rebalance",
            parameters: "range_pct",
        },
        StrategyInfo {
            id: "single_threshold",
            summary: "Rebalance when out of range, capped per calendar day",
            parameters: "range_pct, max_rebalances_per_day",
        },
        StrategyInfo {
            id: "ladder",
            summary: "Tiered ranges escalating as the day's budget is spent",
            parameters: "ranges, max_rebalances",
        },
        StrategyInfo {
            id: "time_gated",
            summary: "Ladder with a minimum cooldown between rebalances",
            parameters: "ranges, max_rebalances, min_minutes_between_rebalances",
        },
        StrategyInfo {
            id: "ladder_hodl",
            summary: "Ladder that parks capital outside the pool in violent markets",
            parameters: "ranges, max_rebalances, threshold_up, threshold_down, hodl",
        },
        StrategyInfo {
            id: "block_ladder",
            summary: "2k+1 contiguous blocks shifted block-by-block with the price",
            parameters: "range_pct, side_blocks, max_rebalances_per_24h",
        },
        StrategyInfo {
            id: "asymmetric",
            summary: "Asymmetric range with directional displacement thresholds",
            parameters: "down_pct, up_pct, threshold_up, threshold_down",
        },
        StrategyInfo {
            id: "extend_and_decrease",
            summary: "Widen the range on volatility spikes, narrow when calm",
            parameters: "initial_range_pct, out_of_range_threshold, widen, narrow",
        },
        StrategyInfo {
            id: "time_dynamic",
            summary: "Range width derived from recent daily price movement",
            parameters: "mode, last_days, hodl",
        },
        StrategyInfo {
            id: "partial_rebalance",
            summary: "Withdraw growing fractions at evenly spaced thresholds",
            parameters: "range_pct, division",
        },
        StrategyInfo {
            id: "overlapping",
            summary: "Weighted concentric ranges recycled individually",
            parameters: "ranges, weights",
        },
    ]
}
