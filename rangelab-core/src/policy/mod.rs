//! Rebalancing policies.
//!
//! Each strategy is a [`RebalancePolicy`] holding only its own state; every
//! shared mechanic (closing, capital rebalancing, opening, fee charging,
//! stats) lives in the composed [`Executor`] the engine passes into each
//! call. Policies are built from a serde-tagged config through the factory's
//! explicit registry.

pub mod asymmetric;
pub mod block_ladder;
pub mod constant_range;
pub mod executor;
pub mod extend_decrease;
pub mod factory;
pub mod ladder;
pub mod ladder_hodl;
pub mod overlapping;
pub mod partial_rebalance;
pub mod single_threshold;
pub mod time_dynamic;
pub mod time_gated;

pub use asymmetric::AsymmetricThreshold;
pub use block_ladder::BlockLadder;
pub use constant_range::ConstantRange;
pub use executor::{Executor, OpenEvent};
pub use extend_decrease::ExtendAndDecrease;
pub use factory::{build_policy, registry, PolicyConfig, StrategyInfo};
pub use ladder::Ladder;
pub use ladder_hodl::{HodlConfig, LadderHodl};
pub use overlapping::Overlapping;
pub use partial_rebalance::PartialRebalance;
pub use single_threshold::SingleThreshold;
pub use time_dynamic::{RangeMode, TimeDynamic, TimeDynamicHodlConfig};
pub use time_gated::TimeGated;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

/// Which way the price left the previous range when a rebalance fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalanceDirection {
    Up,
    Down,
}

/// A stateful rebalancing strategy, driven once per bar.
pub trait RebalancePolicy {
    fn name(&self) -> &'static str;

    /// Called once at run start, after the pool is positioned on the first
    /// bar. Most policies open their initial position here.
    fn initialize(&mut self, exec: &mut Executor) -> Result<(), EngineError>;

    /// Called once per bar, in timestamp order. All market lookups available
    /// through the executor are backward-looking.
    fn decide(&mut self, exec: &mut Executor) -> Result<(), EngineError>;
}

/// Calendar-day bucket for per-day rebalance caps.
pub(crate) fn day_key(timestamp: NaiveDateTime) -> (i32, u32) {
    (timestamp.year(), timestamp.ordinal())
}
