//! Cumulative operation counters and gas costs.

use serde::{Deserialize, Serialize};

/// Monotonic counters for the three chargeable operations, plus their
/// cumulative gas cost in the fee token's native units.
///
/// Mutated only by the shared executor primitives; never reset mid-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationsStats {
    pub rebalances_count: u64,
    pub providing_lp_count: u64,
    pub withdrawing_lp_count: u64,

    pub rebalances_cost: f64,
    pub providing_lp_cost: f64,
    pub withdrawing_lp_cost: f64,
}
