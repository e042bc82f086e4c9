//! RangeLab Core — the decision engine for concentrated-liquidity
//! rebalancing strategies.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (tokens, positions, wallet, operation stats)
//! - Range math (symmetric/asymmetric bounds, displacement measures)
//! - Gas fee ledger with built-in per-chain historical schedules
//! - Position ledger and the shared rebalance/open/close primitives
//! - Eleven rebalancing policies behind one `RebalancePolicy` trait
//! - The bar loop, derived reporting series, and fee-earned reconstruction
//! - A pool-collaborator trait plus a deterministic simulator

pub mod domain;
pub mod engine;
pub mod fees;
pub mod ledger;
pub mod market;
pub mod policy;
pub mod range;
pub mod series;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the types that cross the runner boundary are
    /// Send + Sync, so runs can be dispatched from worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Wallet>();
        require_sync::<domain::Wallet>();
        require_send::<domain::OperationsStats>();
        require_sync::<domain::OperationsStats>();
        require_send::<domain::PoolConfig>();
        require_sync::<domain::PoolConfig>();

        require_send::<fees::FeeConfiguration>();
        require_sync::<fees::FeeConfiguration>();

        require_send::<series::PriceSeries>();
        require_sync::<series::PriceSeries>();

        require_send::<policy::PolicyConfig>();
        require_sync::<policy::PolicyConfig>();

        require_send::<engine::RunOutput>();
        require_sync::<engine::RunOutput>();

        require_send::<market::sim::SimPool>();
        require_sync::<market::sim::SimPool>();
    }

    /// Architecture contract: a policy only sees the market through the
    /// executor it is handed. All price-history access goes through the
    /// executor's cursor-bounded queries.
    #[test]
    fn policy_trait_takes_only_the_executor() {
        fn _check_trait_object_builds(
            policy: &mut dyn policy::RebalancePolicy,
            exec: &mut policy::Executor,
        ) -> Result<(), engine::EngineError> {
            policy.decide(exec)
        }
    }
}
