//! Pool collaborator interface.
//!
//! The engine never talks to a real AMM; everything it needs from the pool is
//! behind [`LiquidityPool`]. The in-crate [`sim::SimPool`] satisfies the trait
//! for offline runs and tests; a chain-backed implementation would slot in the
//! same way.

pub mod sim;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{PositionId, Wallet};

/// Result of minting liquidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MintResult {
    pub id: PositionId,
    pub base_used: f64,
    pub quote_used: f64,
    pub liquidity: u128,
}

/// Result of burning liquidity (full or partial).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnResult {
    pub base_received: f64,
    pub quote_received: f64,
}

/// Result of a swap. `amount_in`/`amount_out` are in the tokens the swap
/// consumed and produced; the fee is denominated in the input-side token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapResult {
    pub fee: f64,
    pub amount_out: f64,
    pub amount_in: f64,
}

/// Errors surfaced by pool operations.
#[derive(Debug, Error, PartialEq)]
pub enum PoolError {
    #[error("unknown position {0}")]
    UnknownPosition(PositionId),
    #[error("withdrawal of {requested} exceeds position liquidity {available}")]
    ExcessWithdrawal { requested: u128, available: u128 },
    #[error("invalid price bounds {lower}-{upper}")]
    InvalidBounds { lower: f64, upper: f64 },
    #[error("insufficient balance for swap: need {needed:.6}, have {available:.6}")]
    InsufficientBalance { needed: f64, available: f64 },
}

/// Everything the decision engine consumes from the pool/market collaborator.
///
/// Contract highlights:
/// - `timestamp()` is non-decreasing across `advance` calls.
/// - `tick_to_price` is deterministic and strictly monotonic in the tick.
/// - `None` maxima in `add_liquidity` mean "use the whole wallet balance".
/// - The uncollected fee counters are non-decreasing except when a burn
///   collects them, which resets them toward zero.
pub trait LiquidityPool {
    /// Current price, base per quote.
    fn price(&self) -> f64;
    fn timestamp(&self) -> NaiveDateTime;
    /// Pool swap fee rate as a fraction.
    fn fee_rate(&self) -> f64;
    fn tick_to_price(&self, tick: i32) -> f64;

    /// Move the pool to the next bar. Driven by the bar loop.
    fn advance(&mut self, timestamp: NaiveDateTime, price: f64);

    fn add_liquidity(
        &mut self,
        wallet: &mut Wallet,
        lower_price: f64,
        upper_price: f64,
        base_max: Option<f64>,
        quote_max: Option<f64>,
    ) -> Result<MintResult, PoolError>;

    /// Burn liquidity; `None` burns the whole position. Collected trading fees
    /// are credited to the wallet alongside the principal.
    fn remove_liquidity(
        &mut self,
        wallet: &mut Wallet,
        id: PositionId,
        liquidity: Option<u128>,
    ) -> Result<BurnResult, PoolError>;

    /// Buy `quote_amount` of the quote token, paying base (fee on the input).
    fn swap_buy(&mut self, wallet: &mut Wallet, quote_amount: f64) -> Result<SwapResult, PoolError>;

    /// Sell `quote_amount` of the quote token for base (fee on the input).
    fn swap_sell(&mut self, wallet: &mut Wallet, quote_amount: f64)
        -> Result<SwapResult, PoolError>;

    /// Token amounts currently backing a position at the pool price.
    fn position_amounts(&self, id: PositionId) -> Result<(f64, f64), PoolError>;

    fn uncollected_base_fees(&self) -> f64;
    fn uncollected_quote_fees(&self) -> f64;
}
