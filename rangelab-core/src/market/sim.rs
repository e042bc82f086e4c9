//! Deterministic pool simulator.
//!
//! Implements [`LiquidityPool`] with the standard sqrt-price liquidity
//! formulas (base plays the role of token1/y, quote of token0/x, price is
//! y/x). Swaps fill at the bar price with the pool fee on the input side; no
//! slippage curve is modelled — this is a collaborator mock for the decision
//! engine, not an AMM reimplementation.
//!
//! Fee accrual is a flat per-bar yield on in-range position value, enough to
//! exercise the uncollected-counter reconstruction downstream. Burning any
//! liquidity collects the accrued fees into the wallet and resets the
//! counters, mirroring how the real collaborator's counters behave.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::{PositionId, Wallet};

use super::{BurnResult, LiquidityPool, MintResult, PoolError, SwapResult};

#[derive(Debug, Clone, Copy)]
struct SimPosition {
    lower: f64,
    upper: f64,
    liquidity: u128,
}

impl SimPosition {
    /// Token amounts backing `liquidity` units at price `p`.
    fn amounts(&self, liquidity: u128, p: f64) -> (f64, f64) {
        let l = liquidity as f64;
        let (sl, su) = (self.lower.sqrt(), self.upper.sqrt());
        if p <= self.lower {
            (0.0, l * (1.0 / sl - 1.0 / su))
        } else if p >= self.upper {
            (l * (su - sl), 0.0)
        } else {
            let sp = p.sqrt();
            (l * (sp - sl), l * (1.0 / sp - 1.0 / su))
        }
    }
}

/// Offline pool backed by the run's price feed.
#[derive(Debug)]
pub struct SimPool {
    fee_rate: f64,
    price: f64,
    timestamp: NaiveDateTime,
    positions: BTreeMap<PositionId, SimPosition>,
    next_id: u64,
    uncollected_base: f64,
    uncollected_quote: f64,
    /// Fraction of in-range position value credited as trading fees per bar.
    fee_yield_per_bar: f64,
}

impl SimPool {
    pub fn new(fee_rate: f64, start: NaiveDateTime, start_price: f64) -> Self {
        Self {
            fee_rate,
            price: start_price,
            timestamp: start,
            positions: BTreeMap::new(),
            next_id: 1,
            uncollected_base: 0.0,
            uncollected_quote: 0.0,
            fee_yield_per_bar: 0.0,
        }
    }

    /// Enable per-bar fee accrual on in-range liquidity.
    pub fn with_fee_yield(mut self, yield_per_bar: f64) -> Self {
        self.fee_yield_per_bar = yield_per_bar;
        self
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    fn accrue_fees(&mut self) {
        if self.fee_yield_per_bar <= 0.0 {
            return;
        }
        for pos in self.positions.values() {
            if pos.lower < self.price && self.price < pos.upper {
                let (base_amt, quote_amt) = pos.amounts(pos.liquidity, self.price);
                self.uncollected_base += base_amt * self.fee_yield_per_bar;
                self.uncollected_quote += quote_amt * self.fee_yield_per_bar;
            }
        }
    }

    fn collect_fees(&mut self, wallet: &mut Wallet) {
        wallet.base += self.uncollected_base;
        wallet.quote += self.uncollected_quote;
        self.uncollected_base = 0.0;
        self.uncollected_quote = 0.0;
    }
}

impl LiquidityPool for SimPool {
    fn price(&self) -> f64 {
        self.price
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn fee_rate(&self) -> f64 {
        self.fee_rate
    }

    fn tick_to_price(&self, tick: i32) -> f64 {
        1.0001_f64.powi(tick)
    }

    fn advance(&mut self, timestamp: NaiveDateTime, price: f64) {
        debug_assert!(timestamp >= self.timestamp, "bars must advance in time");
        self.timestamp = timestamp;
        self.price = price;
        self.accrue_fees();
    }

    fn add_liquidity(
        &mut self,
        wallet: &mut Wallet,
        lower_price: f64,
        upper_price: f64,
        base_max: Option<f64>,
        quote_max: Option<f64>,
    ) -> Result<MintResult, PoolError> {
        if !(lower_price > 0.0 && lower_price < upper_price) {
            return Err(PoolError::InvalidBounds {
                lower: lower_price,
                upper: upper_price,
            });
        }

        let base_avail = base_max.unwrap_or(wallet.base).min(wallet.base).max(0.0);
        let quote_avail = quote_max.unwrap_or(wallet.quote).min(wallet.quote).max(0.0);

        let p = self.price;
        let (sl, su) = (lower_price.sqrt(), upper_price.sqrt());
        let liquidity = if p <= lower_price {
            quote_avail / (1.0 / sl - 1.0 / su)
        } else if p >= upper_price {
            base_avail / (su - sl)
        } else {
            let sp = p.sqrt();
            let from_base = base_avail / (sp - sl);
            let from_quote = quote_avail / (1.0 / sp - 1.0 / su);
            from_base.min(from_quote)
        }
        .floor() as u128;

        let pos = SimPosition {
            lower: lower_price,
            upper: upper_price,
            liquidity,
        };
        let (base_used, quote_used) = pos.amounts(liquidity, p);
        wallet.base -= base_used;
        wallet.quote -= quote_used;

        let id = PositionId(self.next_id);
        self.next_id += 1;
        self.positions.insert(id, pos);

        Ok(MintResult {
            id,
            base_used,
            quote_used,
            liquidity,
        })
    }

    fn remove_liquidity(
        &mut self,
        wallet: &mut Wallet,
        id: PositionId,
        liquidity: Option<u128>,
    ) -> Result<BurnResult, PoolError> {
        let pos = *self
            .positions
            .get(&id)
            .ok_or(PoolError::UnknownPosition(id))?;
        let burn = liquidity.unwrap_or(pos.liquidity);
        if burn > pos.liquidity {
            return Err(PoolError::ExcessWithdrawal {
                requested: burn,
                available: pos.liquidity,
            });
        }

        let (base_received, quote_received) = pos.amounts(burn, self.price);
        wallet.base += base_received;
        wallet.quote += quote_received;

        let remaining = pos.liquidity - burn;
        if remaining == 0 {
            self.positions.remove(&id);
        } else {
            self.positions.get_mut(&id).expect("present").liquidity = remaining;
        }

        self.collect_fees(wallet);

        Ok(BurnResult {
            base_received,
            quote_received,
        })
    }

    fn swap_buy(&mut self, wallet: &mut Wallet, quote_amount: f64) -> Result<SwapResult, PoolError> {
        // Buying Q quote costs Q*p/(1-f) base; the fee is the input-side cut.
        let base_in = quote_amount * self.price / (1.0 - self.fee_rate);
        if wallet.base < base_in - 1e-9 {
            return Err(PoolError::InsufficientBalance {
                needed: base_in,
                available: wallet.base,
            });
        }
        let fee = base_in * self.fee_rate;
        wallet.base -= base_in.min(wallet.base);
        wallet.quote += quote_amount;
        Ok(SwapResult {
            fee,
            amount_out: quote_amount,
            amount_in: base_in,
        })
    }

    fn swap_sell(
        &mut self,
        wallet: &mut Wallet,
        quote_amount: f64,
    ) -> Result<SwapResult, PoolError> {
        if wallet.quote < quote_amount - 1e-12 {
            return Err(PoolError::InsufficientBalance {
                needed: quote_amount,
                available: wallet.quote,
            });
        }
        let fee = quote_amount * self.fee_rate;
        let base_out = (quote_amount - fee) * self.price;
        wallet.quote -= quote_amount.min(wallet.quote);
        wallet.base += base_out;
        Ok(SwapResult {
            fee,
            amount_out: base_out,
            amount_in: quote_amount,
        })
    }

    fn position_amounts(&self, id: PositionId) -> Result<(f64, f64), PoolError> {
        let pos = self
            .positions
            .get(&id)
            .ok_or(PoolError::UnknownPosition(id))?;
        Ok(pos.amounts(pos.liquidity, self.price))
    }

    fn uncollected_base_fees(&self) -> f64 {
        self.uncollected_base
    }

    fn uncollected_quote_fees(&self) -> f64 {
        self.uncollected_quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn pool() -> SimPool {
        SimPool::new(0.0005, ts(0), 100.0)
    }

    #[test]
    fn tick_to_price_strictly_monotonic() {
        let p = pool();
        let mut last = p.tick_to_price(-100);
        for tick in -99..100 {
            let price = p.tick_to_price(tick);
            assert!(price > last);
            last = price;
        }
    }

    #[test]
    fn mint_in_range_uses_both_tokens() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, None, None)
            .unwrap();
        assert!(mint.liquidity > 0);
        assert!(mint.base_used > 0.0 && mint.quote_used > 0.0);
        assert!((wallet.base - (10_000.0 - mint.base_used)).abs() < 1e-9);
        assert!((wallet.quote - (100.0 - mint.quote_used)).abs() < 1e-9);
    }

    #[test]
    fn mint_below_range_is_quote_only() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 110.0, 120.0, None, None)
            .unwrap();
        assert_eq!(mint.base_used, 0.0);
        assert!(mint.quote_used > 0.0);
    }

    #[test]
    fn mint_above_range_is_base_only() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p.add_liquidity(&mut wallet, 80.0, 90.0, None, None).unwrap();
        assert!(mint.base_used > 0.0);
        assert_eq!(mint.quote_used, 0.0);
    }

    #[test]
    fn mint_respects_maxima() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, Some(1_000.0), Some(10.0))
            .unwrap();
        assert!(mint.base_used <= 1_000.0 + 1e-9);
        assert!(mint.quote_used <= 10.0 + 1e-9);
    }

    #[test]
    fn burn_roundtrips_amounts_at_same_price() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, None, None)
            .unwrap();
        let burn = p.remove_liquidity(&mut wallet, mint.id, None).unwrap();
        assert!((burn.base_received - mint.base_used).abs() < 1e-6);
        assert!((burn.quote_received - mint.quote_used).abs() < 1e-6);
        assert_eq!(p.open_position_count(), 0);
    }

    #[test]
    fn partial_burn_keeps_position_open() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, None, None)
            .unwrap();
        let half = mint.liquidity / 2;
        p.remove_liquidity(&mut wallet, mint.id, Some(half)).unwrap();
        assert_eq!(p.open_position_count(), 1);
        let (base_amt, quote_amt) = p.position_amounts(mint.id).unwrap();
        assert!(base_amt > 0.0 && quote_amt > 0.0);
    }

    #[test]
    fn burn_more_than_liquidity_fails() {
        let mut p = pool();
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, None, None)
            .unwrap();
        let err = p
            .remove_liquidity(&mut wallet, mint.id, Some(mint.liquidity + 1))
            .unwrap_err();
        assert!(matches!(err, PoolError::ExcessWithdrawal { .. }));
    }

    #[test]
    fn swap_buy_spends_exactly_the_budgeted_base() {
        let mut p = pool();
        let mut wallet = Wallet::new(1_000.0, 0.0);
        // Buying B*(1-f)/p quote should spend the whole base balance.
        let quote_to_buy = 1_000.0 / 100.0 * (1.0 - p.fee_rate());
        let swap = p.swap_buy(&mut wallet, quote_to_buy).unwrap();
        assert!((swap.amount_in - 1_000.0).abs() < 1e-6);
        assert!(wallet.base.abs() < 1e-6);
        assert!((wallet.quote - quote_to_buy).abs() < 1e-9);
    }

    #[test]
    fn swap_sell_fee_is_input_side() {
        let mut p = pool();
        let mut wallet = Wallet::new(0.0, 10.0);
        let swap = p.swap_sell(&mut wallet, 10.0).unwrap();
        assert!((swap.fee - 10.0 * 0.0005).abs() < 1e-12);
        assert!((swap.amount_out - (10.0 - swap.fee) * 100.0).abs() < 1e-9);
        assert_eq!(wallet.quote, 0.0);
    }

    #[test]
    fn swap_with_insufficient_balance_fails() {
        let mut p = pool();
        let mut wallet = Wallet::new(1.0, 0.0);
        assert!(p.swap_buy(&mut wallet, 100.0).is_err());
        assert!(p.swap_sell(&mut wallet, 1.0).is_err());
    }

    #[test]
    fn fees_accrue_in_range_and_collect_on_burn() {
        let mut p = SimPool::new(0.0005, ts(0), 100.0).with_fee_yield(0.001);
        let mut wallet = Wallet::new(10_000.0, 100.0);
        let mint = p
            .add_liquidity(&mut wallet, 95.0, 105.0, None, None)
            .unwrap();

        p.advance(ts(1), 100.0);
        p.advance(ts(2), 101.0);
        assert!(p.uncollected_base_fees() > 0.0);
        assert!(p.uncollected_quote_fees() > 0.0);

        let before = wallet.base;
        p.remove_liquidity(&mut wallet, mint.id, None).unwrap();
        assert_eq!(p.uncollected_base_fees(), 0.0);
        assert!(wallet.base > before);
    }

    #[test]
    fn fees_do_not_accrue_out_of_range() {
        let mut p = SimPool::new(0.0005, ts(0), 100.0).with_fee_yield(0.001);
        let mut wallet = Wallet::new(10_000.0, 100.0);
        p.add_liquidity(&mut wallet, 95.0, 105.0, None, None).unwrap();
        p.advance(ts(1), 120.0);
        assert_eq!(p.uncollected_base_fees(), 0.0);
    }
}
