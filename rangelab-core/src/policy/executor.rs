//! The composed execution helper shared by every policy.
//!
//! Owns the pool handle, wallet, position ledger, fee configuration, and
//! operation stats, and exposes the primitives policies are written against:
//! even/asymmetric capital rebalancing, fee-charged opens and closes, and
//! backward-looking price-history queries.

use chrono::{Datelike, Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::domain::{OperationsStats, Position, PositionId, PositionTag, Wallet};
use crate::engine::EngineError;
use crate::fees::FeeConfiguration;
use crate::ledger::PositionLedger;
use crate::market::{LiquidityPool, MintResult, SwapResult};
use crate::range;
use crate::series::PriceSeries;

use super::RebalanceDirection;

/// Which fee rate a charge draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeeKind {
    Rebalance,
    ProvideLp,
    RemoveLp,
}

/// Record of one successful position open. Policies that gate on rebalance
/// timing or direction read these instead of hooking into the open itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenEvent {
    pub timestamp: NaiveDateTime,
    pub lower: f64,
    pub upper: f64,
    /// Direction the price had drifted when the previous range was abandoned;
    /// `None` for the very first open or sized side-block opens.
    pub direction: Option<RebalanceDirection>,
}

/// Per-run execution state and the shared policy primitives.
pub struct Executor {
    pool: Box<dyn LiquidityPool>,
    pub wallet: Wallet,
    pub ledger: PositionLedger,
    fees: Option<FeeConfiguration>,
    pub stats: OperationsStats,
    series: PriceSeries,
    cursor: usize,
    /// Range drawn on the chart for the current bar; `None` while parked.
    current_range: Option<(f64, f64)>,
    open_events: Vec<OpenEvent>,
    initial_base_holdings: f64,
    initial_quote_holdings: f64,
}

impl Executor {
    pub fn new(
        pool: Box<dyn LiquidityPool>,
        wallet: Wallet,
        fees: Option<FeeConfiguration>,
        series: PriceSeries,
    ) -> Self {
        Self {
            pool,
            wallet,
            fees,
            ledger: PositionLedger::new(),
            stats: OperationsStats::default(),
            series,
            cursor: 0,
            current_range: None,
            open_events: Vec::new(),
            initial_base_holdings: 0.0,
            initial_quote_holdings: 0.0,
        }
    }

    // ─── Bar plumbing (driven by the engine loop) ────────────────────

    pub(crate) fn advance_to_bar(&mut self, index: usize) {
        let point = self.series.get(index);
        self.cursor = index;
        self.pool.advance(point.timestamp, point.price);
    }

    /// Freeze the buy-and-hold baseline from the starting wallet: half the
    /// post-swap-fee base balance, mirrored into quote at the initial price.
    pub(crate) fn record_initial_holdings(&mut self) {
        self.initial_base_holdings = (1.0 - self.pool.fee_rate()) * self.wallet.base / 2.0;
        self.initial_quote_holdings = self.initial_base_holdings / self.pool.price();
    }

    // ─── Market state ────────────────────────────────────────────────

    pub fn price(&self) -> f64 {
        self.pool.price()
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.pool.timestamp()
    }

    pub fn fee_rate(&self) -> f64 {
        self.pool.fee_rate()
    }

    pub fn start_timestamp(&self) -> NaiveDateTime {
        self.series.first_timestamp()
    }

    pub fn holdings(&self) -> (f64, f64) {
        (self.wallet.base, self.wallet.quote)
    }

    pub fn current_range(&self) -> Option<(f64, f64)> {
        self.current_range
    }

    /// Drop the charted range (used when parking capital outside the pool).
    pub fn clear_range(&mut self) {
        self.current_range = None;
    }

    pub(crate) fn set_range(&mut self, lower: f64, upper: f64) {
        self.current_range = Some((lower, upper));
    }

    pub fn open_events(&self) -> &[OpenEvent] {
        &self.open_events
    }

    pub fn last_open(&self) -> Option<&OpenEvent> {
        self.open_events.last()
    }

    /// Buy-and-hold comparison value at `price`.
    pub fn baseline_value(&self, price: f64) -> f64 {
        self.initial_base_holdings + self.initial_quote_holdings * price
    }

    /// Wallet plus marked positions plus uncollected fees, in base units.
    pub fn net_value(&self) -> f64 {
        let price = self.price();
        let mut value = self.wallet.value_in_base(price);
        for pos in self.ledger.iter() {
            if let Ok((base_amt, quote_amt)) = self.pool.position_amounts(pos.id) {
                value += base_amt + quote_amt * price;
            }
        }
        value + self.pool.uncollected_base_fees() + self.pool.uncollected_quote_fees() * price
    }

    pub fn uncollected_fees(&self) -> (f64, f64) {
        (
            self.pool.uncollected_base_fees(),
            self.pool.uncollected_quote_fees(),
        )
    }

    // ─── Price history (backward-looking) ────────────────────────────

    /// Largest percent move over `[now - window, now]`.
    pub fn max_price_change_in_past_period(&self, window: Duration) -> f64 {
        self.series
            .max_change_percent_in_window(self.cursor, self.timestamp(), window)
    }

    /// Mean of the per-day max change over the last `days` days.
    pub fn average_max_daily_price_change(&self, days: u32) -> f64 {
        self.series
            .average_max_daily_change(self.cursor, days, self.timestamp())
    }

    // ─── Range queries ───────────────────────────────────────────────

    /// True when the in-position balances are one-sided, i.e. the price sits
    /// outside every open range. An empty ledger is not "out of range" —
    /// there is simply nothing to be out of.
    pub fn is_out_of_range(&self) -> bool {
        if self.ledger.is_empty() {
            return false;
        }
        let mut base_total = 0.0;
        let mut quote_total = 0.0;
        for pos in self.ledger.iter() {
            if let Ok((base_amt, quote_amt)) = self.pool.position_amounts(pos.id) {
                base_total += base_amt;
                quote_total += quote_amt;
            }
        }
        base_total <= 0.0 || quote_total <= 0.0
    }

    /// Displacement-threshold test against a position, measured from
    /// `start_price` (the range midpoint when `None`).
    pub fn position_threshold_reached(
        &self,
        position: &Position,
        threshold_up: f64,
        threshold_down: f64,
        start_price: Option<f64>,
    ) -> bool {
        let start = start_price.unwrap_or_else(|| position.mid_price());
        range::threshold_reached(
            position.lower_price,
            position.upper_price,
            start,
            self.price(),
            threshold_up,
            threshold_down,
        )
    }

    /// Midpoint-referenced out-of-range level of a position, 0–100.
    pub fn position_out_of_range_level(&self, position: &Position) -> f64 {
        range::out_of_range_level(position.lower_price, position.upper_price, self.price())
    }

    // ─── Fee charging ────────────────────────────────────────────────

    fn charge_fee(&mut self, kind: FeeKind) -> Result<(f64, f64), EngineError> {
        let Some(fees) = &self.fees else {
            return Ok((0.0, 0.0));
        };
        let rate = fees.rate_for_year(self.timestamp().year());
        let amount = match kind {
            FeeKind::Rebalance => rate.swap_in,
            FeeKind::ProvideLp => rate.liquidity_providing,
            FeeKind::RemoveLp => rate.removing_liquidity,
        };
        let spent = fees.charge(amount, self.price(), self.timestamp(), &mut self.wallet)?;
        match kind {
            FeeKind::Rebalance => self.stats.rebalances_cost += amount,
            FeeKind::ProvideLp => self.stats.providing_lp_cost += amount,
            FeeKind::RemoveLp => self.stats.withdrawing_lp_cost += amount,
        }
        Ok(spent)
    }

    // ─── Capital rebalancing ─────────────────────────────────────────

    /// Swap to an even 50/50 base/quote split at `price`. Charges the swap-in
    /// gas fee and counts as exactly one rebalance.
    pub fn even_rebalance(&mut self, price: f64) -> Result<(), EngineError> {
        self.charge_fee(FeeKind::Rebalance)?;
        info!("({}) rebalancing funds", self.timestamp());
        self.rebalance_capital(price)?;
        self.stats.rebalances_count += 1;
        Ok(())
    }

    fn rebalance_capital(&mut self, price: f64) -> Result<(), EngineError> {
        let total_base = self.wallet.base + self.wallet.quote * price;
        let target_base = total_base / 2.0;
        let quote_diff = target_base / price - self.wallet.quote;
        if quote_diff > 0.0 {
            self.pool.swap_buy(&mut self.wallet, quote_diff)?;
        } else if quote_diff < 0.0 {
            self.pool.swap_sell(&mut self.wallet, -quote_diff)?;
        }
        Ok(())
    }

    /// Raw swaps for policies that manage their own asset ratio.
    pub fn swap_buy(&mut self, quote_amount: f64) -> Result<SwapResult, EngineError> {
        Ok(self.pool.swap_buy(&mut self.wallet, quote_amount)?)
    }

    pub fn swap_sell(&mut self, quote_amount: f64) -> Result<SwapResult, EngineError> {
        Ok(self.pool.swap_sell(&mut self.wallet, quote_amount)?)
    }

    // ─── Opening positions ───────────────────────────────────────────

    /// Open a symmetric range around the current price, using the whole
    /// wallet.
    pub fn open_symmetric(&mut self, range_pct: f64) -> Result<MintResult, EngineError> {
        self.open_symmetric_sized(range_pct, None, None)
    }

    /// Open a symmetric range with explicit sizing caps.
    pub fn open_symmetric_sized(
        &mut self,
        range_pct: f64,
        base_max: Option<f64>,
        quote_max: Option<f64>,
    ) -> Result<MintResult, EngineError> {
        let (lower, upper) = range::symmetric_bounds(self.price(), range_pct)?;
        self.open_custom(
            lower,
            upper,
            base_max,
            quote_max,
            Some(PositionTag::Range(range_pct)),
            None,
        )
    }

    /// Open an arbitrary range. The LP gas fee is charged first; explicit
    /// sizing caps are reduced by whatever the charge spent.
    pub fn open_custom(
        &mut self,
        lower: f64,
        upper: f64,
        base_max: Option<f64>,
        quote_max: Option<f64>,
        tag: Option<PositionTag>,
        direction: Option<RebalanceDirection>,
    ) -> Result<MintResult, EngineError> {
        let (base_fee_spent, quote_fee_spent) = self.charge_fee(FeeKind::ProvideLp)?;

        let mint = self.pool.add_liquidity(
            &mut self.wallet,
            lower,
            upper,
            base_max.map(|m| (m - base_fee_spent).max(0.0)),
            quote_max.map(|m| (m - quote_fee_spent).max(0.0)),
        )?;
        self.stats.providing_lp_count += 1;

        self.ledger.insert(Position {
            id: mint.id,
            lower_price: lower,
            upper_price: upper,
            liquidity: mint.liquidity,
            tag,
        });
        self.set_range(lower, upper);
        self.open_events.push(OpenEvent {
            timestamp: self.timestamp(),
            lower,
            upper,
            direction,
        });

        info!(
            "({}) opened position {} range {:.4}-{:.4} at price {:.4}, spent {:.4} base / {:.4} quote, liquidity {}",
            self.timestamp(),
            mint.id,
            lower,
            upper,
            self.price(),
            mint.base_used,
            mint.quote_used,
            mint.liquidity,
        );

        Ok(mint)
    }

    // ─── Closing positions ───────────────────────────────────────────

    /// Close a position fully (`None`) or burn part of its liquidity. Partial
    /// withdrawals keep the position open with reduced liquidity; burning
    /// everything removes it from the ledger.
    pub fn close(
        &mut self,
        id: PositionId,
        liquidity: Option<u128>,
    ) -> Result<(f64, f64), EngineError> {
        let held = self
            .ledger
            .get(id)
            .map(|p| p.liquidity)
            .unwrap_or_default();
        let full = match liquidity {
            None => true,
            Some(amount) => amount >= held,
        };

        let burn = self.pool.remove_liquidity(
            &mut self.wallet,
            id,
            if full { None } else { liquidity },
        )?;
        self.stats.withdrawing_lp_count += 1;

        if full {
            self.ledger.remove(id);
        } else if let Some(amount) = liquidity {
            self.ledger.reduce(id, amount);
        }

        self.charge_fee(FeeKind::RemoveLp)?;

        info!(
            "({}) {} position {id}, received {:.4} base / {:.4} quote",
            self.timestamp(),
            if full { "closed" } else { "partially withdrew" },
            burn.base_received,
            burn.quote_received,
        );

        Ok((burn.base_received, burn.quote_received))
    }

    /// Close every open position. No-op when none are open.
    pub fn close_all(&mut self) -> Result<(), EngineError> {
        for id in self.ledger.ids() {
            self.close(id, None)?;
        }
        Ok(())
    }

    // ─── Compound primitives ─────────────────────────────────────────

    /// The four-step rebalance: close everything, split capital evenly at the
    /// current price, open a fresh symmetric range. Counts as one rebalance
    /// no matter how many positions were closed.
    pub fn rebalance_and_open_symmetric(
        &mut self,
        range_pct: f64,
    ) -> Result<MintResult, EngineError> {
        let init_price = self.price();
        let direction = self.departure_direction(init_price);

        if !self.ledger.is_empty() {
            debug!(
                "({}) removing all liquidity from {} positions",
                self.timestamp(),
                self.ledger.len()
            );
            self.close_all()?;
        }

        self.even_rebalance(init_price)?;

        let (lower, upper) = range::symmetric_bounds(init_price, range_pct)?;
        self.open_custom(
            lower,
            upper,
            None,
            None,
            Some(PositionTag::Range(range_pct)),
            direction,
        )
    }

    /// Asymmetric variant of the rebalance primitive: swap to the deposit
    /// ratio the target range mints at, then open it. Also exactly one
    /// rebalance.
    pub fn rebalance_and_open_asymmetric(
        &mut self,
        down_pct: f64,
        up_pct: f64,
    ) -> Result<MintResult, EngineError> {
        if !self.ledger.is_empty() {
            debug!(
                "({}) removing all liquidity from {} positions",
                self.timestamp(),
                self.ledger.len()
            );
            self.close_all()?;
        }

        self.charge_fee(FeeKind::Rebalance)?;

        let quote_price = self.price();
        let base_price = 1.0 / quote_price;
        let (lower_quote, upper_quote) = range::asymmetric_bounds(quote_price, down_pct, up_pct)?;

        let (base_holdings, quote_holdings) = self.holdings();
        let total_capital_in_base = base_holdings + quote_holdings * quote_price;
        let base_diff = range::base_diff_for_asymmetric_position(
            base_price,
            base_holdings,
            total_capital_in_base,
            1.0 / upper_quote,
            1.0 / lower_quote,
        );

        if base_diff < 0.0 {
            // Surplus base: convert the excess into quote.
            self.pool
                .swap_buy(&mut self.wallet, base_diff.abs() * base_price)?;
        } else if base_diff > 0.0 {
            // Too little base: sell quote to raise it.
            self.pool.swap_sell(&mut self.wallet, base_diff * base_price)?;
        }
        self.stats.rebalances_count += 1;

        self.open_custom(lower_quote, upper_quote, None, None, None, None)
    }

    /// Direction the price sits relative to the most recent position: nearer
    /// the upper bound is `Up`, nearer the lower bound `Down`. `None` without
    /// positions.
    fn departure_direction(&self, price: f64) -> Option<RebalanceDirection> {
        let pos = self.ledger.last()?;
        let diff_down = (price - pos.lower_price).abs();
        let diff_up = (price - pos.upper_price).abs();
        Some(if diff_up < diff_down {
            RebalanceDirection::Up
        } else {
            RebalanceDirection::Down
        })
    }
}
