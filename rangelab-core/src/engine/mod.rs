//! The bar loop — drives a policy across the price feed, snapshots the
//! derived series each bar, and reconstructs cumulative earned fees at
//! finalize.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{FeeSide, OperationsStats, PoolConfig, PositionId, Wallet};
use crate::fees::{schedule, FeeConfiguration, InsufficientFunds};
use crate::market::{LiquidityPool, PoolError};
use crate::policy::{Executor, RebalancePolicy};
use crate::range::RangeError;
use crate::series::PriceSeries;

/// Fatal run errors. Configuration problems are caught earlier, at policy
/// construction; what remains mid-run is unrecoverable.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),
    #[error("pool operation failed: {0}")]
    Pool(#[from] PoolError),
    #[error("invalid range: {0}")]
    Range(#[from] RangeError),
}

/// Range bounds of one open position at one bar, for multi-position charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionRangeSnapshot {
    pub id: PositionId,
    pub timestamp: NaiveDateTime,
    pub lower: f64,
    pub upper: f64,
}

/// Per-bar derived series for reporting and charting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub prices: Vec<f64>,
    /// Charted active range; 0 while no range is active (parked in HODL).
    pub range_low: Vec<f64>,
    pub range_high: Vec<f64>,
    pub rebalances: Vec<u64>,
    pub lp_providing: Vec<u64>,
    pub lp_withdrawing: Vec<u64>,
    /// Buy-and-hold baseline: the capital that would exist if never invested.
    pub hodl_value: Vec<f64>,
    pub net_value: Vec<f64>,
    /// Cumulative earned trading fees, reconstructed at finalize.
    pub base_fees_earned: Vec<f64>,
    pub quote_fees_earned: Vec<f64>,
    /// Per-bar bounds of every open position.
    pub position_ranges: Vec<Vec<PositionRangeSnapshot>>,
}

/// End-of-run totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub stats: OperationsStats,
    pub initial_net_value: f64,
    pub final_net_value: f64,
    pub bar_count: usize,
    /// Which pool token gas fees were charged in; `None` ran fee-free.
    pub fee_token: Option<FeeSide>,
}

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub series: RunSeries,
    pub summary: RunSummary,
}

/// Run `policy` over `series` against `pool`, starting from
/// `starting_base_amount` of the base token.
///
/// Gas fee rates are resolved from the built-in schedule for the pool's chain
/// and tokens; a pool with no matching schedule runs fee-free after a single
/// warning. The run either completes every bar or stops at the first fatal
/// error with that bar's context attached.
pub fn run(
    policy: &mut dyn RebalancePolicy,
    pool: Box<dyn LiquidityPool>,
    pool_config: &PoolConfig,
    starting_base_amount: f64,
    series: PriceSeries,
) -> Result<RunOutput, EngineError> {
    let fees = resolve_fees(pool_config);
    let fee_token = fees.as_ref().map(|f| f.token);
    let bar_count = series.len();

    let mut exec = Executor::new(
        pool,
        Wallet::new(starting_base_amount, 0.0),
        fees,
        series,
    );

    exec.advance_to_bar(0);
    exec.record_initial_holdings();
    policy.initialize(&mut exec)?;

    let mut out = RunSeries::default();
    let mut raw_base_fees = Vec::with_capacity(bar_count);
    let mut raw_quote_fees = Vec::with_capacity(bar_count);
    record_bar(&mut out, &mut raw_base_fees, &mut raw_quote_fees, &exec);

    for index in 1..bar_count {
        exec.advance_to_bar(index);
        policy.decide(&mut exec)?;
        record_bar(&mut out, &mut raw_base_fees, &mut raw_quote_fees, &exec);
    }

    out.base_fees_earned = fold_fee_line(&raw_base_fees);
    out.quote_fees_earned = fold_fee_line(&raw_quote_fees);

    let summary = RunSummary {
        stats: exec.stats,
        initial_net_value: out.net_value.first().copied().unwrap_or_default(),
        final_net_value: out.net_value.last().copied().unwrap_or_default(),
        bar_count,
        fee_token,
    };
    info!(
        "run complete: {} bars, {} rebalances, net value {:.4} -> {:.4}",
        bar_count,
        summary.stats.rebalances_count,
        summary.initial_net_value,
        summary.final_net_value
    );

    Ok(RunOutput {
        series: out,
        summary,
    })
}

fn resolve_fees(pool_config: &PoolConfig) -> Option<FeeConfiguration> {
    match schedule::lookup(pool_config) {
        Some(fees) => {
            info!(
                "loaded fee configuration: fees charged in the {:?} token",
                fees.token
            );
            Some(fees)
        }
        None => {
            warn!("no fee configuration found for this pool; using 0 fees for all transactions");
            None
        }
    }
}

fn record_bar(
    out: &mut RunSeries,
    raw_base_fees: &mut Vec<f64>,
    raw_quote_fees: &mut Vec<f64>,
    exec: &Executor,
) {
    let timestamp = exec.timestamp();
    let price = exec.price();
    let (range_low, range_high) = exec.current_range().unwrap_or((0.0, 0.0));

    out.timestamps.push(timestamp);
    out.prices.push(price);
    out.range_low.push(range_low);
    out.range_high.push(range_high);
    out.rebalances.push(exec.stats.rebalances_count);
    out.lp_providing.push(exec.stats.providing_lp_count);
    out.lp_withdrawing.push(exec.stats.withdrawing_lp_count);
    out.hodl_value.push(exec.baseline_value(price));
    out.net_value.push(exec.net_value());

    let (base_fees, quote_fees) = exec.uncollected_fees();
    raw_base_fees.push(base_fees);
    raw_quote_fees.push(quote_fees);

    out.position_ranges.push(
        exec.ledger
            .iter()
            .map(|p| PositionRangeSnapshot {
                id: p.id,
                timestamp,
                lower: p.lower_price,
                upper: p.upper_price,
            })
            .collect(),
    );
}

/// Rebuild a monotonic cumulative earned-fee series from a counter that
/// resets on every collection: whenever the raw counter drops, its previous
/// value is folded into the running accumulator.
fn fold_fee_line(raw: &[f64]) -> Vec<f64> {
    let mut earned = 0.0;
    let mut previous = 0.0;
    let mut line = Vec::with_capacity(raw.len());
    for &uncollected in raw {
        if uncollected < previous {
            earned += previous;
        }
        line.push(earned + uncollected);
        previous = uncollected;
    }
    line
}
