//! End-of-run performance summary.

use serde::{Deserialize, Serialize};

use rangelab_core::engine::RunOutput;

/// Profit and fee-income figures derived from a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Net value change over the run, in base units.
    pub profit: f64,
    /// Final net value relative to the buy-and-hold baseline.
    pub vs_hodl: f64,
    /// Cumulative trading fees earned, per token.
    pub base_fees_earned: f64,
    pub quote_fees_earned: f64,
    /// Approximate fee APR: treats total fee income as twice the base-side
    /// earnings, annualized over the run window.
    pub fee_apr_pct: f64,
    pub days: f64,
}

impl PerformanceSummary {
    pub fn compute(output: &RunOutput, starting_base_amount: f64) -> Self {
        let series = &output.series;
        let profit = output.summary.final_net_value - output.summary.initial_net_value;
        let vs_hodl = output.summary.final_net_value
            - series.hodl_value.last().copied().unwrap_or_default();
        let base_fees_earned = series.base_fees_earned.last().copied().unwrap_or_default();
        let quote_fees_earned = series.quote_fees_earned.last().copied().unwrap_or_default();

        let days = match (series.timestamps.first(), series.timestamps.last()) {
            (Some(first), Some(last)) => {
                ((*last - *first).num_seconds() as f64 / 86_400.0).max(1.0 / 24.0)
            }
            _ => 0.0,
        };
        let fee_apr_pct = if days > 0.0 && starting_base_amount > 0.0 {
            (base_fees_earned * 2.0 / starting_base_amount) / (days / 365.0) * 100.0
        } else {
            0.0
        };

        Self {
            profit,
            vs_hodl,
            base_fees_earned,
            quote_fees_earned,
            fee_apr_pct,
            days,
        }
    }
}
