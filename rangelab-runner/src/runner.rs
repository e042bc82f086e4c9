//! Run orchestration: config → price series → pool simulator → policy →
//! engine → report.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use rangelab_core::engine::{run, EngineError, RunOutput};
use rangelab_core::market::sim::SimPool;
use rangelab_core::policy::{build_policy, factory::PolicyError};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load_price_series, LoadError};
use crate::metrics::PerformanceSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub pool_address: String,
    pub strategy: rangelab_core::policy::PolicyConfig,
    pub performance: PerformanceSummary,
    pub output: RunOutput,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Execute the configured run end to end.
pub fn run_from_config(config: &RunConfig) -> Result<BacktestReport, RunnerError> {
    config.validate()?;
    let pool_config = config.pool_config();
    info!(
        "pool used: {:?} - {} ({}-{})",
        pool_config.chain, pool_config.address, pool_config.base.symbol, pool_config.quote.symbol
    );

    let series = load_price_series(
        &config.backtest.data_path,
        config.backtest.start_date,
        config.backtest.end_date,
    )?;

    let pool = SimPool::new(
        pool_config.fee_rate,
        series.first_timestamp(),
        series.get(0).price,
    );
    let mut policy = build_policy(&config.strategy)?;
    info!("running strategy '{}'", policy.name());

    let output: RunOutput = run(
        policy.as_mut(),
        Box::new(pool),
        &pool_config,
        config.backtest.starting_base_amount,
        series,
    )?;

    let performance =
        PerformanceSummary::compute(&output, config.backtest.starting_base_amount);
    info!(
        "profit {:.4} {} over {:.1} days, fee APR {:.2}%",
        performance.profit, pool_config.base.symbol, performance.days, performance.fee_apr_pct
    );

    Ok(BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        pool_address: pool_config.address,
        strategy: config.strategy.clone(),
        performance,
        output,
    })
}
