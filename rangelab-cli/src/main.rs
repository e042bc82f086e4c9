//! RangeLab CLI — run backtests and inspect the strategy registry.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file and save artifacts
//! - `strategies` — list the registered strategies and their parameters

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use rangelab_core::policy::registry;
use rangelab_runner::{run_from_config, save_artifacts, RunConfig};

#[derive(Parser)]
#[command(
    name = "rangelab",
    about = "RangeLab CLI — concentrated-liquidity rebalancing backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Override the config's start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Override the config's end date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// List the registered strategies.
    Strategies,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            start,
            end,
            output_dir,
        } => run_cmd(config, start, end, output_dir),
        Commands::Strategies => {
            for info in registry() {
                println!("{:<22} {}", info.id, info.summary);
                println!("{:<22} parameters: {}", "", info.parameters);
            }
            Ok(())
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("bad date '{raw}'"))
}

fn run_cmd(
    config_path: PathBuf,
    start: Option<String>,
    end: Option<String>,
    output_dir: PathBuf,
) -> Result<()> {
    let mut config = RunConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(start) = start {
        config.backtest.start_date = parse_date(&start)?;
    }
    if let Some(end) = end {
        config.backtest.end_date = parse_date(&end)?;
    }

    let report = run_from_config(&config).context("backtest failed")?;
    let summary = &report.performance;
    info!(
        "run {}: profit {:.4}, vs HODL {:.4}, fee APR {:.2}% over {:.1} days",
        &report.run_id[..12],
        summary.profit,
        summary.vs_hodl,
        summary.fee_apr_pct,
        summary.days
    );

    save_artifacts(&report, &output_dir).context("saving artifacts")?;
    println!(
        "Saved report, series, and portfolio chart to {}",
        output_dir.display()
    );
    Ok(())
}
