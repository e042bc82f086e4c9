//! Run artifacts: derived-series CSV, the full report JSON, and the hourly
//! portfolio chart consumed by the backend.

use serde_json::json;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use chrono::Timelike;
use rangelab_core::engine::RunSeries;

use crate::runner::BacktestReport;

/// First point of both normalized chart series.
const CHART_STARTING_VALUE: f64 = 1000.0;

/// Errors from writing artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write all artifacts for a finished run into `output_dir`:
/// `report.json`, `series.csv`, and `portfolio-chart.json`.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(output_dir).map_err(io_err(output_dir))?;

    let report_path = output_dir.join("report.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&report_path, json).map_err(io_err(&report_path))?;

    let series_path = output_dir.join("series.csv");
    write_series_csv(&report.output.series, &series_path)?;

    let chart_path = output_dir.join("portfolio-chart.json");
    let chart = portfolio_chart_json(&report.pool_address, &report.output.series)?;
    std::fs::write(&chart_path, chart).map_err(io_err(&chart_path))?;

    info!("saved artifacts to {}", output_dir.display());
    Ok(())
}

fn write_series_csv(series: &RunSeries, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path).map_err(ExportError::Csv)?;
    writer.write_record([
        "timestamp",
        "price",
        "range_low",
        "range_high",
        "rebalances",
        "lp_providing",
        "lp_withdrawing",
        "net_value",
        "hodl_value",
        "base_fees_earned",
        "quote_fees_earned",
    ])?;
    for i in 0..series.timestamps.len() {
        writer.write_record([
            series.timestamps[i].format("%Y-%m-%dT%H:%M:%S").to_string(),
            format!("{}", series.prices[i]),
            format!("{}", series.range_low[i]),
            format!("{}", series.range_high[i]),
            format!("{}", series.rebalances[i]),
            format!("{}", series.lp_providing[i]),
            format!("{}", series.lp_withdrawing[i]),
            format!("{}", series.net_value[i]),
            format!("{}", series.hodl_value[i]),
            format!("{}", series.base_fees_earned[i]),
            format!("{}", series.quote_fees_earned[i]),
        ])?;
    }
    writer.flush().map_err(io_err(path))?;
    Ok(())
}

/// The backend chart: `{pool_address: [[timestamp_ms, net, hodl], ...]}`,
/// sampled at full hours only, both series rescaled so the first sample is
/// exactly `CHART_STARTING_VALUE`, values rounded to 6 decimals.
pub fn portfolio_chart_json(pool_address: &str, series: &RunSeries) -> Result<String, ExportError> {
    let hourly: Vec<usize> = (0..series.timestamps.len())
        .filter(|&i| {
            let ts = series.timestamps[i];
            ts.minute() == 0 && ts.second() == 0
        })
        .collect();

    let mut chart = Vec::with_capacity(hourly.len());
    if let Some(&first) = hourly.first() {
        let net_multiplier = CHART_STARTING_VALUE / series.net_value[first];
        let hodl_multiplier = CHART_STARTING_VALUE / series.hodl_value[first];
        for &i in &hourly {
            let timestamp_ms = series.timestamps[i].and_utc().timestamp_millis();
            let net = round6(series.net_value[i] * net_multiplier);
            let hodl = round6(series.hodl_value[i] * hodl_multiplier);
            chart.push(json!([timestamp_ms, net, hodl]));
        }
    }

    Ok(serde_json::to_string(&json!({ pool_address: chart }))?)
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
