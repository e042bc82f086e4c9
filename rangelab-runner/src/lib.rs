//! RangeLab Runner — wires a run configuration to the core engine and turns
//! the output into artifacts.
//!
//! - `config`: TOML run configuration with a content-addressed run id
//! - `data_loader`: CSV minute-bar price series
//! - `runner`: orchestration (config → series → pool → policy → engine)
//! - `metrics`: profit and fee-APR summary
//! - `export`: derived-series CSV, report JSON, hourly portfolio chart JSON

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::RunConfig;
pub use export::save_artifacts;
pub use metrics::PerformanceSummary;
pub use runner::{run_from_config, BacktestReport, RunnerError};
