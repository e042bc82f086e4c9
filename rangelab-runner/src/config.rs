//! Serializable run configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use rangelab_core::domain::{Chain, PoolConfig, Token};
use rangelab_core::policy::PolicyConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("start date {start} is after end date {end}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },
    #[error("starting capital must be positive, got {0}")]
    NonPositiveCapital(f64),
}

/// Everything needed to reproduce a run: the pool, the date window, the
/// starting capital, and the policy with its parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub pool: PoolSection,
    pub backtest: BacktestSection,
    pub strategy: PolicyConfig,
}

/// Pool description as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolSection {
    pub address: String,
    pub chain: Chain,
    pub base_symbol: String,
    pub base_decimals: u8,
    pub quote_symbol: String,
    pub quote_decimals: u8,
    /// Pool swap fee rate as a fraction (0.0005 = 0.05%).
    pub fee_rate: f64,
}

/// Run window and sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    /// Inclusive date window; bars outside it are dropped at load time.
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Starting balance, denominated in the base token.
    pub starting_base_amount: f64,
    /// CSV price data file (`timestamp,price` columns).
    pub data_path: PathBuf,
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigError::InvertedDates {
                start: self.backtest.start_date,
                end: self.backtest.end_date,
            });
        }
        if self.backtest.starting_base_amount <= 0.0 {
            return Err(ConfigError::NonPositiveCapital(
                self.backtest.starting_base_amount,
            ));
        }
        Ok(())
    }

    /// The core-facing pool descriptor.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            address: self.pool.address.clone(),
            chain: self.pool.chain,
            base: Token::new(self.pool.base_symbol.clone(), self.pool.base_decimals),
            quote: Token::new(self.pool.quote_symbol.clone(), self.pool.quote_decimals),
            fee_rate: self.pool.fee_rate,
        }
    }

    /// Deterministic content hash: identical configs share a run id.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunConfig {
        RunConfig {
            pool: PoolSection {
                address: "0xabc".into(),
                chain: Chain::Ethereum,
                base_symbol: "USDC".into(),
                base_decimals: 6,
                quote_symbol: "WETH".into(),
                quote_decimals: 18,
                fee_rate: 0.0005,
            },
            backtest: BacktestSection {
                start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
                starting_base_amount: 100_000.0,
                data_path: "data/0xabc.csv".into(),
            },
            strategy: PolicyConfig::SingleThreshold {
                range_pct: 2.0,
                max_rebalances_per_day: 3,
            },
        }
    }

    #[test]
    fn run_id_is_deterministic() {
        let config = sample();
        assert_eq!(config.run_id(), config.run_id());
        assert!(!config.run_id().is_empty());
    }

    #[test]
    fn run_id_changes_with_parameters() {
        let a = sample();
        let mut b = sample();
        b.strategy = PolicyConfig::SingleThreshold {
            range_pct: 5.0,
            max_rebalances_per_day: 3,
        };
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn rejects_inverted_dates() {
        let mut config = sample();
        config.backtest.start_date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedDates { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_capital() {
        let mut config = sample();
        config.backtest.starting_base_amount = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCapital(_))
        ));
    }

    #[test]
    fn toml_roundtrip() {
        let toml_src = r#"
            [pool]
            address = "0xabc"
            chain = "ethereum"
            base_symbol = "USDC"
            base_decimals = 6
            quote_symbol = "WETH"
            quote_decimals = 18
            fee_rate = 0.0005

            [backtest]
            start_date = "2023-01-01"
            end_date = "2023-01-31"
            starting_base_amount = 100000.0
            data_path = "data/0xabc.csv"

            [strategy]
            type = "single_threshold"
            range_pct = 2.0
            max_rebalances_per_day = 3
        "#;
        let config: RunConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config, sample());
    }
}
