//! Token and pool descriptors.

use serde::{Deserialize, Serialize};

/// One of the two pool assets.
///
/// The symbol is matched (lowercased) against the built-in gas fee schedules,
/// so `"WETH"` and `"weth"` are equivalent there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Chain the pool lives on. Keys the historical gas fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Arbitrum,
}

/// Which side of the pool a fee is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSide {
    Base,
    Quote,
}

/// Immutable description of the pool a run trades against.
///
/// Prices throughout the engine are quoted as base-per-quote; the base token
/// is the reporting numeraire and the preferred fee-deduction asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub address: String,
    pub chain: Chain,
    pub base: Token,
    pub quote: Token,
    /// Pool swap fee rate as a fraction (0.0005 = 0.05%).
    pub fee_rate: f64,
}
