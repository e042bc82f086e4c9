//! Liquidity positions as tracked by the ledger.

use serde::{Deserialize, Serialize};

/// Identifier issued by the pool collaborator when liquidity is minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Strategy-specific metadata attached to a position at open time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionTag {
    /// Symmetric range percent the position was opened with.
    Range(f64),
    /// Block index for laddered strategies (0 = active block at open).
    BlockIndex(i32),
}

/// One open concentrated-liquidity range.
///
/// Owned exclusively by the `PositionLedger`. Liquidity only ever decreases
/// after open (partial withdrawal); a position that reaches zero liquidity is
/// removed from the ledger rather than kept around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub lower_price: f64,
    pub upper_price: f64,
    pub liquidity: u128,
    pub tag: Option<PositionTag>,
}

impl Position {
    /// True when `price` lies strictly inside the position's range.
    pub fn contains(&self, price: f64) -> bool {
        self.lower_price < price && price < self.upper_price
    }

    /// Midpoint of the range, used as the default reference price for
    /// displacement measures.
    pub fn mid_price(&self) -> f64 {
        (self.lower_price + self.upper_price) / 2.0
    }

    /// Compact `lower-upper` rendering for log lines.
    pub fn describe(&self) -> String {
        format!("{:.2}-{:.2}", self.lower_price, self.upper_price)
    }
}
