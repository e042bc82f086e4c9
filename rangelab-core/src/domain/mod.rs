//! Domain types — tokens, pool descriptor, positions, wallet, operation stats.

pub mod position;
pub mod stats;
pub mod token;
pub mod wallet;

pub use position::{Position, PositionId, PositionTag};
pub use stats::OperationsStats;
pub use token::{Chain, FeeSide, PoolConfig, Token};
pub use wallet::Wallet;
