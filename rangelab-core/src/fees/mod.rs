//! Gas fee accounting — per-year fee rates, schedule lookup, and the charge
//! logic that deducts a fee from the wallet, converting across tokens when the
//! fee token alone cannot cover it.

pub mod schedule;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

use crate::domain::{FeeSide, Wallet};

/// Gas cost of each chargeable operation for one historical year, denominated
/// in the fee token's native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub swap_in: f64,
    pub liquidity_providing: f64,
    pub removing_liquidity: f64,
}

/// Year-keyed fee rates. `BTreeMap` so the latest year is cheap to find.
pub type FeeTable = BTreeMap<i32, Fee>;

/// Immutable per-run binding of the fee token and its year table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfiguration {
    pub token: FeeSide,
    pub table: FeeTable,
}

/// Fatal fee-payment failure: both balances together cannot cover the charge.
#[derive(Debug, Error, PartialEq)]
#[error("({timestamp}) ran out of funds to pay gas fees")]
pub struct InsufficientFunds {
    pub timestamp: NaiveDateTime,
}

impl FeeConfiguration {
    /// Fee rates for `year`: exact match, or the latest year present.
    ///
    /// The table is historical data; querying past its end returns the final
    /// entry rather than extrapolating.
    pub fn rate_for_year(&self, year: i32) -> &Fee {
        self.table.get(&year).unwrap_or_else(|| {
            self.table
                .values()
                .next_back()
                .expect("fee table is never empty")
        })
    }

    /// Deduct `amount` (fee-token units) from the wallet.
    ///
    /// When the fee-token balance covers the amount it is deducted in full.
    /// Otherwise the fee-token balance is drained and the shortfall is
    /// converted into the other token at `price` (base per quote): a base
    /// shortfall costs `shortfall / price` in quote, a quote shortfall costs
    /// `shortfall * price` in base. Returns `(base_spent, quote_spent)`.
    pub fn charge(
        &self,
        amount: f64,
        price: f64,
        timestamp: NaiveDateTime,
        wallet: &mut Wallet,
    ) -> Result<(f64, f64), InsufficientFunds> {
        let fee_balance = match self.token {
            FeeSide::Base => wallet.base,
            FeeSide::Quote => wallet.quote,
        };

        if fee_balance >= amount {
            info!("({timestamp}) subtracting {amount} gas fee from the fee token balance");
            return Ok(match self.token {
                FeeSide::Base => {
                    wallet.base -= amount;
                    (amount, 0.0)
                }
                FeeSide::Quote => {
                    wallet.quote -= amount;
                    (0.0, amount)
                }
            });
        }

        let shortfall = amount - fee_balance;
        match self.token {
            FeeSide::Base => {
                let quote_needed = shortfall / price;
                if wallet.quote < quote_needed {
                    return Err(InsufficientFunds { timestamp });
                }
                wallet.quote -= quote_needed;
                wallet.base = 0.0;
                info!(
                    "({timestamp}) paid {fee_balance} base and {quote_needed} quote in gas fees"
                );
                Ok((fee_balance, quote_needed))
            }
            FeeSide::Quote => {
                let base_needed = shortfall * price;
                if wallet.base < base_needed {
                    return Err(InsufficientFunds { timestamp });
                }
                wallet.base -= base_needed;
                wallet.quote = 0.0;
                info!(
                    "({timestamp}) paid {fee_balance} quote and {base_needed} base in gas fees"
                );
                Ok((base_needed, fee_balance))
            }
        }
    }
}
