//! Built-in historical gas fee schedules, keyed by chain and token family.
//!
//! Each chain lists (symbol set, year table) pairs in priority order. Native
//! token sets come first: for an ETH/USDC pool the ETH table wins only because
//! it is listed before the USD table.

use crate::domain::{Chain, FeeSide, PoolConfig};
use crate::fees::{Fee, FeeConfiguration, FeeTable};

fn fee(swap_in: f64, providing: f64, removing: f64) -> Fee {
    Fee {
        swap_in,
        liquidity_providing: providing,
        removing_liquidity: removing,
    }
}

fn ethereum_native() -> FeeTable {
    FeeTable::from([
        (2015, fee(0.00627367, 0.01886801, 0.01072989)),
        (2016, fee(0.00469774, 0.01412843, 0.00803458)),
        (2017, fee(0.00336409, 0.01011747, 0.00575361)),
        (2018, fee(0.00285333, 0.00858136, 0.00488006)),
        (2019, fee(0.00223397, 0.00671864, 0.00382077)),
        (2020, fee(0.00835881, 0.02513907, 0.01429612)),
        (2021, fee(0.01450546, 0.04362507, 0.02480876)),
        (2022, fee(0.00670571, 0.02016738, 0.01146881)),
        (2023, fee(0.00512012, 0.01539873, 0.00875697)),
    ])
}

fn ethereum_usd() -> FeeTable {
    FeeTable::from([
        (2015, fee(11.48, 34.53, 19.64)),
        (2016, fee(8.60, 25.86, 14.70)),
        (2017, fee(6.16, 18.51, 10.53)),
        (2018, fee(5.22, 15.70, 8.93)),
        (2019, fee(4.09, 12.30, 6.99)),
        (2020, fee(15.30, 46.00, 26.16)),
        (2021, fee(26.54, 79.83, 45.40)),
        (2022, fee(12.27, 36.91, 20.99)),
        (2023, fee(9.37, 28.18, 16.03)),
    ])
}

fn arbitrum_native() -> FeeTable {
    FeeTable::from([(2015, fee(0.00007979, 0.00013726, 0.00011422))])
}

fn arbitrum_usd() -> FeeTable {
    FeeTable::from([(2015, fee(0.15, 0.25, 0.21))])
}

/// Priority-ordered (symbol set, table) pairs for a chain.
fn schedule_for_chain(chain: Chain) -> Vec<(&'static [&'static str], FeeTable)> {
    match chain {
        Chain::Ethereum => vec![
            (&["eth", "weth"][..], ethereum_native()),
            (&["usd", "usdc"][..], ethereum_usd()),
        ],
        Chain::Arbitrum => vec![
            (&["arb"][..], arbitrum_native()),
            (&["usd", "usdc"][..], arbitrum_usd()),
        ],
    }
}

/// Find the fee configuration for a pool, or `None` when no symbol set
/// matches either pool token (the caller degrades to zero-fee mode).
///
/// The first set with a non-empty intersection wins; the fee token is the
/// base token if it matched, otherwise the quote token.
pub fn lookup(pool: &PoolConfig) -> Option<FeeConfiguration> {
    let base_symbol = pool.base.symbol.to_lowercase();
    let quote_symbol = pool.quote.symbol.to_lowercase();

    for (symbols, table) in schedule_for_chain(pool.chain) {
        let base_matches = symbols.contains(&base_symbol.as_str());
        let quote_matches = symbols.contains(&quote_symbol.as_str());
        if base_matches || quote_matches {
            let token = if base_matches {
                FeeSide::Base
            } else {
                FeeSide::Quote
            };
            return Some(FeeConfiguration { token, table });
        }
    }
    None
}
