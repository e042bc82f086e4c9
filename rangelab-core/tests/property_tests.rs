//! Property tests for the stateless math the policies are built on.
//!
//! Uses proptest to verify:
//! 1. Symmetric bounds are log-symmetric around the center
//! 2. Asymmetric bounds round-trip back to their percent widths
//! 3. Fee-year lookup never extrapolates past the table
//! 4. Fee charging conserves value whenever it succeeds
//! 5. Partial-rebalance withdraw fractions are monotonic in the index

use chrono::NaiveDate;
use proptest::prelude::*;

use rangelab_core::domain::{FeeSide, Wallet};
use rangelab_core::fees::{Fee, FeeConfiguration, FeeTable};
use rangelab_core::range;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (0.01..50_000.0_f64).prop_map(|p| (p * 1000.0).round() / 1000.0)
}

fn arb_range_pct() -> impl Strategy<Value = f64> {
    (0.1..80.0_f64).prop_map(|r| (r * 100.0).round() / 100.0)
}

fn arb_down_pct() -> impl Strategy<Value = f64> {
    0.1..99.0_f64
}

// ── 1. Symmetric bounds ──────────────────────────────────────────────

proptest! {
    /// lower < center < upper, and upper/center == center/lower.
    #[test]
    fn symmetric_bounds_are_log_symmetric(center in arb_price(), range_pct in arb_range_pct()) {
        let (lower, upper) = range::symmetric_bounds(center, range_pct).unwrap();
        prop_assert!(lower < center && center < upper);
        let up_ratio = upper / center;
        let down_ratio = center / lower;
        prop_assert!((up_ratio - down_ratio).abs() < 1e-9 * up_ratio);
    }
}

// ── 2. Asymmetric bounds round-trip ──────────────────────────────────

proptest! {
    /// Recomputing the percent widths from the bounds reproduces the inputs.
    #[test]
    fn asymmetric_bounds_round_trip(
        center in arb_price(),
        down_pct in arb_down_pct(),
        up_pct in 0.1..200.0_f64,
    ) {
        let (lower, upper) = range::asymmetric_bounds(center, down_pct, up_pct).unwrap();
        let recovered_down = (center - lower) / center * 100.0;
        let recovered_up = (upper - center) / center * 100.0;
        prop_assert!((recovered_down - down_pct).abs() < 1e-6);
        prop_assert!((recovered_up - up_pct).abs() < 1e-6);
    }
}

// ── 3. Fee-year lookup ───────────────────────────────────────────────

fn sample_table() -> FeeTable {
    let mut table = FeeTable::new();
    for (year, rate) in [(2020, 1.0), (2021, 2.0), (2023, 3.0)] {
        table.insert(
            year,
            Fee {
                swap_in: rate,
                liquidity_providing: rate * 2.0,
                removing_liquidity: rate * 1.5,
            },
        );
    }
    table
}

proptest! {
    /// Any year at or past the table max resolves to the max-year entry, and
    /// looking the answer up again changes nothing.
    #[test]
    fn rate_for_year_never_extrapolates(year in 2023i32..3000) {
        let config = FeeConfiguration { token: FeeSide::Base, table: sample_table() };
        let rate = config.rate_for_year(year);
        prop_assert_eq!(rate.swap_in, 3.0);
        // Idempotent: the resolved year's entry resolves to itself.
        prop_assert_eq!(config.rate_for_year(2023).swap_in, rate.swap_in);
    }

}

/// Years inside the table resolve exactly; gaps fall back to the latest.
#[test]
fn rate_for_year_prefers_exact_match() {
    let config = FeeConfiguration {
        token: FeeSide::Base,
        table: sample_table(),
    };
    assert_eq!(config.rate_for_year(2020).swap_in, 1.0);
    assert_eq!(config.rate_for_year(2021).swap_in, 2.0);
    // 2022 is missing: latest year wins, no interpolation.
    assert_eq!(config.rate_for_year(2022).swap_in, 3.0);
}

// ── 4. Fee charge conservation ───────────────────────────────────────

proptest! {
    /// Whenever both balances together can cover the charge, the value
    /// deducted equals the fee amount (in fee-token units), and the charge
    /// fails exactly when they cannot.
    #[test]
    fn charge_conserves_value_or_fails(
        amount in 0.1..100.0_f64,
        base_balance in 0.0..150.0_f64,
        quote_balance in 0.0..150.0_f64,
        price in 0.5..10.0_f64,
    ) {
        let config = FeeConfiguration { token: FeeSide::Base, table: sample_table() };
        let timestamp = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut wallet = Wallet::new(base_balance, quote_balance);

        let total_in_base = base_balance + quote_balance * price;
        match config.charge(amount, price, timestamp, &mut wallet) {
            Ok((base_spent, quote_spent)) => {
                prop_assert!((base_spent + quote_spent * price - amount).abs() < 1e-9);
                prop_assert!(wallet.base >= -1e-9 && wallet.quote >= -1e-9);
            }
            Err(_) => {
                // Only legal when the combined balances fall short.
                prop_assert!(total_in_base < amount + 1e-6);
            }
        }
    }
}

// ── 5. Withdraw fraction monotonicity ────────────────────────────────

proptest! {
    /// (i+1)/division is strictly increasing in i and hits 1 at the last
    /// threshold.
    #[test]
    fn withdraw_fractions_increase_to_one(division in 1u32..20) {
        let fractions: Vec<f64> = (0..division as usize)
            .map(|i| (i as f64 + 1.0) / division as f64)
            .collect();
        for pair in fractions.windows(2) {
            prop_assert!(pair[1] > pair[0]);
        }
        prop_assert!((fractions.last().unwrap() - 1.0).abs() < 1e-12);
    }
}

// ── Displacement measure edge cases ──────────────────────────────────

proptest! {
    /// Displacement is 0 at the start price, 100 outside the bounds, and
    /// within (0, 100) strictly inside.
    #[test]
    fn displacement_is_bounded(
        start in 50.0..150.0_f64,
        offset in -0.99..0.99_f64,
    ) {
        let (lower, upper) = (40.0, 160.0);
        let current = start + offset * (if offset >= 0.0 { upper - start } else { start - lower });
        let d = range::displacement_percent(lower, upper, start, current);
        prop_assert!((0.0..=100.0).contains(&d));
    }
}
