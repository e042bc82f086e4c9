//! Range math — stateless conversions between a center price, percent widths,
//! and quote-price bounds, plus the displacement measures that drive
//! threshold-based rebalancing.
//!
//! All percent arguments are whole percents (5.0 = 5%), matching how the
//! strategies are configured.

use thiserror::Error;

/// Errors from range construction.
#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    #[error("range percent must be positive, got {0}")]
    NonPositiveRange(f64),
    #[error("down percent must be below 100 to keep the lower bound positive, got {0}")]
    DownPercentTooLarge(f64),
    #[error("out-of-range threshold must be in (0, 100], got {0}")]
    ThresholdOutOfBounds(f64),
}

/// Bounds of a symmetric range around `center`.
///
/// `lower = center / (1 + r)`, `upper = center * (1 + r)` — symmetric in log
/// space, so `upper / center == center / lower`.
pub fn symmetric_bounds(center: f64, range_pct: f64) -> Result<(f64, f64), RangeError> {
    if range_pct <= 0.0 {
        return Err(RangeError::NonPositiveRange(range_pct));
    }
    let r = range_pct / 100.0;
    Ok((center / (1.0 + r), center * (1.0 + r)))
}

/// Bounds of an asymmetric range: `lower = center * (1 - down/100)`,
/// `upper = center * (1 + up/100)`.
///
/// A down percent of 100 or more would produce a non-positive lower bound and
/// is rejected.
pub fn asymmetric_bounds(center: f64, down_pct: f64, up_pct: f64) -> Result<(f64, f64), RangeError> {
    if down_pct <= 0.0 {
        return Err(RangeError::NonPositiveRange(down_pct));
    }
    if up_pct <= 0.0 {
        return Err(RangeError::NonPositiveRange(up_pct));
    }
    if down_pct >= 100.0 {
        return Err(RangeError::DownPercentTooLarge(down_pct));
    }
    Ok((
        center * (1.0 - down_pct / 100.0),
        center * (1.0 + up_pct / 100.0),
    ))
}

/// Validate an out-of-range threshold: must be in `(0, 100]`.
///
/// 100 means "react only once fully out of range"; 50 means "react halfway
/// between the reference price and the bound".
pub fn validate_threshold(threshold: f64) -> Result<f64, RangeError> {
    if threshold <= 0.0 || threshold > 100.0 {
        return Err(RangeError::ThresholdOutOfBounds(threshold));
    }
    Ok(threshold)
}

/// How far `current` has moved from `start` toward the bound in its direction
/// of travel, as a percent of that half-width.
///
/// Returns 0 when `current == start`, 100 once the price sits at or beyond
/// either bound. The measure is asymmetric: the up side is scaled by
/// `upper - start`, the down side by `start - lower`.
pub fn displacement_percent(lower: f64, upper: f64, start: f64, current: f64) -> f64 {
    if current == start {
        return 0.0;
    }
    if current <= lower || current >= upper {
        return 100.0;
    }
    if current > start {
        (current - start) / (upper - start) * 100.0
    } else {
        (start - current) / (start - lower) * 100.0
    }
}

/// True when the displacement from `start` exceeds the directional threshold.
///
/// Thresholds must have been validated with [`validate_threshold`]. Fully
/// out-of-range prices trip either threshold.
pub fn threshold_reached(
    lower: f64,
    upper: f64,
    start: f64,
    current: f64,
    threshold_up: f64,
    threshold_down: f64,
) -> bool {
    if current == start {
        return false;
    }
    if current <= lower || current >= upper {
        return true;
    }
    if current > start {
        displacement_percent(lower, upper, start, current) >= threshold_up
    } else {
        displacement_percent(lower, upper, start, current) >= threshold_down
    }
}

/// Midpoint-referenced out-of-range level, 0–100, measured between the range
/// midpoint and the bound on the side the price sits on.
///
/// Used by the extend-and-decrease policy, which reacts before the price
/// leaves the range entirely.
pub fn out_of_range_level(lower: f64, upper: f64, current: f64) -> f64 {
    let mid = (lower + upper) / 2.0;
    if current == mid {
        return 0.0;
    }
    if current < lower || current > upper {
        return 100.0;
    }
    let left_side = current < mid;
    let (range_start, range_end) = if left_side { (lower, mid) } else { (mid, upper) };
    let level = (current - range_start) / (range_end - range_start) * 100.0;
    if left_side {
        100.0 - level
    } else {
        level
    }
}

/// Upper bound of the block stacked on top of a block ending at `lower`.
///
/// Each block spans one symmetric range width, so extending upward from a
/// boundary multiplies by `(1 + r)` twice.
pub fn block_above(lower: f64, range_pct: f64) -> f64 {
    let r = range_pct / 100.0;
    lower * (1.0 + r) * (1.0 + r)
}

/// Lower bound of the block stacked underneath a block starting at `upper`.
pub fn block_below(upper: f64, range_pct: f64) -> f64 {
    let r = range_pct / 100.0;
    upper / (1.0 + r) / (1.0 + r)
}

/// How much base token must be freed (positive) or acquired (negative) so the
/// holdings match the token ratio an asymmetric position will mint at.
///
/// Works in base-per-quote terms inverted to quote-per-base, following the
/// standard sqrt-price deposit-ratio derivation: liquidity for one unit of
/// base between the current price and the upper base price fixes the quote
/// amount that must accompany each base unit.
pub fn base_diff_for_asymmetric_position(
    base_price: f64,
    base_balance: f64,
    total_capital_in_base: f64,
    lower_base_price: f64,
    upper_base_price: f64,
) -> f64 {
    let liquidity_base =
        (base_price.sqrt() * upper_base_price.sqrt()) / (upper_base_price.sqrt() - base_price.sqrt());
    let quote_per_base = liquidity_base * (base_price.sqrt() - lower_base_price.sqrt());
    let base_to_convert = (quote_per_base * total_capital_in_base) / (base_price + quote_per_base);

    total_capital_in_base - base_to_convert - base_balance
}
