//! Price feed — the per-bar (timestamp, price) series a run is driven by,
//! with the backward-looking window queries the volatility-reactive policies
//! rely on.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One (timestamp, price) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

/// Errors from constructing a series.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("price series is empty")]
    Empty,
    #[error("bars out of order at index {index}: {current} after {previous}")]
    OutOfOrder {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
    #[error("non-positive price {price} at index {index}")]
    NonPositivePrice { index: usize, price: f64 },
}

/// Timestamp-ordered price series.
///
/// Window queries take an `upto` index so callers cannot read past the bar
/// currently being processed — look-ahead is ruled out structurally, not by
/// convention.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting empty input, out-of-order timestamps, and
    /// non-positive prices.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        if points.is_empty() {
            return Err(SeriesError::Empty);
        }
        for (i, point) in points.iter().enumerate() {
            if point.price <= 0.0 {
                return Err(SeriesError::NonPositivePrice {
                    index: i,
                    price: point.price,
                });
            }
            if i > 0 && point.timestamp < points[i - 1].timestamp {
                return Err(SeriesError::OutOfOrder {
                    index: i,
                    previous: points[i - 1].timestamp,
                    current: point.timestamp,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> PricePoint {
        self.points[index]
    }

    pub fn first_timestamp(&self) -> NaiveDateTime {
        self.points[0].timestamp
    }

    /// Largest price move inside `[now - window, now]`, as
    /// `(highest - lowest) / highest * 100`. Only bars up to `upto` are
    /// visible. Returns 0 for windows holding fewer than two samples.
    pub fn max_change_percent_in_window(
        &self,
        upto: usize,
        now: NaiveDateTime,
        window: Duration,
    ) -> f64 {
        let from = now - window;
        let mut highest = f64::MIN;
        let mut lowest = f64::MAX;
        let mut seen = 0usize;
        for point in &self.points[..=upto.min(self.points.len() - 1)] {
            if point.timestamp >= from && point.timestamp <= now {
                highest = highest.max(point.price);
                lowest = lowest.min(point.price);
                seen += 1;
            }
        }
        if seen < 2 || highest <= 0.0 {
            return 0.0;
        }
        (highest - lowest) / highest * 100.0
    }

    /// Mean of the per-day max change for each of the last `days` days:
    /// day i's window is the 24 h ending at `now - (i-1) days`.
    pub fn average_max_daily_change(&self, upto: usize, days: u32, now: NaiveDateTime) -> f64 {
        if days == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 1..=days {
            let day_end = now - Duration::days(i as i64 - 1);
            sum += self.max_change_percent_in_window(upto, day_end, Duration::days(1));
        }
        sum / days as f64
    }
}
