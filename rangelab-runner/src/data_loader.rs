//! CSV price-series loading.
//!
//! Expects a `timestamp,price` header; timestamps are `YYYY-MM-DDTHH:MM:SS`
//! (or with a space separator), prices are base-per-quote. Rows outside the
//! configured date window are dropped; ordering and positivity are enforced
//! by the core series constructor.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use rangelab_core::series::{PricePoint, PriceSeries, SeriesError};

/// Errors from loading price data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open data file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("bad CSV record: {0}")]
    Csv(#[from] csv::Error),
    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),
    #[error("no bars inside the {start}..={end} window")]
    EmptyWindow { start: NaiveDate, end: NaiveDate },
    #[error(transparent)]
    Series(#[from] SeriesError),
}

#[derive(Debug, Deserialize)]
struct RawRow {
    timestamp: String,
    price: f64,
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, LoadError> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    Err(LoadError::BadTimestamp(raw.to_string()))
}

/// Load the bars of `path` that fall inside the inclusive date window.
pub fn load_price_series(
    path: &Path,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<PriceSeries, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut points = Vec::new();
    for record in reader.deserialize() {
        let row: RawRow = record?;
        let timestamp = parse_timestamp(&row.timestamp)?;
        let date = timestamp.date();
        if date < start_date || date > end_date {
            continue;
        }
        points.push(PricePoint {
            timestamp,
            price: row.price,
        });
    }

    if points.is_empty() {
        return Err(LoadError::EmptyWindow {
            start: start_date,
            end: end_date,
        });
    }
    info!(
        "loaded {} bars from {} ({start_date} to {end_date})",
        points.len(),
        path.display()
    );
    Ok(PriceSeries::from_points(points)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn loads_rows_inside_the_window() {
        let file = write_csv(
            "timestamp,price\n\
             2023-01-01T00:00:00,100.0\n\
             2023-01-01T00:01:00,101.0\n\
             2023-01-02T00:00:00,102.0\n",
        );
        let series = load_price_series(file.path(), day(1), day(1)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(1).price, 101.0);
    }

    #[test]
    fn accepts_space_separated_timestamps() {
        let file = write_csv("timestamp,price\n2023-01-01 12:30:00,99.5\n");
        let series = load_price_series(file.path(), day(1), day(1)).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn empty_window_is_an_error() {
        let file = write_csv("timestamp,price\n2023-01-01T00:00:00,100.0\n");
        let err = load_price_series(file.path(), day(5), day(6)).unwrap_err();
        assert!(matches!(err, LoadError::EmptyWindow { .. }));
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let file = write_csv("timestamp,price\nnot-a-time,100.0\n");
        assert!(matches!(
            load_price_series(file.path(), day(1), day(1)).unwrap_err(),
            LoadError::BadTimestamp(_)
        ));
    }

    #[test]
    fn out_of_order_rows_are_rejected() {
        let file = write_csv(
            "timestamp,price\n\
             2023-01-01T00:05:00,100.0\n\
             2023-01-01T00:00:00,101.0\n",
        );
        assert!(matches!(
            load_price_series(file.path(), day(1), day(1)).unwrap_err(),
            LoadError::Series(SeriesError::OutOfOrder { .. })
        ));
    }
}
