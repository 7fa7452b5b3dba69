//! Response normalizers.
//!
//! Each source decodes its body into serde wire types where every field the
//! API may omit is an `Option` or defaults to empty, then maps those into the
//! typed records of [`crate::records`]. All functions here are pure: the same
//! body always produces the same records.

pub mod reddit;
pub mod twitter;
pub mod yahoo_finance;

pub use reddit::{normalize_listing, oldest_fullname};
pub use twitter::{normalize_search_page, SearchPage};
pub use yahoo_finance::{normalize_close_prices, normalize_trending, CloseBatch};

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::WatchmanError;

/// Epoch seconds (possibly fractional) as a UTC instant.
pub(crate) fn utc_from_epoch(secs: f64) -> Result<DateTime<Utc>, WatchmanError> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    if !whole.is_finite() || whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(out_of_range(secs));
    }
    DateTime::from_timestamp(whole as i64, nanos).ok_or_else(|| out_of_range(secs))
}

/// Epoch seconds as a UTC calendar date.
pub(crate) fn utc_date_from_epoch(secs: i64) -> Result<NaiveDate, WatchmanError> {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.date_naive())
        .ok_or_else(|| out_of_range(secs as f64))
}

fn out_of_range(secs: f64) -> WatchmanError {
    WatchmanError::Decode(serde::de::Error::custom(format!(
        "timestamp {} out of range",
        secs
    )))
}
