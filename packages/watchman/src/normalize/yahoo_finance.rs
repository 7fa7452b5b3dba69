use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::utc_date_from_epoch;
use crate::error::Result;
use crate::records::{ClosePrice, NotFoundCause, TickerNotFound, TrendingTicker};

/// Per-symbol series of the close-price endpoint, keyed by symbol.
///
/// `timestamp` and `close` may be absent or `null` for a symbol with no data.
#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

impl Series {
    fn prices(&self, ticker: &str) -> Result<Vec<ClosePrice>> {
        let closes = self.close.as_deref().unwrap_or_default();
        self.timestamp
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, &ts)| {
                Ok(ClosePrice {
                    day: utc_date_from_epoch(ts)?,
                    ticker: ticker.to_string(),
                    close_price: closes.get(i).copied().flatten(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TrendingBody {
    finance: Finance,
}

#[derive(Debug, Deserialize)]
struct Finance {
    #[serde(default)]
    result: Vec<TrendingResult>,
}

#[derive(Debug, Deserialize)]
struct TrendingResult {
    #[serde(default)]
    quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    symbol: String,
}

/// Close prices of one batch plus the requested tickers that had none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloseBatch {
    pub prices: Vec<ClosePrice>,
    pub not_found: Vec<TickerNotFound>,
}

impl CloseBatch {
    /// Every ticker of a batch that failed outright.
    pub fn failed(tickers: &[String], day: NaiveDate) -> Self {
        Self {
            prices: Vec::new(),
            not_found: tickers
                .iter()
                .map(|ticker| TickerNotFound {
                    day,
                    ticker: ticker.clone(),
                    cause: NotFoundCause::YahooFinanceError,
                })
                .collect(),
        }
    }
}

/// Normalize a close-price body for the tickers that were requested.
///
/// Output follows request order. A series is found by its key or, failing
/// that, by its `symbol` field. Timestamps become UTC dates; a `null` close
/// stays null. Each series is decoded on its own. A requested ticker whose
/// series is missing, empty or unreadable lands in `not_found` stamped with
/// `day`.
pub fn normalize_close_prices(body: &str, requested: &[String], day: NaiveDate) -> Result<CloseBatch> {
    let raw: BTreeMap<String, Value> = serde_json::from_str(body)?;
    let series: BTreeMap<String, Option<Series>> = raw
        .into_iter()
        .map(|(key, value)| {
            let decoded = serde_json::from_value::<Series>(value)
                .map_err(|e| debug!(symbol = %key, error = %e, "Unreadable series"))
                .ok();
            (key, decoded)
        })
        .collect();
    let mut batch = CloseBatch::default();

    for ticker in requested {
        let found = match series.get(ticker) {
            Some(entry) => entry.as_ref(),
            None => series
                .values()
                .flatten()
                .find(|s| s.symbol.as_deref() == Some(ticker.as_str())),
        };

        let points = match found.map(|s| s.prices(ticker)) {
            Some(Ok(points)) => points,
            Some(Err(e)) => {
                debug!(ticker = %ticker, error = %e, "Series with unreadable timestamps");
                Vec::new()
            }
            None => Vec::new(),
        };

        if points.is_empty() {
            batch.not_found.push(TickerNotFound {
                day,
                ticker: ticker.clone(),
                cause: NotFoundCause::NotFound,
            });
        } else {
            batch.prices.extend(points);
        }
    }

    Ok(batch)
}

/// Normalize a trending body for one region. No results yields no rows.
pub fn normalize_trending(body: &str, region: &str, day: NaiveDate) -> Result<Vec<TrendingTicker>> {
    let parsed: TrendingBody = serde_json::from_str(body)?;

    let Some(first) = parsed.finance.result.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(first
        .quotes
        .into_iter()
        .map(|q| TrendingTicker {
            day,
            ticker: q.symbol,
            region: region.to_string(),
        })
        .collect())
}
