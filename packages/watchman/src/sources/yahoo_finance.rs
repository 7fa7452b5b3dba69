//! Yahoo Finance close prices and trending tickers.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use super::{excerpt, Harvest};
use crate::config::YahooFinanceSettings;
use crate::error::{Result, WatchmanError};
use crate::http::{FetchRequest, HttpFetcher};
use crate::normalize::{normalize_close_prices, normalize_trending, CloseBatch};
use crate::records::TrendingTicker;
use crate::security::SecretString;

const API_KEY_HEADER: &str = "x-api-key";

/// Every batch's close prices and not-found tickers, plus failed batches.
#[derive(Debug, Default)]
pub struct ClosePrices {
    pub batch: CloseBatch,
    pub failures: Vec<WatchmanError>,
}

pub struct YahooFinanceClient {
    fetcher: Arc<dyn HttpFetcher>,
    api_key: SecretString,
    settings: YahooFinanceSettings,
}

impl YahooFinanceClient {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, api_key: SecretString, settings: YahooFinanceSettings) -> Self {
        Self {
            fetcher,
            api_key,
            settings,
        }
    }

    pub fn settings(&self) -> &YahooFinanceSettings {
        &self.settings
    }

    /// Close prices for `tickers`, `symbols_per_request` at a time.
    ///
    /// A batch is retried up to `max_retry` times, counting both non-200
    /// responses and unreadable bodies as failures. A batch that never
    /// succeeds marks its tickers `yahoo_finance_error`; a ticker missing from
    /// a successful batch is marked `not_found`. Both are stamped with `day`.
    pub async fn close_prices(&self, tickers: &[String], day: NaiveDate) -> ClosePrices {
        let mut out = ClosePrices::default();
        let policy = self.settings.retry();

        for batch in tickers.chunks(self.settings.symbols_per_request.max(1)) {
            info!(tickers = ?batch, "Fetching close prices");

            let label = batch.join(",");
            let result = policy
                .run(&label, move |_attempt| async move { self.fetch_batch(batch, day).await })
                .await;

            match result {
                Ok(normalized) => {
                    out.batch.prices.extend(normalized.prices);
                    out.batch.not_found.extend(normalized.not_found);
                }
                Err(e) => {
                    warn!(tickers = %label, error = %e, "Close price batch failed");
                    out.batch.not_found.extend(CloseBatch::failed(batch, day).not_found);
                    out.failures.push(WatchmanError::partial(format!("close prices [{}]", label), e));
                }
            }
        }

        out
    }

    async fn fetch_batch(&self, batch: &[String], day: NaiveDate) -> Result<CloseBatch> {
        let request = FetchRequest::get(&self.settings.close_price_url)
            .secret_header(API_KEY_HEADER, self.api_key.clone())
            .query("interval", &self.settings.interval)
            .query("range", &self.settings.range)
            .query("symbols", batch.join(","));

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(WatchmanError::TransientFetch {
                url: request.url,
                status: response.status,
                body: excerpt(&response.body),
            });
        }

        normalize_close_prices(&response.body, batch, day)
    }

    /// Trending tickers for every configured region.
    ///
    /// A region that fails is logged and skipped; the others still run.
    pub async fn trending(&self, day: NaiveDate) -> Harvest<TrendingTicker> {
        let mut harvest = Harvest::default();

        for region in &self.settings.trending_regions {
            match self.fetch_trending(region, day).await {
                Ok(rows) => {
                    info!(region = %region, rows = rows.len(), "Fetched trending");
                    harvest.records.extend(rows);
                }
                Err(e) => {
                    warn!(region = %region, error = %e, "Trending region failed");
                    harvest.failures.push(WatchmanError::partial(format!("trending {}", region), e));
                }
            }
        }

        harvest
    }

    async fn fetch_trending(&self, region: &str, day: NaiveDate) -> Result<Vec<TrendingTicker>> {
        let url = format!("{}/{}", self.settings.trending_url.trim_end_matches('/'), region);
        let request = FetchRequest::get(url).secret_header(API_KEY_HEADER, self.api_key.clone());

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(WatchmanError::TransientFetch {
                url: request.url,
                status: response.status,
                body: excerpt(&response.body),
            });
        }

        normalize_trending(&response.body, region, day)
    }
}
