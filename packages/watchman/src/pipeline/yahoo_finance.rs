use std::sync::Arc;
use tracing::{info, Instrument};

use super::tickers::{apply_variants, round_slice, TickerSource};
use super::RunSummary;
use crate::config::TableNames;
use crate::context::{RunContext, Source};
use crate::error::{Result, WatchmanError};
use crate::result_set::ResultSet;
use crate::sink::{SinkLoader, Warehouse};
use crate::sources::YahooFinanceClient;

/// Close prices (upserted through the delta table), tickers not found, and
/// on the first round of the day, trending tickers.
pub struct YahooFinancePipeline<W> {
    client: YahooFinanceClient,
    tickers: Arc<dyn TickerSource>,
    loader: SinkLoader<W>,
    tables: TableNames,
}

impl<W: Warehouse> YahooFinancePipeline<W> {
    pub fn new(
        client: YahooFinanceClient,
        tickers: Arc<dyn TickerSource>,
        loader: SinkLoader<W>,
        tables: TableNames,
    ) -> Self {
        Self {
            client,
            tickers,
            loader,
            tables,
        }
    }

    /// Run round `round` (1-based) of the configured daily rounds.
    pub async fn run(&self, ctx: &RunContext, round: usize) -> Result<RunSummary> {
        if ctx.source != Source::YahooFinance {
            return Err(WatchmanError::Config(format!(
                "yahoo finance pipeline given a {} context",
                ctx.source
            )));
        }

        async {
            let settings = self.client.settings();
            let day = ctx.day();
            let mut summary = RunSummary::new(ctx);

            let total = settings.daily_tickers();
            let ranked = self.tickers.most_discussed(total).await?;
            let slice = round_slice(&ranked, round, settings.rounds, total)?;
            let variants = self.tickers.variants(slice).await?;
            let tickers = apply_variants(slice, &variants);
            info!(round, rounds = settings.rounds, tickers = tickers.len(), "Ticker universe resolved");

            let fetched = self.client.close_prices(&tickers, day).await;
            let prices: ResultSet<_> = fetched.batch.prices.into_iter().collect();
            let not_found: ResultSet<_> = fetched.batch.not_found.into_iter().collect();
            summary.record_failures(fetched.failures);

            let merged = self
                .loader
                .upsert_via_delta(&self.tables.close_price_delta, &self.tables.close_price, &prices)
                .await?;
            summary.record_load(&self.tables.close_price, merged);

            let loaded = self.loader.append(&self.tables.ticker_not_found, &not_found).await?;
            summary.record_load(&self.tables.ticker_not_found, loaded);

            if round == 1 {
                let trending = self.client.trending(day).await;
                let records: ResultSet<_> = trending.records.into_iter().collect();
                let loaded = self.loader.append(&self.tables.trending, &records).await?;
                summary.record_load(&self.tables.trending, loaded);
                summary.record_failures(trending.failures);
            }

            Ok(summary)
        }
        .instrument(ctx.span())
        .await
    }
}
