use tracing::{info, Instrument};

use super::RunSummary;
use crate::config::TableNames;
use crate::context::{RunContext, Source};
use crate::error::{Result, WatchmanError};
use crate::result_set::ResultSet;
use crate::sink::{SinkLoader, Warehouse};
use crate::sources::TwitterClient;

/// Recent tweets for the configured hashtags into `tweets`.
pub struct TwitterPipeline<W> {
    client: TwitterClient,
    loader: SinkLoader<W>,
    tables: TableNames,
}

impl<W: Warehouse> TwitterPipeline<W> {
    pub fn new(client: TwitterClient, loader: SinkLoader<W>, tables: TableNames) -> Self {
        Self { client, loader, tables }
    }

    /// Search from `started_at - lookback` and append every tweet found.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunSummary> {
        if ctx.source != Source::Twitter {
            return Err(WatchmanError::Config(format!("twitter pipeline given a {} context", ctx.source)));
        }

        async {
            let lookback = chrono::Duration::from_std(self.client.settings().lookback)
                .map_err(|e| WatchmanError::Config(format!("twitter lookback: {}", e)))?;
            let start_time = ctx.started_at - lookback;

            let tweets = self.client.search(start_time).await?;
            let records: ResultSet<_> = tweets.into_iter().collect();
            info!(rows = records.len(), duplicates = records.duplicates(), "Tweets accumulated");

            let mut summary = RunSummary::new(ctx);
            let loaded = self.loader.append(&self.tables.tweets, &records).await?;
            summary.record_load(&self.tables.tweets, loaded);
            Ok(summary)
        }
        .instrument(ctx.span())
        .await
    }
}
