use tracing::{info, Instrument};

use super::RunSummary;
use crate::config::TableNames;
use crate::context::{RunContext, Source};
use crate::error::{Result, WatchmanError};
use crate::result_set::ResultSet;
use crate::sink::{SinkLoader, Warehouse};
use crate::sources::RedditClient;

/// Newest posts into `reddit_new_posts`, hot posts into `reddit_hot_posts`.
pub struct RedditPipeline<W> {
    client: RedditClient,
    loader: SinkLoader<W>,
    tables: TableNames,
}

impl<W: Warehouse> RedditPipeline<W> {
    pub fn new(client: RedditClient, loader: SinkLoader<W>, tables: TableNames) -> Self {
        Self { client, loader, tables }
    }

    pub async fn run(&self, ctx: &RunContext) -> Result<RunSummary> {
        if ctx.source != Source::Reddit {
            return Err(WatchmanError::Config(format!("reddit pipeline given a {} context", ctx.source)));
        }

        async {
            let settings = self.client.settings();
            let mut summary = RunSummary::new(ctx);

            let new_posts = self
                .client
                .new_posts(&settings.communities, settings.max_new_posts)
                .await?;
            let records: ResultSet<_> = new_posts.records.into_iter().collect();
            info!(rows = records.len(), duplicates = records.duplicates(), "New posts accumulated");
            let loaded = self.loader.append(&self.tables.reddit_new_posts, &records).await?;
            summary.record_load(&self.tables.reddit_new_posts, loaded);
            summary.record_failures(new_posts.failures);

            let hot_posts = self.client.hot_posts(&settings.communities).await?;
            let records: ResultSet<_> = hot_posts.records.into_iter().collect();
            let loaded = self.loader.append(&self.tables.reddit_hot_posts, &records).await?;
            summary.record_load(&self.tables.reddit_hot_posts, loaded);
            summary.record_failures(hot_posts.failures);

            Ok(summary)
        }
        .instrument(ctx.span())
        .await
    }
}
