//! One-shot pipeline runs shared by the HTTP triggers and the CLI.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{error, info};

use watchman::{
    HttpFetcher, PgTickerSource, PostgresWarehouse, RedditClient, RedditPipeline, ReqwestFetcher, RunContext,
    RunSummary, SinkLoader, Source, StaticTickers, TickerSource, TwitterClient, TwitterPipeline, Warehouse,
    WatchmanError, YahooFinanceClient, YahooFinancePipeline,
};

use crate::config::Config;

/// Builds a fresh client and pipeline per run from shared configuration.
///
/// A Reddit client is rebuilt for every run, so each run authenticates once
/// and no session outlives it.
#[derive(Clone)]
pub struct Watchman {
    config: Arc<Config>,
    fetcher: Arc<dyn HttpFetcher>,
    warehouse: Arc<dyn Warehouse>,
    tickers: Arc<dyn TickerSource>,
}

impl Watchman {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn HttpFetcher>,
        warehouse: Arc<dyn Warehouse>,
        tickers: Arc<dyn TickerSource>,
    ) -> Self {
        Self {
            config,
            fetcher,
            warehouse,
            tickers,
        }
    }

    /// Production wiring: reqwest fetcher and PostgreSQL warehouse over `pool`.
    ///
    /// Tickers come from `YF_TICKERS` when set, otherwise from cashtag counts
    /// in the tweets table.
    pub fn connect(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let fetcher = Arc::new(ReqwestFetcher::new(config.http_timeout)?);
        let tickers: Arc<dyn TickerSource> = match &config.static_tickers {
            Some(list) => Arc::new(StaticTickers::new(list.clone())),
            None => Arc::new(PgTickerSource::new(
                pool.clone(),
                config.tables.tweets.clone(),
                config.ticker_variants_table.clone(),
            )),
        };
        let warehouse = Arc::new(PostgresWarehouse::from_pool(pool));

        Ok(Self::new(Arc::new(config), fetcher, warehouse, tickers))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run_reddit(&self) -> watchman::Result<RunSummary> {
        let credentials = self
            .config
            .reddit_credentials
            .clone()
            .ok_or_else(|| missing("REDDIT_CLIENT_ID, REDDIT_CLIENT_SECRET, REDDIT_USERNAME and REDDIT_PASSWORD"))?;

        let client = RedditClient::new(self.fetcher.clone(), credentials, self.config.reddit.clone());
        RedditPipeline::new(client, self.loader(), self.config.tables.clone())
            .run(&RunContext::new(Source::Reddit))
            .await
    }

    pub async fn run_twitter(&self) -> watchman::Result<RunSummary> {
        let token = self
            .config
            .twitter_bearer_token
            .clone()
            .ok_or_else(|| missing("TWITTER_BEARER_TOKEN"))?;

        let client = TwitterClient::new(self.fetcher.clone(), token, self.config.twitter.clone());
        TwitterPipeline::new(client, self.loader(), self.config.tables.clone())
            .run(&RunContext::new(Source::Twitter))
            .await
    }

    pub async fn run_yahoo_finance(&self, round: usize) -> watchman::Result<RunSummary> {
        let api_key = self
            .config
            .yahoo_finance_api_key
            .clone()
            .ok_or_else(|| missing("YAHOO_FINANCE_API_KEY"))?;

        let client = YahooFinanceClient::new(self.fetcher.clone(), api_key, self.config.yahoo_finance.clone());
        YahooFinancePipeline::new(client, self.tickers.clone(), self.loader(), self.config.tables.clone())
            .run(&RunContext::new(Source::YahooFinance), round)
            .await
    }

    /// Run `source` and render the outcome as the plain-text trigger response.
    ///
    /// Never fails: pipeline errors are logged and turned into text.
    pub async fn trigger(&self, source: Source, round: Option<usize>) -> String {
        let result = match source {
            Source::Reddit => self.run_reddit().await,
            Source::Twitter => self.run_twitter().await,
            Source::YahooFinance => self.run_yahoo_finance(round.unwrap_or(1)).await,
        };
        render(source, result)
    }

    fn loader(&self) -> SinkLoader<Arc<dyn Warehouse>> {
        SinkLoader::new(self.warehouse.clone())
    }
}

fn missing(vars: &str) -> WatchmanError {
    WatchmanError::Config(format!("{} not configured", vars))
}

/// Plain-text response for a finished run.
pub fn render(source: Source, result: watchman::Result<RunSummary>) -> String {
    match result {
        Ok(summary) => {
            info!(%summary, "Run finished");
            summary.to_string()
        }
        Err(e) => {
            error!(source = %source, error = %e, "Run failed");
            format!("Watchman {} run failed: {}", source, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use watchman::testing::{close_series, trending, tweet, twitter_page, twitter_user, MockFetcher};
    use watchman::MemoryWarehouse;

    fn config(vars: &[(&str, &str)]) -> Config {
        let mut map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        map.insert("DATABASE_URL".into(), "postgres://localhost/watchman".into());
        map.insert("TWITTER_PAGE_DELAY_MS".into(), "0".into());
        map.insert("YF_TRENDING_REGIONS".into(), "US".into());
        Config::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    fn runner(config: Config, mock: &MockFetcher, warehouse: &Arc<MemoryWarehouse>) -> Watchman {
        Watchman::new(
            Arc::new(config),
            Arc::new(mock.clone()),
            warehouse.clone(),
            Arc::new(StaticTickers::new(["AAPL", "MSFT"])),
        )
    }

    #[tokio::test]
    async fn test_missing_credentials_become_error_text() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let mock = MockFetcher::new();
        let runner = runner(config(&[]), &mock, &warehouse);

        let text = runner.trigger(Source::Twitter, None).await;

        assert_eq!(
            text,
            "Watchman twitter run failed: config error: TWITTER_BEARER_TOKEN not configured"
        );
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_twitter_trigger_reports_loaded_rows() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let mock = MockFetcher::new();
        mock.push_json(
            "https://api.twitter.com/2/tweets/search/recent",
            &twitter_page(vec![tweet("1", "9"), tweet("2", "9")], vec![twitter_user("9", "bull")], None),
        );
        let runner = runner(config(&[("TWITTER_BEARER_TOKEN", "tok")]), &mock, &warehouse);

        let text = runner.trigger(Source::Twitter, None).await;

        assert!(text.starts_with("Watchman twitter run"), "{}", text);
        assert!(text.contains("tweets=2"), "{}", text);
    }

    #[tokio::test]
    async fn test_yahoo_trigger_defaults_to_first_round() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let mock = MockFetcher::new();
        mock.push_json(
            "https://yfapi.net/v8/finance/spark",
            &serde_json::json!({
                "AAPL": close_series("AAPL", &[(1_704_067_200, 185.6)]),
                "MSFT": close_series("MSFT", &[(1_704_067_200, 370.9)]),
            }),
        );
        mock.push_json("https://yfapi.net/v1/finance/trending/US", &trending(&["NVDA"]));
        let runner = runner(config(&[("YAHOO_FINANCE_API_KEY", "key")]), &mock, &warehouse);

        let text = runner.trigger(Source::YahooFinance, None).await;

        assert!(text.contains("close_price=2"), "{}", text);
        assert!(text.contains("trending=1"), "{}", text);
        assert_eq!(warehouse.row_count(&runner.config().tables.trending), 1);
    }
}
