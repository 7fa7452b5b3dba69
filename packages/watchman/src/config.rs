//! Settings for each source and the destination tables.
//!
//! Defaults mirror the production deployment; the server overrides them from
//! the environment.

use std::time::Duration;

use crate::error::Result;
use crate::http::RetryPolicy;
use crate::sink::TableId;

/// Yahoo Finance accepts at most this many symbols per close-price call.
pub const MAX_SYMBOLS_PER_REQUEST: usize = 10;

/// Reddit listings return at most this many posts per call.
pub const REDDIT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct RedditSettings {
    pub auth_url: String,
    pub api_base: String,
    pub user_agent: String,
    pub communities: Vec<String>,
    /// Newest posts to pull per community.
    pub max_new_posts: usize,
    /// Re-authenticate this long before the token's stated expiry.
    pub token_refresh_margin: Duration,
    pub retry: RetryPolicy,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            auth_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            user_agent: "watchman/0.0.1".to_string(),
            communities: vec![
                "wallstreetbets".to_string(),
                "finance".to_string(),
                "StockMarket".to_string(),
            ],
            max_new_posts: 10_000,
            token_refresh_margin: Duration::from_secs(60),
            retry: RetryPolicy::reddit(),
        }
    }
}

impl RedditSettings {
    pub fn with_communities(mut self, communities: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.communities = communities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_new_posts(mut self, max: usize) -> Self {
        self.max_new_posts = max;
        self
    }

    /// Point both the auth and API endpoints at another host.
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, api_base: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.api_base = api_base.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TwitterSettings {
    pub search_url: String,
    pub hashtags: Vec<String>,
    pub max_results: usize,
    pub page_size: usize,
    /// How far back `start_time` reaches from the run start.
    pub lookback: Duration,
    /// Pause between page fetches.
    pub page_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for TwitterSettings {
    fn default() -> Self {
        Self {
            search_url: "https://api.twitter.com/2/tweets/search/recent".to_string(),
            hashtags: [
                "#stocks",
                "#stockmarket",
                "#investing",
                "#trading",
                "#finance",
                "#investment",
                "#wallstreet",
                "#StocksToWatch",
                "#StocksToBuy",
                "#stocksinfocus",
                "#stonks",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            max_results: 15_000,
            page_size: 100,
            lookback: Duration::from_secs(24 * 60 * 60),
            page_delay: Duration::from_secs(1),
            retry: RetryPolicy::twitter(),
        }
    }
}

impl TwitterSettings {
    pub fn with_hashtags(mut self, hashtags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Page size, clamped to the 10..=100 range the API accepts.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.clamp(10, 100);
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Hashtags OR-joined into a search query.
    pub fn query(&self) -> String {
        self.hashtags.join(" OR ")
    }
}

#[derive(Debug, Clone)]
pub struct YahooFinanceSettings {
    pub close_price_url: String,
    /// Region is appended as the last path segment.
    pub trending_url: String,
    pub interval: String,
    pub range: String,
    pub daily_requests: usize,
    pub symbols_per_request: usize,
    pub max_retry: u32,
    /// Rounds the daily ticker universe is split into.
    pub rounds: usize,
    pub trending_regions: Vec<String>,
}

impl Default for YahooFinanceSettings {
    fn default() -> Self {
        Self {
            close_price_url: "https://yfapi.net/v8/finance/spark".to_string(),
            trending_url: "https://yfapi.net/v1/finance/trending".to_string(),
            interval: "1d".to_string(),
            range: "5d".to_string(),
            daily_requests: 10,
            symbols_per_request: MAX_SYMBOLS_PER_REQUEST,
            max_retry: 3,
            rounds: 1,
            trending_regions: ["US", "GB", "AU", "CA", "DE", "FR", "HK", "IN", "IT", "ES"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

impl YahooFinanceSettings {
    pub fn with_endpoints(mut self, close_price_url: impl Into<String>, trending_url: impl Into<String>) -> Self {
        self.close_price_url = close_price_url.into();
        self.trending_url = trending_url.into();
        self
    }

    /// Symbols per call, clamped to `1..=MAX_SYMBOLS_PER_REQUEST`.
    pub fn with_symbols_per_request(mut self, n: usize) -> Self {
        self.symbols_per_request = n.clamp(1, MAX_SYMBOLS_PER_REQUEST);
        self
    }

    pub fn with_daily_requests(mut self, n: usize) -> Self {
        self.daily_requests = n;
        self
    }

    pub fn with_max_retry(mut self, n: u32) -> Self {
        self.max_retry = n;
        self
    }

    pub fn with_rounds(mut self, n: usize) -> Self {
        self.rounds = n.max(1);
        self
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trending_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Tickers requested per day across every round.
    pub fn daily_tickers(&self) -> usize {
        self.daily_requests * self.symbols_per_request
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::yahoo_finance(self.max_retry)
    }
}

/// Destination tables, one per record type.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub reddit_new_posts: TableId,
    pub reddit_hot_posts: TableId,
    pub tweets: TableId,
    pub close_price: TableId,
    pub close_price_delta: TableId,
    pub ticker_not_found: TableId,
    pub trending: TableId,
}

impl Default for TableNames {
    fn default() -> Self {
        let id = TableId::builtin;
        Self {
            reddit_new_posts: id("reddit_new_posts"),
            reddit_hot_posts: id("reddit_hot_posts"),
            tweets: id("tweets"),
            close_price: id("close_price"),
            close_price_delta: id("close_price_delta"),
            ticker_not_found: id("ticker_not_found"),
            trending: id("trending"),
        }
    }
}

impl TableNames {
    /// Prefix every table with a schema name.
    pub fn in_schema(schema: &str) -> Result<Self> {
        let d = Self::default();
        let q = |t: &TableId| TableId::parse(&format!("{}.{}", schema, t));
        Ok(Self {
            reddit_new_posts: q(&d.reddit_new_posts)?,
            reddit_hot_posts: q(&d.reddit_hot_posts)?,
            tweets: q(&d.tweets)?,
            close_price: q(&d.close_price)?,
            close_price_delta: q(&d.close_price_delta)?,
            ticker_not_found: q(&d.ticker_not_found)?,
            trending: q(&d.trending)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_per_request_is_clamped() {
        let settings = YahooFinanceSettings::default().with_symbols_per_request(25);
        assert_eq!(settings.symbols_per_request, 10);
        assert_eq!(settings.daily_tickers(), 100);
    }

    #[test]
    fn test_twitter_query_or_joins_hashtags() {
        let settings = TwitterSettings::default().with_hashtags(["#stocks", "#stonks"]);
        assert_eq!(settings.query(), "#stocks OR #stonks");
    }

    #[test]
    fn test_tables_in_schema() {
        let tables = TableNames::in_schema("analytics").unwrap();
        assert_eq!(tables.close_price_delta.as_str(), "analytics.close_price_delta");
        assert!(TableNames::in_schema("bad schema").is_err());
    }
}
