use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use watchman::{RedditCredentials, RedditSettings, SecretString, TableId, TableNames, TwitterSettings, YahooFinanceSettings};

/// Application configuration loaded from environment variables
///
/// Source credentials are optional: a source without credentials still
/// boots, but its trigger answers with an error text.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub http_timeout: Duration,
    pub reddit_credentials: Option<RedditCredentials>,
    pub twitter_bearer_token: Option<SecretString>,
    pub yahoo_finance_api_key: Option<SecretString>,
    pub reddit: RedditSettings,
    pub twitter: TwitterSettings,
    pub yahoo_finance: YahooFinanceSettings,
    pub tables: TableNames,
    pub ticker_variants_table: TableId,
    /// Fixed ticker list; when unset tickers are ranked from tweet cashtags.
    pub static_tickers: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(&lookup);

        let reddit_credentials = match (
            vars.get("REDDIT_CLIENT_ID"),
            vars.get("REDDIT_CLIENT_SECRET"),
            vars.get("REDDIT_USERNAME"),
            vars.get("REDDIT_PASSWORD"),
        ) {
            (Some(id), Some(secret), Some(username), Some(password)) => {
                Some(RedditCredentials::new(id, secret, username, password))
            }
            _ => None,
        };

        let mut reddit = RedditSettings::default()
            .with_max_new_posts(vars.parse_or("REDDIT_MAX_NEW_POSTS", 10_000)?);
        if let Some(communities) = vars.list("REDDIT_COMMUNITIES") {
            reddit = reddit.with_communities(communities);
        }

        let mut twitter = TwitterSettings::default()
            .with_max_results(vars.parse_or("TWITTER_MAX_TWEETS", 15_000)?)
            .with_page_size(vars.parse_or("TWITTER_PAGE_SIZE", 100)?)
            .with_lookback(Duration::from_secs(vars.parse_or::<u64>("TWITTER_LOOKBACK_HOURS", 24)? * 3600))
            .with_page_delay(Duration::from_millis(vars.parse_or("TWITTER_PAGE_DELAY_MS", 1000)?));
        if let Some(hashtags) = vars.list("TWITTER_HASHTAGS") {
            twitter = twitter.with_hashtags(hashtags);
        }

        let mut yahoo_finance = YahooFinanceSettings::default()
            .with_daily_requests(vars.parse_or("YF_CLOSE_PRICE_DAILY_REQUESTS", 10)?)
            .with_symbols_per_request(vars.parse_or("YF_CLOSE_PRICE_SYMBOLS_PER_REQUEST", 10)?)
            .with_max_retry(vars.parse_or("YF_CLOSE_PRICE_MAX_RETRY", 3)?)
            .with_rounds(vars.parse_or("YF_CLOSE_PRICE_ROUNDS", 1)?);
        if let Some(url) = vars.get("YF_CLOSE_PRICE_URL") {
            yahoo_finance.close_price_url = url;
        }
        if let Some(url) = vars.get("YF_TRENDING_URL") {
            yahoo_finance.trending_url = url;
        }
        if let Some(interval) = vars.get("YF_CLOSE_PRICE_INTERVAL") {
            yahoo_finance.interval = interval;
        }
        if let Some(range) = vars.get("YF_CLOSE_PRICE_RANGE") {
            yahoo_finance.range = range;
        }
        if let Some(regions) = vars.list("YF_TRENDING_REGIONS") {
            yahoo_finance = yahoo_finance.with_regions(regions);
        }

        let defaults = TableNames::default();
        let tables = TableNames {
            reddit_new_posts: vars.table("TABLE_REDDIT_NEW_POSTS", defaults.reddit_new_posts)?,
            reddit_hot_posts: vars.table("TABLE_REDDIT_HOT_POSTS", defaults.reddit_hot_posts)?,
            tweets: vars.table("TABLE_TWEETS", defaults.tweets)?,
            close_price: vars.table("TABLE_CLOSE_PRICE", defaults.close_price)?,
            close_price_delta: vars.table("TABLE_CLOSE_PRICE_DELTA", defaults.close_price_delta)?,
            ticker_not_found: vars.table("TABLE_TICKER_NOT_FOUND", defaults.ticker_not_found)?,
            trending: vars.table("TABLE_TRENDING", defaults.trending)?,
        };
        let ticker_variants_table = match vars.get("TABLE_TICKER_VARIANTS") {
            Some(name) => TableId::parse(&name).context("TABLE_TICKER_VARIANTS must be a valid table name")?,
            None => TableId::parse("ticker_variants")?,
        };

        Ok(Self {
            database_url: vars.get("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: vars.parse_or("PORT", 8080)?,
            http_timeout: Duration::from_secs(vars.parse_or("HTTP_TIMEOUT_SECS", 30)?),
            reddit_credentials,
            twitter_bearer_token: vars.get("TWITTER_BEARER_TOKEN").map(SecretString::new),
            yahoo_finance_api_key: vars.get("YAHOO_FINANCE_API_KEY").map(SecretString::new),
            reddit,
            twitter,
            yahoo_finance,
            tables,
            ticker_variants_table,
            static_tickers: vars.list("YF_TICKERS"),
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Non-empty value of `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a valid number", key)),
            None => Ok(default),
        }
    }

    /// Comma-separated list, blanks dropped.
    fn list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .get(key)?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        (!items.is_empty()).then_some(items)
    }

    fn table(&self, key: &str, default: TableId) -> Result<TableId> {
        match self.get(key) {
            Some(name) => TableId::parse(&name).with_context(|| format!("{} must be a valid table name", key)),
            None => Ok(default),
        }
    }
}
