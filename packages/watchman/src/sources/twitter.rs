//! Twitter v2 recent search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use crate::config::TwitterSettings;
use crate::error::Result;
use crate::http::{fetch_with_retry, FetchRequest, HttpFetcher};
use crate::normalize::normalize_search_page;
use crate::pagination::{paginate, Page, PageBudget, PagedSource};
use crate::records::Tweet;
use crate::security::SecretString;

const TWEET_FIELDS: &str = "author_id,created_at,public_metrics,entities";
const EXPANSIONS: &str = "author_id";
const USER_FIELDS: &str = "public_metrics";

/// App-only bearer-token client for `/2/tweets/search/recent`.
///
/// Any non-200 page fails the whole search under the default
/// [`crate::http::RetryPolicy::twitter`] policy.
pub struct TwitterClient {
    fetcher: Arc<dyn HttpFetcher>,
    bearer_token: SecretString,
    settings: TwitterSettings,
}

impl TwitterClient {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, bearer_token: SecretString, settings: TwitterSettings) -> Self {
        Self {
            fetcher,
            bearer_token,
            settings,
        }
    }

    pub fn settings(&self) -> &TwitterSettings {
        &self.settings
    }

    /// Tweets matching the configured hashtags posted since `start_time`.
    ///
    /// Follows `meta.next_token` until it disappears or `max_results`
    /// tweets are held, pausing `page_delay` between pages.
    pub async fn search(&self, start_time: DateTime<Utc>) -> Result<Vec<Tweet>> {
        let query = self.settings.query();
        info!(query = %query, start_time = %start_time, max_results = self.settings.max_results, "Searching tweets");

        let pager = SearchPager {
            client: self,
            query,
            start_time: start_time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        };
        let budget = PageBudget::new(usize::MAX, self.settings.max_results).with_delay(self.settings.page_delay);

        let tweets = paginate(&pager, budget).await?;
        info!(rows = tweets.len(), "Tweet search finished");
        Ok(tweets)
    }
}

struct SearchPager<'a> {
    client: &'a TwitterClient,
    query: String,
    start_time: String,
}

#[async_trait]
impl PagedSource for SearchPager<'_> {
    type Record = Tweet;

    async fn fetch_page(&self, cursor: Option<&str>, index: usize) -> Result<Page<Tweet>> {
        let settings = &self.client.settings;
        let request = FetchRequest::get(&settings.search_url)
            .secret_header(
                "Authorization",
                SecretString::new(format!("Bearer {}", self.client.bearer_token.expose())),
            )
            .query("query", &self.query)
            .query("tweet.fields", TWEET_FIELDS)
            .query("expansions", EXPANSIONS)
            .query("user.fields", USER_FIELDS)
            .query("max_results", settings.page_size)
            .query("start_time", &self.start_time)
            .query_opt("next_token", cursor);

        let response = fetch_with_retry(self.client.fetcher.as_ref(), &request, &settings.retry).await?;
        let (tweets, next) = normalize_search_page(&response.body)?;

        info!(page = index, rows = tweets.len(), has_next = next.is_some(), "Tweets page");
        Ok(Page::new(tweets, next))
    }
}
