//! Reddit OAuth client and listing pagination.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{excerpt, is_contained, Harvest};
use crate::config::{RedditSettings, REDDIT_PAGE_SIZE};
use crate::error::{Result, WatchmanError};
use crate::http::{fetch_with_retry, FetchRequest, HttpFetcher};
use crate::normalize::{normalize_listing, oldest_fullname};
use crate::pagination::{paginate, Page, PageBudget, PagedSource};
use crate::records::RedditPost;
use crate::security::{RedditCredentials, SecretString};

/// Reddit states tokens last two hours; used when `expires_in` is missing.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    New,
    Hot,
}

impl Listing {
    fn path(&self) -> &'static str {
        match self {
            Listing::New => "new",
            Listing::Hot => "hot",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Bearer token with a monotonic expiry.
struct Session {
    token: SecretString,
    expires_at: Instant,
}

/// Authenticated Reddit client.
///
/// The bearer token is obtained lazily and replaced before any call that
/// would run within `token_refresh_margin` of its expiry.
pub struct RedditClient {
    fetcher: Arc<dyn HttpFetcher>,
    credentials: RedditCredentials,
    settings: RedditSettings,
    session: tokio::sync::Mutex<Option<Session>>,
}

impl RedditClient {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, credentials: RedditCredentials, settings: RedditSettings) -> Self {
        Self {
            fetcher,
            credentials,
            settings,
            session: tokio::sync::Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &RedditSettings {
        &self.settings
    }

    /// Current bearer token, re-authenticating if it is missing or about to expire.
    pub async fn ensure_session(&self) -> Result<SecretString> {
        let mut session = self.session.lock().await;

        let fresh = session
            .as_ref()
            .is_some_and(|s| Instant::now() + self.settings.token_refresh_margin < s.expires_at);

        if !fresh {
            *session = Some(self.authenticate().await?);
        }

        session
            .as_ref()
            .map(|s| s.token.clone())
            .ok_or_else(|| WatchmanError::auth("reddit", "no session"))
    }

    async fn authenticate(&self) -> Result<Session> {
        info!(username = %self.credentials.username, "Reddit authentication started");

        let request = FetchRequest::post(&self.settings.auth_url)
            .header("User-Agent", &self.settings.user_agent)
            .basic_auth(&self.credentials.client_id, self.credentials.client_secret.clone())
            .form("grant_type", "password")
            .form("username", &self.credentials.username)
            .form("password", self.credentials.password.expose());

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(WatchmanError::auth(
                "reddit",
                format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            ));
        }

        let parsed: TokenResponse = response
            .json()
            .map_err(|e| WatchmanError::auth("reddit", format!("unreadable token response: {}", e)))?;

        let token = match parsed.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                let reason = parsed.error.unwrap_or_else(|| "access_token missing".to_string());
                return Err(WatchmanError::auth("reddit", reason));
            }
        };

        let lifetime = parsed
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        info!(expires_in_secs = lifetime.as_secs(), "Reddit authentication ended");

        Ok(Session {
            token: SecretString::new(token),
            expires_at: Instant::now() + lifetime,
        })
    }

    /// One listing call for `community`, retried per the Reddit policy.
    ///
    /// A response still non-200 after every attempt is a
    /// [`WatchmanError::PartialSource`] for that community.
    pub async fn fetch_listing(
        &self,
        community: &str,
        listing: Listing,
        after: Option<&str>,
    ) -> Result<Vec<RedditPost>> {
        let token = self.ensure_session().await?;
        let url = format!("{}/r/{}/{}", self.settings.api_base, community, listing.path());

        let request = FetchRequest::get(&url)
            .header("User-Agent", &self.settings.user_agent)
            .secret_header("Authorization", SecretString::new(format!("bearer {}", token.expose())))
            .query("limit", REDDIT_PAGE_SIZE)
            .query_opt("after", after);

        let response = fetch_with_retry(self.fetcher.as_ref(), &request, &self.settings.retry).await?;
        if !response.is_success() {
            return Err(WatchmanError::partial(
                format!("r/{}/{}", community, listing.path()),
                format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            ));
        }

        normalize_listing(&response.body)
    }

    /// Up to `n` newest posts from each community.
    ///
    /// Each community pages backwards from its newest post with the `after`
    /// cursor. A failing community keeps the pages fetched before the
    /// failure and is reported in [`Harvest::failures`].
    pub async fn new_posts(&self, communities: &[String], n: usize) -> Result<Harvest<RedditPost>> {
        let mut harvest = Harvest::default();

        for community in communities {
            info!(community = %community, max_posts = n, "Fetching new posts");

            let pager = CommunityPager {
                client: self,
                community,
                failure: Mutex::new(None),
            };
            let posts = paginate(&pager, PageBudget::rows(n, REDDIT_PAGE_SIZE)).await?;

            info!(community = %community, rows = posts.len(), "Community finished");
            harvest.records.extend(posts);
            if let Some(e) = pager.into_failure() {
                harvest.failures.push(e);
            }
        }

        Ok(harvest)
    }

    /// The first page of `/hot` for each community.
    pub async fn hot_posts(&self, communities: &[String]) -> Result<Harvest<RedditPost>> {
        let mut harvest = Harvest::default();

        for community in communities {
            match self.fetch_listing(community, Listing::Hot, None).await {
                Ok(posts) => {
                    info!(community = %community, rows = posts.len(), "Fetched hot posts");
                    harvest.records.extend(posts);
                }
                Err(e) if is_contained(&e) => {
                    warn!(community = %community, error = %e, "Hot posts failed");
                    harvest.failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(harvest)
    }
}

/// `/new` pagination for a single community.
struct CommunityPager<'a> {
    client: &'a RedditClient,
    community: &'a str,
    failure: Mutex<Option<WatchmanError>>,
}

impl CommunityPager<'_> {
    fn into_failure(self) -> Option<WatchmanError> {
        self.failure.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PagedSource for CommunityPager<'_> {
    type Record = RedditPost;

    async fn fetch_page(&self, cursor: Option<&str>, index: usize) -> Result<Page<RedditPost>> {
        debug!(community = %self.community, page = index, after = ?cursor, "Requesting page");

        match self.client.fetch_listing(self.community, Listing::New, cursor).await {
            Ok(posts) => {
                let next = oldest_fullname(&posts);
                Ok(Page::new(posts, next))
            }
            Err(e) if is_contained(&e) => {
                warn!(community = %self.community, page = index, error = %e, "Ending community early");
                if let Ok(mut slot) = self.failure.lock() {
                    *slot = Some(e);
                }
                Ok(Page::empty())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FetchResponse, Method, RetryPolicy};
    use crate::testing::{reddit_child, reddit_listing, reddit_token, MockFetcher};

    const AUTH: &str = "https://www.reddit.com/api/v1/access_token";
    const NEW: &str = "https://oauth.reddit.com/r/finance/new";

    fn client(mock: &MockFetcher) -> RedditClient {
        RedditClient::new(
            Arc::new(mock.clone()),
            RedditCredentials::new("id", "secret", "user", "pass"),
            RedditSettings::default().with_retry(RetryPolicy::reddit().with_delay(Duration::ZERO)),
        )
    }

    #[tokio::test]
    async fn test_handshake_shape() {
        let mock = MockFetcher::new();
        mock.push_json(AUTH, &reddit_token("tok", 7200));
        let client = client(&mock);

        let token = client.ensure_session().await.unwrap();

        assert_eq!(token.expose(), "tok");
        let call = &mock.calls_to(AUTH)[0];
        assert_eq!(call.method, Method::Post);
        assert_eq!(call.header_value("user-agent"), Some("watchman/0.0.1"));
        assert_eq!(call.basic_auth.as_ref().map(|(u, _)| u.as_str()), Some("id"));
        assert!(call.form.contains(&("grant_type".to_string(), "password".to_string())));
        assert!(call.form.contains(&("username".to_string(), "user".to_string())));
    }

    #[tokio::test]
    async fn test_handshake_failure_is_authentication_error() {
        let mock = MockFetcher::new();
        mock.push(AUTH, FetchResponse::new(401, "{\"message\": \"Unauthorized\"}"));

        let err = client(&mock).ensure_session().await.unwrap_err();

        assert!(matches!(err, WatchmanError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_missing_token_reports_api_error() {
        let mock = MockFetcher::new();
        mock.push(AUTH, FetchResponse::ok("{\"error\": \"invalid_grant\"}"));

        match client(&mock).ensure_session().await {
            Err(WatchmanError::Authentication { reason, .. }) => assert_eq!(reason, "invalid_grant"),
            other => panic!("expected Authentication, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_token_reused_until_near_expiry() {
        let mock = MockFetcher::new();
        mock.always(AUTH, FetchResponse::ok(reddit_token("long", 3600).to_string()));
        let client = client(&mock);

        client.ensure_session().await.unwrap();
        client.ensure_session().await.unwrap();

        assert_eq!(mock.calls_to(AUTH).len(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        let mock = MockFetcher::new();
        // Lifetime shorter than the 60s refresh margin.
        mock.always(AUTH, FetchResponse::ok(reddit_token("short", 30).to_string()));
        let client = client(&mock);

        client.ensure_session().await.unwrap();
        client.ensure_session().await.unwrap();

        assert_eq!(mock.calls_to(AUTH).len(), 2);
    }

    #[tokio::test]
    async fn test_cursor_is_oldest_post_fullname() {
        let mock = MockFetcher::new();
        mock.push_json(AUTH, &reddit_token("tok", 7200));
        mock.push_json(
            NEW,
            &reddit_listing(vec![reddit_child("b", 200.0), reddit_child("a", 100.0), reddit_child("c", 300.0)]),
        );
        mock.push_json(NEW, &reddit_listing(vec![]));
        let client = client(&mock);

        let harvest = client.new_posts(&["finance".to_string()], 1000).await.unwrap();

        assert_eq!(harvest.records.len(), 3);
        let calls = mock.calls_to(NEW);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].query_value("after"), None);
        assert_eq!(calls[1].query_value("after"), Some("t3_a"));
        assert_eq!(calls[1].query_value("limit"), Some("100"));
    }

    #[tokio::test]
    async fn test_failing_community_keeps_earlier_pages_and_siblings_continue() {
        let mock = MockFetcher::new();
        mock.push_json(AUTH, &reddit_token("tok", 7200));
        mock.push_json(NEW, &reddit_listing(vec![reddit_child("a", 100.0)]));
        mock.always(NEW, FetchResponse::new(503, "busy"));
        mock.push_json(
            "https://oauth.reddit.com/r/stocks/new",
            &reddit_listing(vec![reddit_child("s", 50.0)]),
        );
        mock.push_json("https://oauth.reddit.com/r/stocks/new", &reddit_listing(vec![]));
        let client = client(&mock);

        let harvest = client
            .new_posts(&["finance".to_string(), "stocks".to_string()], 300)
            .await
            .unwrap();

        let ids: Vec<_> = harvest.records.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "s"]);
        assert_eq!(harvest.failed_units(), 1);
        // First page, then three attempts at the second.
        assert_eq!(mock.calls_to(NEW).len(), 4);
    }

    #[tokio::test]
    async fn test_bearer_header_is_attached() {
        let mock = MockFetcher::new();
        mock.push_json(AUTH, &reddit_token("tok", 7200));
        mock.push_json(
            "https://oauth.reddit.com/r/finance/hot",
            &reddit_listing(vec![reddit_child("h", 1.0)]),
        );
        let client = client(&mock);

        let harvest = client.hot_posts(&["finance".to_string()]).await.unwrap();

        assert_eq!(harvest.records.len(), 1);
        let call = &mock.calls_to("https://oauth.reddit.com/r/finance/hot")[0];
        let (_, bearer) = call
            .secret_headers
            .iter()
            .find(|(name, _)| name == "Authorization")
            .unwrap();
        assert_eq!(bearer.expose(), "bearer tok");
    }
}
