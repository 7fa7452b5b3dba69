//! Test doubles and fixtures.
//!
//! [`MockFetcher`] replays canned responses per URL and records every request
//! so tests can assert on pagination cursors, headers and call counts.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::Result;
use crate::http::{FetchRequest, FetchResponse, HttpFetcher};

/// Scripted [`HttpFetcher`].
///
/// Responses queued with [`push`](Self::push) are served first-in first-out
/// for their URL (query string excluded). Once a URL's queue is empty the
/// response registered with [`always`](Self::always) is served; URLs with
/// neither get a 404.
///
/// # Example
///
/// ```rust
/// use watchman::http::FetchResponse;
/// use watchman::testing::MockFetcher;
///
/// let mock = MockFetcher::new();
/// mock.push("https://oauth.reddit.com/r/finance/new", FetchResponse::ok("{}"));
/// assert_eq!(mock.call_count(), 0);
/// ```
#[derive(Default, Clone)]
pub struct MockFetcher {
    queued: Arc<RwLock<HashMap<String, VecDeque<FetchResponse>>>>,
    fallback: Arc<RwLock<HashMap<String, FetchResponse>>>,
    calls: Arc<RwLock<Vec<FetchRequest>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for `url`.
    pub fn push(&self, url: &str, response: FetchResponse) {
        self.queued
            .write()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Queue a 200 response with a JSON body.
    pub fn push_json(&self, url: &str, body: &Value) {
        self.push(url, FetchResponse::ok(body.to_string()));
    }

    /// Serve `response` for `url` whenever its queue is empty.
    pub fn always(&self, url: &str, response: FetchResponse) {
        self.fallback
            .write()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Every request made so far, in order.
    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.read().unwrap().clone()
    }

    /// Requests made to one URL, in order.
    pub fn calls_to(&self, url: &str) -> Vec<FetchRequest> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.calls.write().unwrap().push(request.clone());

        let queued = self
            .queued
            .write()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|q| q.pop_front());

        if let Some(response) = queued {
            return Ok(response);
        }

        Ok(self
            .fallback
            .read()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| FetchResponse::new(404, format!("no mock route for {}", request.url))))
    }
}

// =============================================================================
// Fixtures: wire-format bodies as the real APIs return them
// =============================================================================

/// A Reddit post wrapped as a listing child.
pub fn reddit_child(id: &str, created_utc: f64) -> Value {
    json!({
        "kind": "t3",
        "data": {
            "subreddit": "wallstreetbets",
            "title": format!("Post {}", id),
            "selftext": "to the moon",
            "upvote_ratio": 0.93,
            "ups": 120,
            "downs": 0,
            "score": 120,
            "total_awards_received": 2,
            "link_flair_css_class": "dd",
            "created_utc": created_utc,
            "created": created_utc,
            "id": id,
        }
    })
}

/// A Reddit listing page.
pub fn reddit_listing(children: Vec<Value>) -> Value {
    json!({
        "kind": "Listing",
        "data": {
            "after": null,
            "dist": children.len(),
            "children": children,
        }
    })
}

/// Reddit OAuth token response.
pub fn reddit_token(token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "scope": "*",
    })
}

/// A tweet with public metrics, entities and an author id.
pub fn tweet(id: &str, author_id: &str) -> Value {
    json!({
        "id": id,
        "author_id": author_id,
        "created_at": "2024-01-02T15:04:05.000Z",
        "text": format!("$AAPL looking strong #stocks ({})", id),
        "public_metrics": {
            "retweet_count": 1,
            "reply_count": 2,
            "like_count": 3,
            "quote_count": 4,
        },
        "entities": {
            "cashtags": [{ "start": 0, "end": 5, "tag": "AAPL" }],
            "hashtags": [{ "start": 20, "end": 27, "tag": "stocks" }],
        }
    })
}

/// A Twitter user object for the `includes.users` expansion.
pub fn twitter_user(id: &str, username: &str) -> Value {
    json!({
        "id": id,
        "name": format!("{} name", username),
        "username": username,
        "public_metrics": {
            "followers_count": 10,
            "following_count": 20,
            "tweet_count": 30,
            "listed_count": 40,
        }
    })
}

/// A recent-search page. `next_token` is omitted from `meta` when `None`.
pub fn twitter_page(tweets: Vec<Value>, users: Vec<Value>, next_token: Option<&str>) -> Value {
    let mut meta = json!({ "result_count": tweets.len() });
    if let Some(token) = next_token {
        meta["next_token"] = json!(token);
    }
    let mut page = json!({ "meta": meta });
    if !tweets.is_empty() {
        page["data"] = json!(tweets);
        page["includes"] = json!({ "users": users });
    }
    page
}

/// One symbol's series in a close-price response.
pub fn close_series(symbol: &str, points: &[(i64, f64)]) -> Value {
    json!({
        "symbol": symbol,
        "timestamp": points.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
        "close": points.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
        "end": null,
        "start": null,
        "previousClose": null,
        "chartPreviousClose": points.first().map(|(_, c)| *c),
        "dataGranularity": 300,
    })
}

/// Trending response for one region.
pub fn trending(symbols: &[&str]) -> Value {
    let result = if symbols.is_empty() {
        json!([])
    } else {
        json!([{
            "count": symbols.len(),
            "quotes": symbols.iter().map(|s| json!({ "symbol": s })).collect::<Vec<_>>(),
            "jobTimestamp": 1_704_067_200_000_i64,
            "startInterval": 202_401_010_000_i64,
        }])
    };
    json!({ "finance": { "result": result, "error": null } })
}
