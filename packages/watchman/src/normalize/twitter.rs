use serde::Deserialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::records::Tweet;

/// One recent-search response.
#[derive(Debug, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    data: Vec<TweetData>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
    #[serde(default)]
    author_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    public_metrics: Option<TweetMetrics>,
    #[serde(default)]
    entities: Entities,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct TweetMetrics {
    retweet_count: Option<i64>,
    reply_count: Option<i64>,
    like_count: Option<i64>,
    quote_count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Entities {
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    cashtags: Vec<Tag>,
    #[serde(default)]
    hashtags: Vec<Tag>,
    #[serde(default)]
    mentions: Vec<Mention>,
    #[serde(default)]
    urls: Vec<UrlEntity>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    normalized_text: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Tag {
    tag: String,
}

#[derive(Debug, Deserialize)]
struct Mention {
    username: String,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    public_metrics: Option<UserMetrics>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct UserMetrics {
    followers_count: Option<i64>,
    following_count: Option<i64>,
    tweet_count: Option<i64>,
    listed_count: Option<i64>,
}

impl SearchPage {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Flatten tweets and left-join them to `includes.users` on `author_id`.
    pub fn into_tweets(self) -> Vec<Tweet> {
        let users: HashMap<&str, &UserData> = self
            .includes
            .users
            .iter()
            .map(|u| (u.id.as_str(), u))
            .collect();

        self.data
            .iter()
            .map(|t| {
                let author = t.author_id.as_deref().and_then(|id| users.get(id)).copied();
                let user_metrics = author.and_then(|u| u.public_metrics);
                let metrics = t.public_metrics;
                let e = &t.entities;

                Tweet {
                    created_at: t.created_at.clone(),
                    author_id: t.author_id.clone(),
                    text: t.text.clone(),
                    annotations: e
                        .annotations
                        .iter()
                        .map(|a| format!("{}_{}", a.normalized_text, a.kind))
                        .collect(),
                    cashtags: e.cashtags.iter().map(|c| c.tag.clone()).collect(),
                    hashtags: e.hashtags.iter().map(|h| h.tag.clone()).collect(),
                    mentions: e.mentions.iter().map(|m| m.username.clone()).collect(),
                    urls: e.urls.iter().map(|u| u.url.clone()).collect(),
                    retweet_count: metrics.and_then(|m| m.retweet_count),
                    reply_count: metrics.and_then(|m| m.reply_count),
                    like_count: metrics.and_then(|m| m.like_count),
                    quote_count: metrics.and_then(|m| m.quote_count),
                    name: author.and_then(|u| u.name.clone()),
                    username: author.and_then(|u| u.username.clone()),
                    followers_count: user_metrics.and_then(|m| m.followers_count),
                    following_count: user_metrics.and_then(|m| m.following_count),
                    tweet_count: user_metrics.and_then(|m| m.tweet_count),
                    listed_count: user_metrics.and_then(|m| m.listed_count),
                    tweet_id: t.id.clone(),
                }
            })
            .collect()
    }
}

/// Normalize one search body into tweets plus the next-page token.
pub fn normalize_search_page(body: &str) -> Result<(Vec<Tweet>, Option<String>)> {
    let mut page = SearchPage::parse(body)?;
    let next = page.meta.next_token.take();
    Ok((page.into_tweets(), next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tweet, twitter_page, twitter_user};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_join_and_metrics() {
        let body = twitter_page(
            vec![tweet("1", "42")],
            vec![twitter_user("42", "trader")],
            Some("next-1"),
        )
        .to_string();

        let (tweets, next) = normalize_search_page(&body).unwrap();

        assert_eq!(next.as_deref(), Some("next-1"));
        let t = &tweets[0];
        assert_eq!(t.tweet_id, "1");
        assert_eq!(t.cashtags, vec!["AAPL"]);
        assert_eq!(t.hashtags, vec!["stocks"]);
        assert!(t.mentions.is_empty());
        assert_eq!(
            (t.retweet_count, t.reply_count, t.like_count, t.quote_count),
            (Some(1), Some(2), Some(3), Some(4))
        );
        assert_eq!(t.username.as_deref(), Some("trader"));
        assert_eq!(t.followers_count, Some(10));
        assert_eq!(t.listed_count, Some(40));
    }

    #[test]
    fn test_unresolved_author_keeps_null_user_fields() {
        let body = twitter_page(vec![tweet("1", "7")], vec![twitter_user("42", "other")], None).to_string();

        let (tweets, next) = normalize_search_page(&body).unwrap();

        assert_eq!(next, None);
        assert_eq!(tweets[0].username, None);
        assert_eq!(tweets[0].followers_count, None);
        assert_eq!(tweets[0].author_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_absent_entities_become_empty_lists() {
        let body = json!({
            "data": [{
                "id": "9",
                "author_id": "1",
                "text": "no entities here",
                "public_metrics": { "retweet_count": 0, "reply_count": 0, "like_count": 0, "quote_count": 0 }
            }],
            "meta": { "result_count": 1 }
        })
        .to_string();

        let (tweets, _) = normalize_search_page(&body).unwrap();

        let t = &tweets[0];
        assert!(t.cashtags.is_empty());
        assert!(t.annotations.is_empty());
        assert!(t.urls.is_empty());
    }

    #[test]
    fn test_annotations_flatten_text_and_type() {
        let body = json!({
            "data": [{
                "id": "9",
                "text": "Apple earnings",
                "entities": {
                    "annotations": [
                        { "start": 0, "end": 4, "probability": 0.9, "type": "Organization", "normalized_text": "Apple" }
                    ],
                    "mentions": [{ "start": 0, "end": 5, "username": "tim" }],
                    "urls": [{ "start": 0, "end": 5, "url": "https://t.co/x" }]
                }
            }],
            "meta": {}
        })
        .to_string();

        let (tweets, _) = normalize_search_page(&body).unwrap();

        assert_eq!(tweets[0].annotations, vec!["Apple_Organization"]);
        assert_eq!(tweets[0].mentions, vec!["tim"]);
        assert_eq!(tweets[0].urls, vec!["https://t.co/x"]);
        assert_eq!(tweets[0].retweet_count, None);
    }

    #[test]
    fn test_page_without_data() {
        let body = twitter_page(vec![], vec![], None).to_string();

        let (tweets, next) = normalize_search_page(&body).unwrap();

        assert!(tweets.is_empty());
        assert!(next.is_none());
    }

    /// A tweet whose metrics and entity groups may each be missing, with an
    /// author that may or may not appear in `includes.users`.
    fn arb_tweet() -> impl Strategy<Value = serde_json::Value> {
        (
            "[0-9]{1,19}",
            proptest::option::of("[0-9]{1,3}"),
            "[ -~]{0,60}",
            proptest::option::of(proptest::option::of(0i64..10_000)),
            proptest::option::of(proptest::collection::vec("[A-Z]{1,5}", 0..4)),
            proptest::option::of(proptest::collection::vec("[a-z]{1,10}", 0..4)),
        )
            .prop_map(|(id, author, text, likes, cashtags, mentions)| {
                let mut tweet = json!({ "id": id, "text": text });
                if let Some(author) = author {
                    tweet["author_id"] = json!(author);
                }
                if let Some(likes) = likes {
                    tweet["public_metrics"] = json!({ "like_count": likes });
                }
                let mut entities = serde_json::Map::new();
                if let Some(tags) = cashtags {
                    entities.insert("cashtags".into(), json!(tags.iter().map(|t| json!({ "tag": t })).collect::<Vec<_>>()));
                }
                if let Some(names) = mentions {
                    entities.insert("mentions".into(), json!(names.iter().map(|n| json!({ "username": n })).collect::<Vec<_>>()));
                }
                if !entities.is_empty() {
                    tweet["entities"] = serde_json::Value::Object(entities);
                }
                tweet
            })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(
            tweets in proptest::collection::vec(arb_tweet(), 0..20),
            authors in proptest::collection::vec("[0-9]{1,3}", 0..5),
            next in proptest::option::of("[a-z0-9]{1,12}"),
        ) {
            let count = tweets.len();
            let users = authors.iter().map(|id| twitter_user(id, "user")).collect();
            let body = twitter_page(tweets, users, next.as_deref()).to_string();

            let (first, first_next) = normalize_search_page(&body).unwrap();
            let (second, second_next) = normalize_search_page(&body).unwrap();

            prop_assert_eq!(first.len(), count);
            prop_assert_eq!(first_next, second_next);
            prop_assert_eq!(serde_json::to_vec(&first).unwrap(), serde_json::to_vec(&second).unwrap());
        }
    }
}
