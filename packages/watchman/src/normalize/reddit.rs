use serde::Deserialize;

use super::utc_from_epoch;
use crate::error::Result;
use crate::records::RedditPost;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    kind: String,
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    created_utc: f64,
    #[serde(default)]
    created: Option<f64>,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    upvote_ratio: Option<f64>,
    #[serde(default)]
    ups: Option<i64>,
    #[serde(default)]
    downs: Option<i64>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    total_awards_received: Option<i64>,
    #[serde(default)]
    link_flair_css_class: Option<String>,
}

impl Child {
    fn into_post(self) -> Result<RedditPost> {
        let d = self.data;
        let created_utc = utc_from_epoch(d.created_utc)?;
        Ok(RedditPost {
            id: d.id,
            created: d.created.unwrap_or(d.created_utc),
            created_utc: created_utc.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            downs: d.downs,
            kind: self.kind,
            link_flair_css_class: d.link_flair_css_class,
            score: d.score,
            selftext: d.selftext,
            subreddit: d.subreddit,
            title: d.title,
            total_awards_received: d.total_awards_received,
            ups: d.ups,
            upvote_ratio: d.upvote_ratio,
            created_utc_epoch: d.created_utc,
        })
    }
}

/// Normalize one `/r/{community}/{new,hot}` listing body.
pub fn normalize_listing(body: &str) -> Result<Vec<RedditPost>> {
    let listing: Listing = serde_json::from_str(body)?;
    listing
        .data
        .children
        .into_iter()
        .map(Child::into_post)
        .collect()
}

/// Fullname of the chronologically oldest post, the `after` cursor for the
/// next request. Ties go to the post listed first.
pub fn oldest_fullname(posts: &[RedditPost]) -> Option<String> {
    posts
        .iter()
        .min_by(|a, b| a.created_utc_epoch.total_cmp(&b.created_utc_epoch))
        .map(RedditPost::fullname)
}
