//! Strongly-typed records, one per destination table.
//!
//! Each record type carries its fixed column schema and its natural key via
//! [`TableRecord`], so every row in a result set has the same shape by
//! construction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

use crate::sink::{CellValue, ColumnKind, ColumnSpec, Row};

/// A record that can be loaded into a fixed-schema table.
pub trait TableRecord: Clone + Send + Sync + 'static {
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync;

    /// Destination columns, in load order.
    const COLUMNS: &'static [ColumnSpec];

    fn key(&self) -> Self::Key;

    /// Cells in [`COLUMNS`](Self::COLUMNS) order.
    fn to_row(&self) -> Row;
}

fn s(v: &str) -> CellValue {
    CellValue::String(Some(v.to_string()))
}

fn opt_s(v: &Option<String>) -> CellValue {
    CellValue::String(v.clone())
}

// =============================================================================
// Reddit
// =============================================================================

/// One Reddit post from a `/new` or `/hot` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub id: String,
    /// Raw epoch seconds as returned by the API.
    pub created: f64,
    /// `created_utc` rendered as `%Y-%m-%dT%H:%M:%SZ`.
    pub created_utc: String,
    pub downs: Option<i64>,
    /// Fullname prefix, e.g. `t3`.
    pub kind: String,
    pub link_flair_css_class: Option<String>,
    pub score: Option<i64>,
    pub selftext: Option<String>,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub total_awards_received: Option<i64>,
    pub ups: Option<i64>,
    pub upvote_ratio: Option<f64>,
    /// `created_utc` as epoch seconds; orders posts when deriving the next cursor.
    #[serde(skip)]
    pub created_utc_epoch: f64,
}

impl RedditPost {
    /// Reddit fullname, used as the `after` cursor.
    pub fn fullname(&self) -> String {
        format!("{}_{}", self.kind, self.id)
    }
}

impl TableRecord for RedditPost {
    type Key = String;

    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("id", ColumnKind::String),
        ColumnSpec::required("created", ColumnKind::Float),
        ColumnSpec::required("created_utc", ColumnKind::String),
        ColumnSpec::nullable("downs", ColumnKind::Integer),
        ColumnSpec::required("kind", ColumnKind::String),
        ColumnSpec::nullable("link_flair_css_class", ColumnKind::String),
        ColumnSpec::nullable("score", ColumnKind::Integer),
        ColumnSpec::nullable("selftext", ColumnKind::String),
        ColumnSpec::nullable("subreddit", ColumnKind::String),
        ColumnSpec::nullable("title", ColumnKind::String),
        ColumnSpec::nullable("total_awards_received", ColumnKind::Integer),
        ColumnSpec::nullable("ups", ColumnKind::Integer),
        ColumnSpec::nullable("upvote_ratio", ColumnKind::Float),
    ];

    fn key(&self) -> String {
        self.id.clone()
    }

    fn to_row(&self) -> Row {
        vec![
            s(&self.id),
            CellValue::Float(Some(self.created)),
            s(&self.created_utc),
            CellValue::Integer(self.downs),
            s(&self.kind),
            opt_s(&self.link_flair_css_class),
            CellValue::Integer(self.score),
            opt_s(&self.selftext),
            opt_s(&self.subreddit),
            opt_s(&self.title),
            CellValue::Integer(self.total_awards_received),
            CellValue::Integer(self.ups),
            CellValue::Float(self.upvote_ratio),
        ]
    }
}

// =============================================================================
// Twitter
// =============================================================================

/// A tweet joined with its author's public profile counters.
///
/// Author fields stay `None` when the author was not in `includes.users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub created_at: Option<String>,
    pub author_id: Option<String>,
    pub text: String,
    pub annotations: Vec<String>,
    pub cashtags: Vec<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub urls: Vec<String>,
    pub retweet_count: Option<i64>,
    pub reply_count: Option<i64>,
    pub like_count: Option<i64>,
    pub quote_count: Option<i64>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub tweet_count: Option<i64>,
    pub listed_count: Option<i64>,
    pub tweet_id: String,
}

impl TableRecord for Tweet {
    type Key = String;

    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::nullable("created_at", ColumnKind::String),
        ColumnSpec::nullable("author_id", ColumnKind::String),
        ColumnSpec::nullable("text", ColumnKind::String),
        ColumnSpec::repeated("annotations"),
        ColumnSpec::repeated("cashtags"),
        ColumnSpec::repeated("hashtags"),
        ColumnSpec::repeated("mentions"),
        ColumnSpec::repeated("urls"),
        ColumnSpec::nullable("retweet_count", ColumnKind::Integer),
        ColumnSpec::nullable("reply_count", ColumnKind::Integer),
        ColumnSpec::nullable("like_count", ColumnKind::Integer),
        ColumnSpec::nullable("quote_count", ColumnKind::Integer),
        ColumnSpec::nullable("name", ColumnKind::String),
        ColumnSpec::nullable("username", ColumnKind::String),
        ColumnSpec::nullable("followers_count", ColumnKind::Integer),
        ColumnSpec::nullable("following_count", ColumnKind::Integer),
        ColumnSpec::nullable("tweet_count", ColumnKind::Integer),
        ColumnSpec::nullable("listed_count", ColumnKind::Integer),
        ColumnSpec::required("tweet_id", ColumnKind::String),
    ];

    fn key(&self) -> String {
        self.tweet_id.clone()
    }

    fn to_row(&self) -> Row {
        vec![
            opt_s(&self.created_at),
            opt_s(&self.author_id),
            s(&self.text),
            CellValue::StringList(self.annotations.clone()),
            CellValue::StringList(self.cashtags.clone()),
            CellValue::StringList(self.hashtags.clone()),
            CellValue::StringList(self.mentions.clone()),
            CellValue::StringList(self.urls.clone()),
            CellValue::Integer(self.retweet_count),
            CellValue::Integer(self.reply_count),
            CellValue::Integer(self.like_count),
            CellValue::Integer(self.quote_count),
            opt_s(&self.name),
            opt_s(&self.username),
            CellValue::Integer(self.followers_count),
            CellValue::Integer(self.following_count),
            CellValue::Integer(self.tweet_count),
            CellValue::Integer(self.listed_count),
            s(&self.tweet_id),
        ]
    }
}

// =============================================================================
// Yahoo Finance
// =============================================================================

/// Daily close for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosePrice {
    pub day: NaiveDate,
    pub ticker: String,
    pub close_price: Option<f64>,
}

impl TableRecord for ClosePrice {
    type Key = (String, NaiveDate);

    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("day", ColumnKind::Date),
        ColumnSpec::required("ticker", ColumnKind::String),
        ColumnSpec::nullable("close_price", ColumnKind::Float),
    ];

    fn key(&self) -> (String, NaiveDate) {
        (self.ticker.clone(), self.day)
    }

    fn to_row(&self) -> Row {
        vec![
            CellValue::Date(Some(self.day)),
            s(&self.ticker),
            CellValue::Float(self.close_price),
        ]
    }
}

/// Why a requested ticker produced no close prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundCause {
    /// The whole batch failed after every retry.
    YahooFinanceError,
    /// The batch succeeded but this ticker was absent.
    NotFound,
}

impl NotFoundCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundCause::YahooFinanceError => "yahoo_finance_error",
            NotFoundCause::NotFound => "not_found",
        }
    }
}

impl fmt::Display for NotFoundCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticker kept aside for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerNotFound {
    pub day: NaiveDate,
    pub ticker: String,
    pub cause: NotFoundCause,
}

impl TableRecord for TickerNotFound {
    type Key = (NaiveDate, String);

    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("day", ColumnKind::Date),
        ColumnSpec::required("ticker", ColumnKind::String),
        ColumnSpec::required("cause", ColumnKind::String),
    ];

    fn key(&self) -> (NaiveDate, String) {
        (self.day, self.ticker.clone())
    }

    fn to_row(&self) -> Row {
        vec![
            CellValue::Date(Some(self.day)),
            s(&self.ticker),
            s(self.cause.as_str()),
        ]
    }
}

/// A ticker trending in one region on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingTicker {
    pub day: NaiveDate,
    pub ticker: String,
    pub region: String,
}

impl TableRecord for TrendingTicker {
    type Key = (NaiveDate, String, String);

    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::required("day", ColumnKind::Date),
        ColumnSpec::required("ticker", ColumnKind::String),
        ColumnSpec::required("region", ColumnKind::String),
    ];

    fn key(&self) -> (NaiveDate, String, String) {
        (self.day, self.ticker.clone(), self.region.clone())
    }

    fn to_row(&self) -> Row {
        vec![
            CellValue::Date(Some(self.day)),
            s(&self.ticker),
            s(&self.region),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{validate_row, TableId};

    fn table() -> TableId {
        TableId::parse("t").unwrap()
    }

    #[test]
    fn test_tweet_row_matches_schema_with_missing_author() {
        let tweet = Tweet {
            created_at: Some("2024-01-02T15:04:05.000Z".into()),
            author_id: Some("42".into()),
            text: "hello".into(),
            annotations: vec![],
            cashtags: vec!["AAPL".into()],
            hashtags: vec![],
            mentions: vec![],
            urls: vec![],
            retweet_count: Some(0),
            reply_count: Some(0),
            like_count: Some(0),
            quote_count: Some(0),
            name: None,
            username: None,
            followers_count: None,
            following_count: None,
            tweet_count: None,
            listed_count: None,
            tweet_id: "1".into(),
        };

        assert!(validate_row(&table(), Tweet::COLUMNS, &tweet.to_row()).is_ok());
    }

    #[test]
    fn test_close_price_key_is_ticker_and_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let price = ClosePrice {
            day,
            ticker: "AAPL".into(),
            close_price: Some(150.0),
        };

        assert_eq!(price.key(), ("AAPL".to_string(), day));
        assert!(validate_row(&table(), ClosePrice::COLUMNS, &price.to_row()).is_ok());
    }

    #[test]
    fn test_not_found_cause_strings() {
        assert_eq!(NotFoundCause::YahooFinanceError.to_string(), "yahoo_finance_error");
        assert_eq!(NotFoundCause::NotFound.to_string(), "not_found");
    }
}
