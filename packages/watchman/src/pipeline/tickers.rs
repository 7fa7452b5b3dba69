//! The close-price ticker universe.
//!
//! Tickers are ranked by how often they are discussed, the daily list is
//! split into rounds, and alternate spellings are mapped to their canonical
//! ticker before any price is requested.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::{Result, WatchmanError};

#[async_trait]
pub trait TickerSource: Send + Sync {
    /// Up to `limit` tickers, most discussed first.
    async fn most_discussed(&self, limit: usize) -> Result<Vec<String>>;

    /// Canonical ticker for each of `tickers` that has a known variant.
    async fn variants(&self, tickers: &[String]) -> Result<HashMap<String, String>>;
}

/// Fixed ranked list, for tests and as a fallback when no ranking store exists.
#[derive(Debug, Clone, Default)]
pub struct StaticTickers {
    ranked: Vec<String>,
    variants: HashMap<String, String>,
}

impl StaticTickers {
    pub fn new(ranked: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ranked: ranked.into_iter().map(Into::into).collect(),
            variants: HashMap::new(),
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>, ticker: impl Into<String>) -> Self {
        self.variants.insert(variant.into(), ticker.into());
        self
    }
}

#[async_trait]
impl TickerSource for StaticTickers {
    async fn most_discussed(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self.ranked.iter().take(limit).cloned().collect())
    }

    async fn variants(&self, tickers: &[String]) -> Result<HashMap<String, String>> {
        Ok(tickers
            .iter()
            .filter_map(|t| self.variants.get(t).map(|c| (t.clone(), c.clone())))
            .collect())
    }
}

/// Slice of `ranked` covered by `round` (1-based) out of `rounds`.
///
/// Each round takes `ceil(total / rounds)` tickers, where `total` is the
/// daily ticker budget rather than the length of `ranked`.
pub fn round_slice(ranked: &[String], round: usize, rounds: usize, total: usize) -> Result<&[String]> {
    if rounds == 0 || round == 0 || round > rounds {
        return Err(WatchmanError::Config(format!(
            "round {} is outside 1..={}",
            round, rounds
        )));
    }

    let per_round = total.div_ceil(rounds);
    let start = ((round - 1) * per_round).min(ranked.len());
    let end = (round * per_round).min(ranked.len());
    Ok(&ranked[start..end])
}

/// Replace variants with their canonical ticker, keeping the first occurrence
/// of each resulting ticker.
pub fn apply_variants(tickers: &[String], variants: &HashMap<String, String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(|t| variants.get(t).unwrap_or(t).clone())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(feature = "postgres")]
pub use self::postgres::PgTickerSource;

#[cfg(feature = "postgres")]
mod postgres {
    use async_trait::async_trait;
    use chrono::Utc;
    use sqlx::PgPool;
    use std::collections::HashMap;

    use super::TickerSource;
    use crate::error::Result;
    use crate::sink::TableId;

    /// Ranks cashtags found in the tweets table and resolves variants from a
    /// `(variant, ticker)` lookup table.
    pub struct PgTickerSource {
        pool: PgPool,
        tweets: TableId,
        variants: TableId,
        lookback: chrono::Duration,
    }

    impl PgTickerSource {
        pub fn new(pool: PgPool, tweets: TableId, variants: TableId) -> Self {
            Self {
                pool,
                tweets,
                variants,
                lookback: chrono::Duration::days(7),
            }
        }

        /// Only count tweets newer than this.
        pub fn with_lookback(mut self, lookback: chrono::Duration) -> Self {
            self.lookback = lookback;
            self
        }
    }

    #[async_trait]
    impl TickerSource for PgTickerSource {
        async fn most_discussed(&self, limit: usize) -> Result<Vec<String>> {
            // created_at is stored as the API's ISO-8601 text, which sorts chronologically.
            let since = (Utc::now() - self.lookback)
                .format("%Y-%m-%dT%H:%M:%S.000Z")
                .to_string();

            let sql = format!(
                "SELECT UPPER(tag) AS ticker, COUNT(*) AS mentions \
                 FROM {}, UNNEST(cashtags) AS tag \
                 WHERE created_at >= $1 \
                 GROUP BY 1 \
                 ORDER BY mentions DESC, ticker ASC \
                 LIMIT $2",
                self.tweets.quoted()
            );

            let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
                .bind(since)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;

            Ok(rows.into_iter().map(|(ticker, _)| ticker).collect())
        }

        async fn variants(&self, tickers: &[String]) -> Result<HashMap<String, String>> {
            let sql = format!(
                "SELECT variant, ticker FROM {} WHERE variant = ANY($1)",
                self.variants.quoted()
            );

            let rows: Vec<(String, String)> = sqlx::query_as(&sql)
                .bind(tickers)
                .fetch_all(&self.pool)
                .await?;

            Ok(rows.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("T{}", i)).collect()
    }

    #[test]
    fn test_round_slices_cover_the_budget() {
        let list = ranked(100);

        assert_eq!(round_slice(&list, 1, 3, 100).unwrap(), &list[0..34]);
        assert_eq!(round_slice(&list, 2, 3, 100).unwrap(), &list[34..68]);
        assert_eq!(round_slice(&list, 3, 3, 100).unwrap(), &list[68..100]);
    }

    #[test]
    fn test_round_slice_clamps_to_available_tickers() {
        let list = ranked(15);

        assert_eq!(round_slice(&list, 1, 2, 100).unwrap().len(), 15);
        assert!(round_slice(&list, 2, 2, 100).unwrap().is_empty());
    }

    #[test]
    fn test_round_out_of_range() {
        let list = ranked(5);

        assert!(round_slice(&list, 0, 1, 5).is_err());
        assert!(round_slice(&list, 2, 1, 5).is_err());
    }

    #[test]
    fn test_variants_replace_and_dedupe() {
        let tickers: Vec<String> = ["FB", "AAPL", "META"].iter().map(|s| s.to_string()).collect();
        let variants = HashMap::from([("FB".to_string(), "META".to_string())]);

        assert_eq!(apply_variants(&tickers, &variants), vec!["META", "AAPL"]);
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticTickers::new(["AAPL", "FB", "TSLA"]).with_variant("FB", "META");

        let top = source.most_discussed(2).await.unwrap();
        let variants = source.variants(&top).await.unwrap();

        assert_eq!(top, vec!["AAPL", "FB"]);
        assert_eq!(variants.get("FB").map(String::as_str), Some("META"));
    }
}
