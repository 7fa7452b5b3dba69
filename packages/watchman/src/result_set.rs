//! Per-run accumulator of typed records.

use std::collections::HashSet;

use crate::records::TableRecord;

/// Ordered, append-only collection of records keyed by [`TableRecord::key`].
///
/// A record whose key was already seen in this set is dropped, so the first
/// occurrence wins. Nothing is remembered across runs.
#[derive(Debug, Clone)]
pub struct ResultSet<R: TableRecord> {
    records: Vec<R>,
    seen: HashSet<R::Key>,
    duplicates: usize,
}

impl<R: TableRecord> Default for ResultSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRecord> ResultSet<R> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            duplicates: 0,
        }
    }

    /// Add one record. Returns `false` if its key was already present.
    pub fn push(&mut self, record: R) -> bool {
        if self.seen.insert(record.key()) {
            self.records.push(record);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Add every record of a page, preserving order.
    pub fn extend(&mut self, records: impl IntoIterator<Item = R>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped because their key was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn contains_key(&self, key: &R::Key) -> bool {
        self.seen.contains(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.records.iter()
    }
}

impl<R: TableRecord> FromIterator<R> for ResultSet<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, R: TableRecord> IntoIterator for &'a ResultSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TrendingTicker;
    use chrono::NaiveDate;

    fn trending(ticker: &str, region: &str) -> TrendingTicker {
        TrendingTicker {
            day: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            ticker: ticker.into(),
            region: region.into(),
        }
    }

    #[test]
    fn test_first_seen_wins_and_order_is_kept() {
        let mut set = ResultSet::new();
        assert!(set.push(trending("TSLA", "US")));
        assert!(set.push(trending("AAPL", "US")));
        assert!(!set.push(trending("TSLA", "US")));
        assert!(set.push(trending("TSLA", "GB")));

        let tickers: Vec<_> = set.iter().map(|t| (t.ticker.as_str(), t.region.as_str())).collect();
        assert_eq!(tickers, vec![("TSLA", "US"), ("AAPL", "US"), ("TSLA", "GB")]);
        assert_eq!(set.duplicates(), 1);
    }

    #[test]
    fn test_collect_from_iterator() {
        let set: ResultSet<TrendingTicker> = vec![trending("A", "US"), trending("A", "US")]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 1);
        assert!(set.contains_key(&(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "A".into(), "US".into())));
    }
}
