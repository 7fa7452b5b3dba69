//! API clients, one per data source.
//!
//! Clients own authentication and request shape; they hand raw bodies to
//! [`crate::normalize`] and drive multi-page fetches through
//! [`crate::pagination`].

pub mod reddit;
pub mod twitter;
pub mod yahoo_finance;

pub use reddit::{Listing, RedditClient};
pub use twitter::TwitterClient;
pub use yahoo_finance::{ClosePrices, YahooFinanceClient};

use crate::error::WatchmanError;

/// Records gathered from several units (communities, regions) plus the
/// units that failed along the way.
#[derive(Debug)]
pub struct Harvest<R> {
    pub records: Vec<R>,
    pub failures: Vec<WatchmanError>,
}

impl<R> Default for Harvest<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<R> Harvest<R> {
    pub fn failed_units(&self) -> usize {
        self.failures.len()
    }
}

/// Whether an error only affects the unit that raised it.
///
/// Authentication problems stop the whole source; everything else is
/// contained to one community, region or batch.
pub(crate) fn is_contained(error: &WatchmanError) -> bool {
    !matches!(
        error,
        WatchmanError::Authentication { .. } | WatchmanError::Config(_)
    )
}

/// Short, single-line excerpt of a response body for error messages.
pub(crate) fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    let line = body.lines().next().unwrap_or_default();
    match line.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(excerpt(&body).len(), 203);
        assert_eq!(excerpt("line one\nline two"), "line one");
    }

    #[test]
    fn test_auth_errors_are_not_contained() {
        assert!(!is_contained(&WatchmanError::auth("reddit", "bad password")));
        assert!(is_contained(&WatchmanError::partial("r/finance", "HTTP 503")));
    }
}
