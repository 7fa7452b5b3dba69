//! Cursor-driven pagination.
//!
//! A [`PagedSource`] knows how to fetch one page given the previous page's
//! continuation token; [`paginate`] drives it under a [`PageBudget`].

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// One page of normalized records plus the cursor for the next call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    /// Continuation token; `None` means the stream has ended.
    pub next: Option<String>,
}

impl<R> Page<R> {
    pub fn new(records: Vec<R>, next: Option<String>) -> Self {
        Self { records, next }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }
}

#[async_trait]
pub trait PagedSource: Send + Sync {
    type Record: Send;

    /// Fetch page `index` (0-based). `cursor` is `None` on the first call.
    async fn fetch_page(&self, cursor: Option<&str>, index: usize) -> Result<Page<Self::Record>>;
}

/// Bounds for one pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBudget {
    pub max_pages: usize,
    pub max_rows: usize,
    /// Minimum spacing between consecutive fetches.
    pub delay: Duration,
}

impl PageBudget {
    pub fn new(max_pages: usize, max_rows: usize) -> Self {
        Self {
            max_pages,
            max_rows,
            delay: Duration::ZERO,
        }
    }

    /// As many pages of `page_size` as it takes to reach `max_rows`.
    pub fn rows(max_rows: usize, page_size: usize) -> Self {
        Self::new(max_rows.div_ceil(page_size.max(1)), max_rows)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Fetch pages until the source is exhausted or the budget is spent.
///
/// Stops on an empty page, a missing cursor, `max_pages` fetches, or once
/// `max_rows` records are held. The output never exceeds `max_rows`. Errors
/// from the source propagate; records gathered before the error are lost.
///
/// A non-zero `delay` paces fetches through a one-cell limiter: the first
/// fetch goes out at once and each later one waits for the next cell.
pub async fn paginate<S>(source: &S, budget: PageBudget) -> Result<Vec<S::Record>>
where
    S: PagedSource + ?Sized,
{
    let limiter = Quota::with_period(budget.delay).map(RateLimiter::direct);
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    for index in 0..budget.max_pages {
        if records.len() >= budget.max_rows {
            break;
        }
        if let Some(limiter) = &limiter {
            limiter.until_ready().await;
        }

        let page = source.fetch_page(cursor.as_deref(), index).await?;
        let fetched = page.records.len();
        debug!(page = index, rows = fetched, total = records.len() + fetched, "Fetched page");

        if fetched == 0 {
            break;
        }

        records.extend(page.records);
        records.truncate(budget.max_rows);

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(records)
}
