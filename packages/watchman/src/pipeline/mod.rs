//! End-to-end runs: fetch, normalize, accumulate, load.
//!
//! A pipeline owns one source client and a [`SinkLoader`](crate::sink::SinkLoader).
//! Each run executes inside its [`RunContext`](crate::context::RunContext)
//! span and returns a [`RunSummary`] whose `Display` is the text handed back
//! to whoever triggered the run.

pub mod reddit;
pub mod tickers;
pub mod twitter;
pub mod yahoo_finance;

pub use reddit::RedditPipeline;
pub use tickers::{apply_variants, round_slice, StaticTickers, TickerSource};
pub use twitter::TwitterPipeline;
pub use yahoo_finance::YahooFinancePipeline;

#[cfg(feature = "postgres")]
pub use tickers::PgTickerSource;

use std::fmt;
use uuid::Uuid;

use crate::context::{RunContext, Source};
use crate::error::WatchmanError;
use crate::sink::TableId;

/// What a completed run loaded, and which units failed without stopping it.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub source: Source,
    pub run_id: Uuid,
    pub loaded: Vec<(TableId, usize)>,
    pub partial_failures: Vec<String>,
}

impl RunSummary {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            source: ctx.source,
            run_id: ctx.run_id,
            loaded: Vec::new(),
            partial_failures: Vec::new(),
        }
    }

    pub fn record_load(&mut self, table: &TableId, rows: usize) {
        self.loaded.push((table.clone(), rows));
    }

    pub fn record_failures(&mut self, failures: impl IntoIterator<Item = WatchmanError>) {
        self.partial_failures
            .extend(failures.into_iter().map(|e| e.to_string()));
    }

    pub fn rows_loaded(&self, table: &TableId) -> Option<usize> {
        self.loaded
            .iter()
            .find(|(t, _)| t == table)
            .map(|(_, rows)| *rows)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Watchman {} run {} completed", self.source, self.run_id)?;

        if !self.loaded.is_empty() {
            let loads: Vec<String> = self
                .loaded
                .iter()
                .map(|(table, rows)| format!("{}={}", table, rows))
                .collect();
            write!(f, ": {}", loads.join(", "))?;
        }

        if !self.partial_failures.is_empty() {
            write!(
                f,
                " ({} partial failures: {})",
                self.partial_failures.len(),
                self.partial_failures.join("; ")
            )?;
        }

        Ok(())
    }
}
