//! Per-run context handed to every pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use tracing::{info_span, Span};
use uuid::Uuid;

/// Data source a run pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Reddit,
    Twitter,
    YahooFinance,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::Twitter => "twitter",
            Source::YahooFinance => "yahoo_finance",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and clock of one pipeline run.
///
/// Components log inside [`span`](Self::span) instead of reaching for global
/// state, and read "today" from [`day`](Self::day) so a run that crosses
/// midnight stamps every row with the same date.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub source: Source,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(source: Source) -> Self {
        Self::at(source, Utc::now())
    }

    /// Context with a fixed start time.
    pub fn at(source: Source, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            source,
            started_at,
        }
    }

    /// UTC date the run started on.
    pub fn day(&self) -> NaiveDate {
        self.started_at.date_naive()
    }

    pub fn span(&self) -> Span {
        info_span!(
            "pipeline_run",
            run_id = %self.run_id,
            source = %self.source,
            started_at = %self.started_at.to_rfc3339(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_comes_from_start_time() {
        let started = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap();
        let ctx = RunContext::at(Source::YahooFinance, started);

        assert_eq!(ctx.day(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(ctx.source.to_string(), "yahoo_finance");
    }

    #[test]
    fn test_each_run_gets_its_own_id() {
        assert_ne!(RunContext::new(Source::Reddit).run_id, RunContext::new(Source::Reddit).run_id);
    }
}
