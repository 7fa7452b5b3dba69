//! Social and Market Data Ingestion
//!
//! Pulls Reddit posts, tweets and Yahoo Finance prices, normalizes every
//! response into typed records, and loads them into fixed-schema warehouse
//! tables.
//!
//! # Flow
//!
//! ```text
//! pagination -> http (fetch + retry) -> normalize -> result_set -> sink
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use watchman::{RedditClient, RedditPipeline, RunContext, Source, SinkLoader, MemoryWarehouse};
//! use watchman::{RedditCredentials, RedditSettings, ReqwestFetcher, TableNames};
//!
//! let fetcher = Arc::new(ReqwestFetcher::new(Duration::from_secs(30))?);
//! let client = RedditClient::new(fetcher, credentials, RedditSettings::default());
//! let pipeline = RedditPipeline::new(client, SinkLoader::new(MemoryWarehouse::new()), TableNames::default());
//!
//! let summary = pipeline.run(&RunContext::new(Source::Reddit)).await?;
//! println!("{}", summary);
//! ```
//!
//! # Modules
//!
//! - [`http`] - Fetch client trait, reqwest implementation, retry policy
//! - [`pagination`] - Cursor-driven page loop under a row/page budget
//! - [`sources`] - Reddit, Twitter and Yahoo Finance clients
//! - [`normalize`] - Pure response-to-record transforms
//! - [`records`] - Typed records and their table schemas
//! - [`result_set`] - Per-run keyed accumulator
//! - [`sink`] - Warehouse trait, loader, memory and PostgreSQL backends
//! - [`pipeline`] - End-to-end runs per source
//! - [`testing`] - Mock fetcher and wire-format fixtures

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod normalize;
pub mod pagination;
pub mod pipeline;
pub mod records;
pub mod result_set;
pub mod security;
pub mod sink;
pub mod sources;
pub mod testing;

pub use config::{RedditSettings, TableNames, TwitterSettings, YahooFinanceSettings};
pub use context::{RunContext, Source};
pub use error::{Result, WatchmanError};
pub use http::{fetch_with_retry, Exhausted, FetchRequest, FetchResponse, HttpFetcher, ReqwestFetcher, RetryPolicy};
pub use pagination::{paginate, Page, PageBudget, PagedSource};
pub use pipeline::{
    RedditPipeline, RunSummary, StaticTickers, TickerSource, TwitterPipeline, YahooFinancePipeline,
};
pub use records::{ClosePrice, NotFoundCause, RedditPost, TableRecord, TickerNotFound, TrendingTicker, Tweet};
pub use result_set::ResultSet;
pub use security::{RedditCredentials, SecretString};
pub use sink::{JobStatus, MemoryWarehouse, SinkLoader, TableId, Warehouse};
pub use sources::{Harvest, RedditClient, TwitterClient, YahooFinanceClient};

#[cfg(feature = "postgres")]
pub use pipeline::PgTickerSource;
#[cfg(feature = "postgres")]
pub use sink::PostgresWarehouse;
