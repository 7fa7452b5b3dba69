//! Typed errors for the watchman library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure kind and decide whether a run is fatal.

use thiserror::Error;

/// Errors that can occur while fetching, normalizing or loading data.
#[derive(Debug, Error)]
pub enum WatchmanError {
    /// OAuth handshake returned non-200 or the token was missing from the response
    #[error("authentication failed for {source_name}: {reason}")]
    Authentication { source_name: String, reason: String },

    /// A data call kept failing after the retry policy was exhausted
    #[error("fetch failed for {url}: HTTP {status}: {body}")]
    TransientFetch {
        url: String,
        status: u16,
        body: String,
    },

    /// One unit (community, region, batch) failed; siblings continue
    #[error("partial failure in {unit}: {reason}")]
    PartialSource { unit: String, reason: String },

    /// Destination load job did not reach a successful terminal state
    #[error("load into {table} failed: job status {status}")]
    LoadFailure { table: String, status: String },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding error
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Table identifier rejected by validation
    #[error("invalid table id: {0}")]
    InvalidTable(String),

    /// Row does not match the destination column schema
    #[error("schema mismatch for {table}: {reason}")]
    Schema { table: String, reason: String },

    /// Warehouse backend failure
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid settings
    #[error("config error: {0}")]
    Config(String),
}

impl WatchmanError {
    pub fn auth(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Authentication {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn partial(unit: impl Into<String>, reason: impl ToString) -> Self {
        Self::PartialSource {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for WatchmanError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(Box::new(e))
    }
}

/// Result type alias for watchman operations.
pub type Result<T> = std::result::Result<T, WatchmanError>;
