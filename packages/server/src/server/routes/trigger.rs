use axum::extract::{Extension, Query};
use serde::Deserialize;

use watchman::Source;

use crate::server::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TriggerParams {
    /// 1-based round of the day's close-price runs.
    pub round: Option<usize>,
}

/// Run the Reddit pipeline; the body is the completion or error text.
pub async fn reddit_handler(Extension(state): Extension<AppState>) -> String {
    state.watchman.trigger(Source::Reddit, None).await
}

pub async fn twitter_handler(Extension(state): Extension<AppState>) -> String {
    state.watchman.trigger(Source::Twitter, None).await
}

/// Run one close-price round (`?round=N`, default 1).
pub async fn yahoo_finance_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<TriggerParams>,
) -> String {
    state.watchman.trigger(Source::YahooFinance, params.round).await
}
