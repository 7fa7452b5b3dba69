//! Application setup and server configuration.

use axum::{extract::Extension, routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use crate::runner::Watchman;
use crate::server::routes::{health_handler, reddit_handler, twitter_handler, yahoo_finance_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub watchman: Watchman,
}

/// Build the Axum application router
///
/// Each source has one trigger route answering GET and POST, so both
/// schedulers and manual calls can start a run.
pub fn build_app(pool: PgPool, watchman: Watchman) -> Router {
    let state = AppState {
        db_pool: pool,
        watchman,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/reddit", get(reddit_handler).post(reddit_handler))
        .route("/twitter", get(twitter_handler).post(twitter_handler))
        .route("/yahoo-finance", get(yahoo_finance_handler).post(yahoo_finance_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
