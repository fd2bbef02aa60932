//! Axum router construction.

use std::time::Duration;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/records", post(handlers::create))
        .route(
            "/records/:id",
            get(handlers::fetch).delete(handlers::delete),
        )
        .route("/records/:id/decrypt", post(handlers::decrypt))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(from_fn(middleware::no_store))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
