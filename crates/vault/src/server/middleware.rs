//! Axum middleware applied to the router.
//!
//! Request tracing, timeout enforcement and response compression come from
//! `tower-http`; the vault adds a `Cache-Control: no-store` header so that
//! decrypted payloads are never kept by intermediaries.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Mark every response as non-cacheable.
pub async fn no_store(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    resp.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    resp
}
