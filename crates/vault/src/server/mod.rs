//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Map engine and store errors onto HTTP status codes.
//!
//! Transport security is provided by the environment; the server speaks
//! plain HTTP.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
