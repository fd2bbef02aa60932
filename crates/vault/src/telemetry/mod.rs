//! Structured logging setup.
//!
//! The vault emits JSON logs to stdout through `tracing-subscriber`.
//!
//! # Telemetry invariants
//!
//! - **No payloads, plaintext or key material** may appear in any span
//!   attribute or log field. Record ids, owner tags and error kinds are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
