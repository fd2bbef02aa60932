//! `envelope-vault` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured JSON logging.
//! 3. Load the master key once from the configured environment variable.
//! 4. Build the envelope engine and the in-memory record store.
//! 5. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod keys;
mod server;
mod store;
mod telemetry;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use crypto::Envelope;
use keys::{EnvMasterKey, KeyProvider};
use server::state::AppState;
use store::RecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        "envelope-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Master key
    // -----------------------------------------------------------------------
    let keys = EnvMasterKey::new(cfg.master_key_var.clone());
    keys.master_key()
        .with_context(|| format!("failed to load master key from {}", cfg.master_key_var))?;
    info!(var = %cfg.master_key_var, "master key loaded");

    // -----------------------------------------------------------------------
    // 4. Engine and storage
    // -----------------------------------------------------------------------
    let envelope = Envelope::new(Arc::new(keys));
    let state = AppState::new(envelope, RecordStore::new());

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
