//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is present but invalid.
//! The master key itself is not part of this struct; only the name of the
//! variable that holds it is.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated vault service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Name of the environment variable holding the hex-encoded master key.
    #[serde(default = "default_master_key_var")]
    pub master_key_var: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_master_key_var() -> String {
    "MASTER_KEY".into()
}
fn default_request_timeout() -> u64 {
    crate::server::middleware::REQUEST_TIMEOUT.as_secs()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.master_key_var.trim().is_empty() {
            anyhow::bail!("MASTER_KEY_VAR must not be empty");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            master_key_var: default_master_key_var(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
        }
    }
}
