//! [`MasterKey`] parsing and the load-once environment provider.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;

/// Errors produced while loading the master key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No key value was supplied (absent or empty).
    #[error("missing master key")]
    MissingKey,

    /// The value contains characters outside the hex alphabet, or has odd length.
    #[error("malformed hex in master key")]
    MalformedHex,

    /// The value decoded to something other than [`KEY_LEN`] bytes.
    #[error("wrong master key length: expected {KEY_LEN} bytes, got {actual}")]
    WrongLength { actual: usize },
}

/// Long-lived 256-bit key that wraps every per-record key.
///
/// The bytes are overwritten with zeroes on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_LEN]);

impl MasterKey {
    /// Parse a master key from its hex configuration value.
    ///
    /// Checks, in order: present and non-empty, hex alphabet only (either
    /// case, no surrounding whitespace), exactly [`KEY_LEN`] decoded bytes.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] for the first check that fails.
    pub fn from_hex(value: Option<&str>) -> Result<Self, ConfigError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(ConfigError::MissingKey),
        };
        let mut bytes = hex::decode(value).map_err(|_| ConfigError::MalformedHex)?;
        if bytes.len() != KEY_LEN {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(ConfigError::WrongLength { actual });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Build a key directly from raw bytes.
    #[cfg(test)]
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Read the master key from the environment variable `var`.
///
/// Performs a fresh read and decode on every call. Use [`EnvMasterKey`] to
/// load once per process.
pub fn load_master_key(var: &str) -> Result<MasterKey, ConfigError> {
    let value = std::env::var(var).ok();
    MasterKey::from_hex(value.as_deref())
}

/// Source of the master key used by the envelope cipher.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// Return the current master key.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if no valid key is available.
    fn master_key(&self) -> Result<Arc<MasterKey>, ConfigError>;
}

/// Provider backed by an already-loaded key.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct StaticKey(Arc<MasterKey>);

#[cfg(test)]
impl StaticKey {
    pub fn new(key: MasterKey) -> Self {
        Self(Arc::new(key))
    }
}

#[cfg(test)]
impl KeyProvider for StaticKey {
    fn master_key(&self) -> Result<Arc<MasterKey>, ConfigError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Provider that reads an environment variable on first use and keeps the
/// outcome for the life of the process.
///
/// The cell only ever moves from unset to set. A failed load is cached too,
/// since the environment does not change under a running process.
pub struct EnvMasterKey {
    var: String,
    load: fn(&str) -> Result<MasterKey, ConfigError>,
    cell: OnceLock<Result<Arc<MasterKey>, ConfigError>>,
}

impl EnvMasterKey {
    /// Create a provider for the environment variable `var`. Nothing is read yet.
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            load: load_master_key,
            cell: OnceLock::new(),
        }
    }

    /// Same caching, with `load` standing in for the environment read.
    #[cfg(test)]
    fn with_loader(
        var: impl Into<String>,
        load: fn(&str) -> Result<MasterKey, ConfigError>,
    ) -> Self {
        Self {
            var: var.into(),
            load,
            cell: OnceLock::new(),
        }
    }
}

impl std::fmt::Debug for EnvMasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvMasterKey")
            .field("var", &self.var)
            .field("loaded", &self.cell.get().map(Result::is_ok))
            .finish()
    }
}

impl KeyProvider for EnvMasterKey {
    fn master_key(&self) -> Result<Arc<MasterKey>, ConfigError> {
        self.cell
            .get_or_init(|| {
                let res = (self.load)(&self.var).map(Arc::new);
                match &res {
                    Ok(_) => debug!(var = %self.var, "master key loaded"),
                    Err(e) => warn!(var = %self.var, error = %e, "master key unavailable"),
                }
                res
            })
            .clone()
    }
}
