//! Master key loading and the read-only provider handed to the envelope cipher.
//!
//! # Lifecycle
//!
//! 1. At startup, `main` builds an [`EnvMasterKey`] for the configured
//!    variable and forces one load so a bad key aborts the process early.
//! 2. The decoded key lives only in process memory behind an `Arc`; it is
//!    never mutated, rotated or re-read afterwards.
//! 3. Every `seal`/`open` asks the provider for the key and drops its `Arc`
//!    clone when done.
//!
//! # Security invariants
//!
//! - The master key is **never** written to disk, logged, or included in traces.
//! - Only one key version exists; there is no lookup by version.

pub mod master;

pub use master::{ConfigError, EnvMasterKey, KeyProvider, MasterKey};

#[cfg(test)]
pub use master::StaticKey;

#[cfg(test)]
pub use master::MockKeyProvider;
