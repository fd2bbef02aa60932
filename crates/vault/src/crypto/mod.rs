//! AES-256-GCM-SIV primitives and the envelope cipher built on them.
//!
//! This module is intentionally free of HTTP and storage dependencies.
//!
//! # Sealed record layout
//!
//! ```text
//! payload_nonce (12) | payload_ciphertext (n) | payload_tag (16)
//!     AEAD(DEK, payload JSON)
//! wrapped_key_nonce (12) | wrapped_key_ciphertext (32) | wrapped_key_tag (16)
//!     AEAD(master key, DEK)
//! ```
//!
//! Each field travels as hex. `key_version` enables future master key
//! migration without breaking existing records.

pub mod cipher;
pub mod envelope;

pub use cipher::KEY_LEN;
pub use envelope::{Envelope, EnvelopeError, ValidationError};
