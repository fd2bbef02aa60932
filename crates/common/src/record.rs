//! The sealed record: the only entity persisted or transmitted by the vault.
//!
//! Every byte-string field is carried as hex text. Lengths are not enforced
//! here; the envelope cipher checks them before any cryptographic work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// AEAD scheme used for both the payload and the wrapped key.
///
/// Only one scheme exists. An unknown discriminant fails deserialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256-GCM-SIV (RFC 8452), 96-bit nonce, 128-bit tag.
    #[serde(rename = "aes-256-gcm-siv")]
    Aes256GcmSiv,
}

/// Self-contained, tamper-evident ciphertext bundle produced by `seal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedRecord {
    /// Unique record id, fixed at seal time.
    pub id: Uuid,
    /// Caller-supplied owner reference. Stored verbatim, never encrypted.
    pub owner_tag: String,
    /// Seal time (UTC).
    pub created_at: DateTime<Utc>,
    /// 12-byte nonce used with the per-record key.
    pub payload_nonce: String,
    /// Encrypted JSON serialisation of the payload.
    pub payload_ciphertext: String,
    /// 16-byte tag over the payload ciphertext.
    pub payload_tag: String,
    /// 12-byte nonce used with the master key.
    pub wrapped_key_nonce: String,
    /// 32-byte per-record key encrypted under the master key.
    pub wrapped_key_ciphertext: String,
    /// 16-byte tag over the wrapped key.
    pub wrapped_key_tag: String,
    pub algorithm: Algorithm,
    /// Master key version that produced the `wrapped_key_*` fields.
    pub key_version: u32,
}
