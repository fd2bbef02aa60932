//! Envelope encryption of whole JSON payloads into [`SealedRecord`]s.
//!
//! `seal` encrypts the payload under a fresh per-record key (DEK) and wraps
//! that key under the master key. `open` checks every field, unwraps the DEK,
//! then decrypts and parses the payload, stopping at the first failure.

use std::sync::Arc;

use chrono::Utc;
use common::{Algorithm, SealedRecord};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::error::Category;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::cipher::{self, CipherError, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::keys::{ConfigError, KeyProvider};

/// The only master key version that exists.
pub const CURRENT_KEY_VERSION: u32 = 1;

/// A sealed-record field failed its format or length check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The field is not a well-formed hex string.
    #[error("{field} is not valid hex")]
    MalformedHex { field: &'static str },

    /// The field decoded to the wrong number of bytes.
    #[error("{field} has invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The record was wrapped under a master key version this process does not hold.
    #[error("unsupported key version {0}")]
    UnsupportedKeyVersion(u32),
}

/// Errors produced by [`Envelope::seal`] and [`Envelope::open`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The master key could not be loaded.
    #[error("master key unavailable: {0}")]
    Config(#[from] ConfigError),

    /// A record field failed validation before any decryption was attempted.
    #[error("invalid sealed record: {0}")]
    Validation(#[from] ValidationError),

    /// The wrapped per-record key failed authentication under the master key.
    #[error("key unwrap failed: authentication failed")]
    Unwrap,

    /// The payload failed authentication under the per-record key.
    #[error("payload decryption failed: authentication failed")]
    Decrypt,

    /// The payload authenticated but is not valid JSON for the requested type.
    #[error("payload format error: {0}")]
    Format(String),

    /// Encryption or serialisation failed for an implementation-level reason.
    #[error("internal envelope error: {0}")]
    Internal(String),
}

/// Stateless seal/open engine over a shared master key provider.
///
/// Cheap to clone; every clone shares the same provider.
#[derive(Clone)]
pub struct Envelope {
    keys: Arc<dyn KeyProvider>,
}

impl Envelope {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Returns `true` if the master key is available.
    pub fn is_ready(&self) -> bool {
        self.keys.master_key().is_ok()
    }

    /// Encrypt `payload` for `owner_tag` into a new [`SealedRecord`].
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Config`] if the master key is unavailable and
    /// [`EnvelopeError::Internal`] if serialisation or encryption fails.
    pub fn seal<T: Serialize + ?Sized>(
        &self,
        owner_tag: &str,
        payload: &T,
    ) -> Result<SealedRecord, EnvelopeError> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(payload).map_err(|e| EnvelopeError::Internal(e.to_string()))?,
        );
        self.seal_bytes(owner_tag, &plaintext)
    }

    /// Verify `record` and decrypt its payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns the first failure in order: [`EnvelopeError::Validation`],
    /// [`EnvelopeError::Config`], [`EnvelopeError::Unwrap`],
    /// [`EnvelopeError::Decrypt`], [`EnvelopeError::Format`].
    pub fn open<T: DeserializeOwned>(&self, record: &SealedRecord) -> Result<T, EnvelopeError> {
        let plaintext = self.open_bytes(record)?;
        serde_json::from_slice(&plaintext).map_err(format_error)
    }

    fn seal_bytes(&self, owner_tag: &str, plaintext: &[u8]) -> Result<SealedRecord, EnvelopeError> {
        let master = self.keys.master_key()?;
        let dek = cipher::generate_key();

        let payload = cipher::encrypt(&dek[..], plaintext).map_err(internal)?;
        let wrapped = cipher::encrypt(master.as_bytes(), &dek[..]).map_err(internal)?;
        drop(dek);

        let record = SealedRecord {
            id: Uuid::new_v4(),
            owner_tag: owner_tag.to_owned(),
            created_at: Utc::now(),
            payload_nonce: hex::encode(payload.nonce),
            payload_ciphertext: hex::encode(&payload.ciphertext),
            payload_tag: hex::encode(payload.tag),
            wrapped_key_nonce: hex::encode(wrapped.nonce),
            wrapped_key_ciphertext: hex::encode(&wrapped.ciphertext),
            wrapped_key_tag: hex::encode(wrapped.tag),
            algorithm: Algorithm::Aes256GcmSiv,
            key_version: CURRENT_KEY_VERSION,
        };
        debug!(record_id = %record.id, owner_tag = %record.owner_tag, "sealed record");
        Ok(record)
    }

    fn open_bytes(&self, record: &SealedRecord) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
        let fields = DecodedRecord::decode(record)?;
        let master = self.keys.master_key()?;

        let dek = cipher::decrypt(
            master.as_bytes(),
            &fields.wrapped_key_nonce,
            &fields.wrapped_key_ciphertext,
            &fields.wrapped_key_tag,
        )
        .map_err(|_| EnvelopeError::Unwrap)?;

        let plaintext = cipher::decrypt(
            &dek,
            &fields.payload_nonce,
            &fields.payload_ciphertext,
            &fields.payload_tag,
        )
        .map_err(|_| EnvelopeError::Decrypt)?;
        drop(dek);

        debug!(record_id = %record.id, "opened record");
        Ok(plaintext)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope").finish_non_exhaustive()
    }
}

/// Describe a parse failure by category and position only; serde_json's own
/// message can quote decrypted values.
fn format_error(e: serde_json::Error) -> EnvelopeError {
    let category = match e.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    };
    EnvelopeError::Format(format!(
        "{category} error at line {} column {}",
        e.line(),
        e.column()
    ))
}

fn internal(e: CipherError) -> EnvelopeError {
    EnvelopeError::Internal(e.to_string())
}

/// Raw bytes of a [`SealedRecord`] after format and length checks.
struct DecodedRecord {
    payload_nonce: [u8; NONCE_LEN],
    payload_tag: [u8; TAG_LEN],
    wrapped_key_nonce: [u8; NONCE_LEN],
    wrapped_key_ciphertext: [u8; KEY_LEN],
    wrapped_key_tag: [u8; TAG_LEN],
    payload_ciphertext: Vec<u8>,
}

impl DecodedRecord {
    fn decode(record: &SealedRecord) -> Result<Self, ValidationError> {
        if record.key_version != CURRENT_KEY_VERSION {
            return Err(ValidationError::UnsupportedKeyVersion(record.key_version));
        }
        Ok(Self {
            payload_nonce: decode_fixed("payload_nonce", &record.payload_nonce)?,
            payload_tag: decode_fixed("payload_tag", &record.payload_tag)?,
            wrapped_key_nonce: decode_fixed("wrapped_key_nonce", &record.wrapped_key_nonce)?,
            wrapped_key_ciphertext: decode_fixed(
                "wrapped_key_ciphertext",
                &record.wrapped_key_ciphertext,
            )?,
            wrapped_key_tag: decode_fixed("wrapped_key_tag", &record.wrapped_key_tag)?,
            payload_ciphertext: decode_hex("payload_ciphertext", &record.payload_ciphertext)?,
        })
    }
}

fn decode_hex(field: &'static str, value: &str) -> Result<Vec<u8>, ValidationError> {
    hex::decode(value).map_err(|_| ValidationError::MalformedHex { field })
}

fn decode_fixed<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], ValidationError> {
    let bytes = decode_hex(field, value)?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| ValidationError::InvalidLength {
            field,
            expected: N,
            actual,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{MasterKey, MockKeyProvider, StaticKey};
    use serde::Deserialize;
    use serde_json::{json, Value};

    fn envelope_with(key: [u8; KEY_LEN]) -> Envelope {
        Envelope::new(Arc::new(StaticKey::new(MasterKey::from_bytes(key))))
    }

    fn envelope() -> Envelope {
        envelope_with(*cipher::generate_key())
    }

    /// Decode a hex field, flip one byte, and re-encode it.
    fn flip_byte(field: &str, index: usize) -> String {
        let mut bytes = hex::decode(field).unwrap();
        bytes[index] ^= 0x01;
        hex::encode(bytes)
    }

    #[test]
    fn round_trip() {
        let env = envelope();
        let payload = json!({"amount": 100, "currency": "AED"});
        let record = env.seal("party_123", &payload).unwrap();
        let opened: Value = env.open(&record).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn round_trip_nested_and_scalar_payloads() {
        let env = envelope();
        for payload in [
            json!({"a": [1, 2, {"b": null}], "c": true, "d": "ünïcødé"}),
            json!([1, "two", 3.5]),
            json!("just a string"),
            json!(null),
        ] {
            let record = env.seal("t", &payload).unwrap();
            assert_eq!(env.open::<Value>(&record).unwrap(), payload);
        }
    }

    #[test]
    fn empty_payload_round_trip() {
        let env = envelope();
        let record = env.seal("party_123", &json!({})).unwrap();
        assert_eq!(env.open::<Value>(&record).unwrap(), json!({}));
    }

    #[test]
    fn typed_payload_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Transfer {
            amount: u64,
            currency: String,
        }
        let env = envelope();
        let transfer = Transfer {
            amount: 100,
            currency: "AED".into(),
        };
        let record = env.seal("party_123", &transfer).unwrap();
        assert_eq!(env.open::<Transfer>(&record).unwrap(), transfer);
    }

    #[test]
    fn record_metadata_and_lengths() {
        let env = envelope();
        let record = env.seal("party_123", &json!({"k": "v"})).unwrap();
        assert_eq!(record.owner_tag, "party_123");
        assert_eq!(record.algorithm, Algorithm::Aes256GcmSiv);
        assert_eq!(record.key_version, CURRENT_KEY_VERSION);
        assert_eq!(record.payload_nonce.len(), NONCE_LEN * 2);
        assert_eq!(record.payload_tag.len(), TAG_LEN * 2);
        assert_eq!(record.wrapped_key_nonce.len(), NONCE_LEN * 2);
        assert_eq!(record.wrapped_key_ciphertext.len(), KEY_LEN * 2);
        assert_eq!(record.wrapped_key_tag.len(), TAG_LEN * 2);
        assert_eq!(record.payload_ciphertext, record.payload_ciphertext.to_lowercase());
    }

    #[test]
    fn sealing_twice_differs() {
        let env = envelope();
        let payload = json!({"amount": 100, "currency": "AED"});
        let a = env.seal("party_123", &payload).unwrap();
        let b = env.seal("party_123", &payload).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.payload_nonce, b.payload_nonce);
        assert_ne!(a.wrapped_key_nonce, b.wrapped_key_nonce);
        assert_ne!(a.payload_ciphertext, b.payload_ciphertext);
        assert_eq!(env.open::<Value>(&a).unwrap(), payload);
        assert_eq!(env.open::<Value>(&b).unwrap(), payload);
    }

    #[test]
    fn uppercase_hex_accepted() {
        let env = envelope();
        let payload = json!({"x": 1});
        let mut record = env.seal("t", &payload).unwrap();
        record.payload_ciphertext = record.payload_ciphertext.to_uppercase();
        record.wrapped_key_tag = record.wrapped_key_tag.to_uppercase();
        assert_eq!(env.open::<Value>(&record).unwrap(), payload);
    }

    #[test]
    fn tampered_payload_ciphertext_fails_decrypt() {
        let env = envelope();
        let record = env.seal("t", &json!({"amount": 100})).unwrap();
        let len = record.payload_ciphertext.len() / 2;
        for i in 0..len {
            let mut tampered = record.clone();
            tampered.payload_ciphertext = flip_byte(&record.payload_ciphertext, i);
            assert!(matches!(
                env.open::<Value>(&tampered),
                Err(EnvelopeError::Decrypt)
            ));
        }
    }

    #[test]
    fn tampered_payload_tag_fails_decrypt() {
        let env = envelope();
        let record = env.seal("t", &json!({"amount": 100})).unwrap();
        for i in 0..TAG_LEN {
            let mut tampered = record.clone();
            tampered.payload_tag = flip_byte(&record.payload_tag, i);
            assert!(matches!(
                env.open::<Value>(&tampered),
                Err(EnvelopeError::Decrypt)
            ));
        }
    }

    #[test]
    fn tampered_payload_nonce_fails_decrypt() {
        let env = envelope();
        let mut record = env.seal("t", &json!({"amount": 100})).unwrap();
        record.payload_nonce = flip_byte(&record.payload_nonce, 0);
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Decrypt)
        ));
    }

    #[test]
    fn tampered_wrapped_key_fails_unwrap() {
        let env = envelope();
        let record = env.seal("t", &json!({"amount": 100})).unwrap();
        for i in 0..KEY_LEN {
            let mut tampered = record.clone();
            tampered.wrapped_key_ciphertext = flip_byte(&record.wrapped_key_ciphertext, i);
            assert!(matches!(
                env.open::<Value>(&tampered),
                Err(EnvelopeError::Unwrap)
            ));
        }
        for i in 0..TAG_LEN {
            let mut tampered = record.clone();
            tampered.wrapped_key_tag = flip_byte(&record.wrapped_key_tag, i);
            assert!(matches!(
                env.open::<Value>(&tampered),
                Err(EnvelopeError::Unwrap)
            ));
        }
    }

    #[test]
    fn wrong_master_key_fails_unwrap() {
        let sealer = envelope_with([0xA1; KEY_LEN]);
        let opener = envelope_with([0xB2; KEY_LEN]);
        for payload in [json!({}), json!({"amount": 100}), json!([1, 2, 3])] {
            let record = sealer.seal("t", &payload).unwrap();
            assert!(matches!(
                opener.open::<Value>(&record),
                Err(EnvelopeError::Unwrap)
            ));
        }
    }

    #[test]
    fn short_payload_nonce_rejected() {
        let env = envelope();
        let mut record = env.seal("t", &json!({})).unwrap();
        record.payload_nonce = hex::encode([0u8; 10]);
        match env.open::<Value>(&record) {
            Err(EnvelopeError::Validation(ValidationError::InvalidLength {
                field,
                expected,
                actual,
            })) => {
                assert_eq!(field, "payload_nonce");
                assert_eq!(expected, 12);
                assert_eq!(actual, 10);
            }
            other => panic!("expected length error, got {other:?}"),
        }
    }

    #[test]
    fn long_payload_tag_rejected() {
        let env = envelope();
        let mut record = env.seal("t", &json!({})).unwrap();
        record.payload_tag = hex::encode([0u8; 14]);
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Validation(ValidationError::InvalidLength {
                field: "payload_tag",
                expected: 16,
                actual: 14,
            }))
        ));
    }

    #[test]
    fn non_hex_field_rejected() {
        let env = envelope();
        let mut record = env.seal("t", &json!({})).unwrap();
        record.wrapped_key_nonce = "zz".repeat(NONCE_LEN);
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Validation(ValidationError::MalformedHex {
                field: "wrapped_key_nonce"
            }))
        ));

        let mut record = env.seal("t", &json!({})).unwrap();
        record.payload_ciphertext.push('g');
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Validation(ValidationError::MalformedHex {
                field: "payload_ciphertext"
            }))
        ));
    }

    #[test]
    fn unsupported_key_version_rejected() {
        let env = envelope();
        let mut record = env.seal("t", &json!({})).unwrap();
        record.key_version = 2;
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Validation(ValidationError::UnsupportedKeyVersion(2)))
        ));
    }

    #[test]
    fn validation_runs_before_key_load() {
        let sealer = envelope();
        let mut record = sealer.seal("t", &json!({})).unwrap();
        record.wrapped_key_tag = hex::encode([0u8; 3]);

        // The provider must never be consulted for an invalid record.
        let mut keys = MockKeyProvider::new();
        keys.expect_master_key().times(0);
        let opener = Envelope::new(Arc::new(keys));
        assert!(matches!(
            opener.open::<Value>(&record),
            Err(EnvelopeError::Validation(_))
        ));
    }

    #[test]
    fn key_load_failure_propagates_unchanged() {
        let sealer = envelope();
        let record = sealer.seal("t", &json!({"a": 1})).unwrap();

        let mut keys = MockKeyProvider::new();
        keys.expect_master_key()
            .returning(|| Err(ConfigError::WrongLength { actual: 16 }));
        let broken = Envelope::new(Arc::new(keys));

        assert!(matches!(
            broken.open::<Value>(&record),
            Err(EnvelopeError::Config(ConfigError::WrongLength { actual: 16 }))
        ));
        assert!(matches!(
            broken.seal("t", &json!({})),
            Err(EnvelopeError::Config(ConfigError::WrongLength { actual: 16 }))
        ));
        assert!(!broken.is_ready());
    }

    #[test]
    fn non_json_plaintext_is_format_error() {
        let env = envelope();
        let record = env.seal_bytes("t", b"{not json").unwrap();
        assert!(matches!(
            env.open::<Value>(&record),
            Err(EnvelopeError::Format(_))
        ));
    }

    #[test]
    fn mismatched_type_is_format_error() {
        let env = envelope();
        let record = env.seal("t", &json!({"amount": "lots"})).unwrap();
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Transfer {
            amount: u64,
        }
        match env.open::<Transfer>(&record) {
            Err(EnvelopeError::Format(msg)) => {
                assert!(msg.starts_with("data error"), "got: {msg}");
                assert!(!msg.contains("lots"));
            }
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn open_does_not_mutate_record() {
        let env = envelope();
        let record = env.seal("t", &json!({"a": 1})).unwrap();
        let before = record.clone();
        let _: Value = env.open(&record).unwrap();
        let _: Value = env.open(&record).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn errors_never_echo_field_bytes() {
        let env = envelope();
        let mut record = env.seal("t", &json!({"secret": "hunter2"})).unwrap();
        record.payload_tag = flip_byte(&record.payload_tag, 0);
        let msg = env.open::<Value>(&record).unwrap_err().to_string();
        assert!(!msg.contains(&record.payload_tag));
        assert!(!msg.contains("hunter2"));
        assert!(msg.contains("authentication failed"));
    }
}
