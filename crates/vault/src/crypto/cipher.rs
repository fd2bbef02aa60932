//! AES-256-GCM-SIV encryption and decryption with detached tags.
//!
//! **Algorithm choice:** AES-256-GCM-SIV (RFC 8452) is nonce-misuse-resistant.
//! Nonces are still drawn fresh from the OS CSPRNG on every call; the SIV
//! construction only limits the damage if the RNG ever repeats.

use aes_gcm_siv::{
    aead::{rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    Aes256GcmSiv, Nonce, Tag,
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of an AES-GCM-SIV authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Output of one AEAD encryption: nonce, ciphertext and detached tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    /// Same length as the plaintext.
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AES-GCM-SIV encryption failed, or decryption failed authentication.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Generate a fresh random 256-bit key, zeroized on drop.
pub fn generate_key() -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut key[..]);
    key
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key and a plaintext under the RFC 8452 size limit).
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Sealed, CipherError> {
    let cipher = build_cipher(key)?;
    let nonce = generate_nonce();

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(Sealed {
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Verify `tag` and decrypt `ciphertext` under `key`.
///
/// The plaintext is returned in a zeroizing buffer. On failure nothing about
/// the tag comparison is reported beyond [`CipherError::AeadFailure`].
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key or tampered data).
pub fn decrypt(
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let cipher = build_cipher(key)?;
    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| CipherError::AeadFailure)?;
    Ok(buffer)
}

fn build_cipher(key: &[u8]) -> Result<Aes256GcmSiv, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256GcmSiv::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
