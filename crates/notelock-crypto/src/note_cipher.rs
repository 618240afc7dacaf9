//! Note payload encryption with the shared note key.
//!
//! Blob layout is `Base64(IV) ‖ Base64(ciphertext ‖ tag)`. The IV is 12 bytes,
//! which encodes to exactly [`IV_BASE64_LEN`] standard-alphabet Base64
//! characters with no padding, so decryption slices the blob at a fixed
//! offset instead of carrying a length prefix.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::{CryptoRng, RngCore};

use crate::{error::CryptoError, symmetric::NoteKey};

/// Size of the AES-GCM IV in bytes.
pub const IV_SIZE: usize = 12;

/// Length of the Base64-encoded IV prefix in a ciphertext blob.
///
/// 12 bytes is a multiple of 3, so the encoding is padding-free and always
/// 16 characters. This constant is the blob's split point.
pub const IV_BASE64_LEN: usize = 16;

/// Encrypt a note payload.
///
/// Draws a fresh random IV from `rng` on every call; encrypting the same
/// plaintext twice produces different blobs that both decrypt to it.
pub fn encrypt_note<R: CryptoRng + RngCore>(
    rng: &mut R,
    key: &NoteKey,
    plaintext: &str,
) -> Result<String, CryptoError> {
    let mut iv = [0u8; IV_SIZE];
    rng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut blob = BASE64.encode(iv);
    debug_assert_eq!(blob.len(), IV_BASE64_LEN);
    blob.push_str(&BASE64.encode(ciphertext));

    Ok(blob)
}

/// Decrypt a note blob produced by [`encrypt_note`].
///
/// # Errors
///
/// - [`CryptoError::InvalidBlob`]: blob shorter than the IV prefix or not
///   valid Base64
/// - [`CryptoError::IntegrityCheckFailed`]: GCM tag mismatch (tampering or a
///   different key)
/// - [`CryptoError::InvalidPlaintext`]: decrypted bytes are not UTF-8
pub fn decrypt_note(key: &NoteKey, blob: &str) -> Result<String, CryptoError> {
    let (iv_b64, ciphertext_b64) = blob
        .split_at_checked(IV_BASE64_LEN)
        .ok_or_else(|| CryptoError::InvalidBlob("blob shorter than encoded IV".to_string()))?;

    let iv = BASE64
        .decode(iv_b64)
        .map_err(|e| CryptoError::InvalidBlob(format!("IV prefix: {e}")))?;
    let ciphertext = BASE64
        .decode(ciphertext_b64)
        .map_err(|e| CryptoError::InvalidBlob(format!("ciphertext: {e}")))?;

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| CryptoError::IntegrityCheckFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
}
