//! The shared note key and its RSA-OAEP wrap/unwrap operations.
//!
//! A [`NoteKey`] is created exactly once per account, by the seed device. It
//! is handed to other devices only in wrapped form: RSA-OAEP(SHA-256) over
//! the raw 32 key bytes, Base64-encoded for the wire. Any device holding the
//! unwrapped key can produce wrapped records for others.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::{CryptoRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Size of the note key in bytes (AES-256).
pub const NOTE_KEY_SIZE: usize = 32;

/// The account-wide AES-256-GCM note-encryption key.
///
/// Held in memory only; zeroized on drop. There is deliberately no
/// `PartialEq` and no raw-byte accessor in the public API: key equality
/// across devices is observed through encrypt/decrypt round trips.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NoteKey([u8; NOTE_KEY_SIZE]);

impl NoteKey {
    /// Generate a fresh random note key.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; NOTE_KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes, crate-internal only.
    pub(crate) fn as_bytes(&self) -> &[u8; NOTE_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("NoteKey(..)")
    }
}

/// Wrap the note key under a device's public key.
///
/// Returns the Base64 form stored by the directory as a wrapped-key record.
/// Wrapping is randomized (OAEP), so re-wrapping for the same device yields a
/// different record that unwraps to the same key.
pub fn wrap_note_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    key: &NoteKey,
    wrapping_key: &RsaPublicKey,
) -> Result<String, CryptoError> {
    let wrapped = wrapping_key
        .encrypt(rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::WrapFailed(e.to_string()))?;

    Ok(BASE64.encode(wrapped))
}

/// Unwrap a wrapped-key record with this device's private key.
///
/// # Errors
///
/// - [`CryptoError::InvalidWrappedKey`]: the record is not valid Base64
/// - [`CryptoError::UnwrapFailed`]: OAEP decryption failed or the payload is
///   not exactly [`NOTE_KEY_SIZE`] bytes - the record was produced for a
///   different key pair or with mismatched parameters
pub fn unwrap_note_key(
    wrapped_b64: &str,
    unwrapping_key: &RsaPrivateKey,
) -> Result<NoteKey, CryptoError> {
    let wrapped = BASE64
        .decode(wrapped_b64)
        .map_err(|e| CryptoError::InvalidWrappedKey(e.to_string()))?;

    let mut raw = unwrapping_key
        .decrypt(Oaep::new::<Sha256>(), &wrapped)
        .map_err(|_| CryptoError::UnwrapFailed)?;

    let bytes: [u8; NOTE_KEY_SIZE] =
        raw.as_slice().try_into().map_err(|_| CryptoError::UnwrapFailed)?;
    raw.zeroize();

    Ok(NoteKey(bytes))
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::{NoteKey, unwrap_note_key, wrap_note_key};
    use crate::{
        error::CryptoError,
        keypair::{DeviceKeyPair, MIN_RSA_BITS},
        note_cipher::{decrypt_note, encrypt_note},
    };

    fn test_pair() -> DeviceKeyPair {
        DeviceKeyPair::generate(&mut OsRng, MIN_RSA_BITS).unwrap()
    }

    #[test]
    fn wrap_unwrap_round_trip_preserves_key() {
        let pair = test_pair();
        let key = NoteKey::generate(&mut OsRng);

        let wrapped = wrap_note_key(&mut OsRng, &key, pair.public_key()).unwrap();
        let unwrapped = unwrap_note_key(&wrapped, pair.private_key()).unwrap();

        // Key equality via round trip: a blob from the original key must
        // decrypt under the unwrapped one.
        let blob = encrypt_note(&mut OsRng, &key, "probe").unwrap();
        assert_eq!(decrypt_note(&unwrapped, &blob).unwrap(), "probe");
    }

    #[test]
    fn unwrap_with_mismatched_private_key_fails_distinctly() {
        let pair = test_pair();
        let other_pair = test_pair();
        let key = NoteKey::generate(&mut OsRng);

        let wrapped = wrap_note_key(&mut OsRng, &key, pair.public_key()).unwrap();
        let result = unwrap_note_key(&wrapped, other_pair.private_key());

        assert!(matches!(result, Err(CryptoError::UnwrapFailed)));
    }

    #[test]
    fn rewrapping_yields_fresh_record_for_same_key() {
        let pair = test_pair();
        let key = NoteKey::generate(&mut OsRng);

        let first = wrap_note_key(&mut OsRng, &key, pair.public_key()).unwrap();
        let second = wrap_note_key(&mut OsRng, &key, pair.public_key()).unwrap();

        // OAEP is randomized
        assert_ne!(first, second);

        let blob = encrypt_note(&mut OsRng, &key, "same key").unwrap();
        let from_first = unwrap_note_key(&first, pair.private_key()).unwrap();
        let from_second = unwrap_note_key(&second, pair.private_key()).unwrap();
        assert_eq!(decrypt_note(&from_first, &blob).unwrap(), "same key");
        assert_eq!(decrypt_note(&from_second, &blob).unwrap(), "same key");
    }

    #[test]
    fn malformed_wrapped_record_is_an_encoding_error() {
        let pair = test_pair();

        let result = unwrap_note_key("%%% not base64 %%%", pair.private_key());
        assert!(matches!(result, Err(CryptoError::InvalidWrappedKey(_))));
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let key = NoteKey::generate(&mut OsRng);
        assert_eq!(format!("{key:?}"), "NoteKey(..)");
    }
}
