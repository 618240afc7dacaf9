//! Error types for notelock cryptographic operations.
//!
//! Failure classes are kept distinct on purpose: a wrapped key that fails to
//! decrypt ([`CryptoError::UnwrapFailed`]) means local and remote key state
//! have diverged, while a missing wrapped key is a directory-level condition
//! and never reaches this crate. Callers match on variants to decide between
//! retry and abort.

use thiserror::Error;

/// Errors from key generation, encoding, wrapping, and note encryption.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Key-pair generation failed (RNG failure or unsupported parameters).
    /// Fatal to initialization; never retried silently.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Requested RSA modulus is below [`crate::MIN_RSA_BITS`].
    #[error("modulus too small: {bits} bits (minimum 2048)")]
    InvalidModulus {
        /// Requested modulus size in bits.
        bits: usize,
    },

    /// A public key could not be decoded from its Base64 SPKI form.
    #[error("invalid public key encoding: {0}")]
    InvalidPublicKey(String),

    /// A private key could not be decoded from its PKCS#8 DER form.
    #[error("invalid private key encoding: {0}")]
    InvalidPrivateKey(String),

    /// Key material could not be serialized for persistence or transport.
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    /// RSA-OAEP wrapping of the note key failed.
    #[error("note key wrapping failed: {0}")]
    WrapFailed(String),

    /// A wrapped note key was not valid Base64.
    #[error("invalid wrapped key encoding: {0}")]
    InvalidWrappedKey(String),

    /// A wrapped note key did not decrypt under this device's private key.
    ///
    /// Distinct from "no wrapped key exists": this indicates the record was
    /// produced for a different key pair or with mismatched OAEP parameters.
    #[error("wrapped note key did not decrypt under this private key")]
    UnwrapFailed,

    /// AES-GCM encryption failed.
    #[error("note encryption failed: {0}")]
    EncryptionFailed(String),

    /// A ciphertext blob was malformed (truncated or not valid Base64).
    #[error("invalid ciphertext blob: {0}")]
    InvalidBlob(String),

    /// The GCM authentication tag did not verify (tampering or wrong key).
    #[error("integrity check failed")]
    IntegrityCheckFailed,

    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted payload is not valid UTF-8")]
    InvalidPlaintext,
}

#[cfg(test)]
mod tests {
    use super::CryptoError;

    #[test]
    fn unwrap_failure_is_distinct_from_encoding_failure() {
        let unwrap_err = CryptoError::UnwrapFailed;
        let encoding_err = CryptoError::InvalidWrappedKey("bad base64".to_string());

        assert!(matches!(unwrap_err, CryptoError::UnwrapFailed));
        assert!(!matches!(encoding_err, CryptoError::UnwrapFailed));
    }

    #[test]
    fn error_messages_name_the_failing_operation() {
        let err = CryptoError::InvalidModulus { bits: 1024 };
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("2048"));
    }
}
