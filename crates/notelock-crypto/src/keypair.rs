//! Device key-pair lifecycle: generation, persistence encoding, SPKI export.
//!
//! Every device owns exactly one RSA-OAEP key pair for its whole lifetime.
//! The Base64 SPKI export of the public half is the device's canonical
//! identifier in the directory and in wrapped-key lookups, so the pair must
//! never be silently regenerated once wrapped-key records reference it.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::{CryptoRng, RngCore};
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
};

use crate::error::CryptoError;

/// Minimum accepted RSA modulus size in bits.
pub const MIN_RSA_BITS: usize = 2048;

/// A device's long-lived RSA-OAEP key pair.
///
/// The public exponent is 65537 and OAEP uses SHA-256 on both the wrap and
/// unwrap side; mismatched parameters make every wrapped-key record
/// unreadable for this device.
pub struct DeviceKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl DeviceKeyPair {
    /// Generate a fresh key pair with the given modulus size.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::InvalidModulus`] if `bits < MIN_RSA_BITS`
    /// - [`CryptoError::KeyGeneration`] if prime generation fails
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R, bits: usize) -> Result<Self, CryptoError> {
        if bits < MIN_RSA_BITS {
            return Err(CryptoError::InvalidModulus { bits });
        }

        let private = RsaPrivateKey::new(rng, bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self { private, public })
    }

    /// Reconstruct a persisted key pair from its PKCS#8 DER encoding.
    ///
    /// The public half is recomputed from the private key, so a keystore that
    /// lost the public entry still yields the identical exported identifier.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self { private, public })
    }

    /// PKCS#8 DER encoding of the private half, for keystore persistence.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = self
            .private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// SPKI DER encoding of the public half, for keystore persistence.
    pub fn public_key_spki_der(&self) -> Result<Vec<u8>, CryptoError> {
        let doc = self
            .public
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
        Ok(doc.as_bytes().to_vec())
    }

    /// The wrapping (public) half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The unwrapping (private) half.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

/// Export a public key to its canonical wire form: Base64 of the SPKI DER.
///
/// The encoding is deterministic, so it doubles as the device identifier in
/// the directory. Two devices never collide because the underlying moduli
/// are independently generated.
pub fn export_public_key(key: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    Ok(BASE64.encode(der.as_bytes()))
}

/// Import a public key from its canonical wire form.
///
/// # Errors
///
/// [`CryptoError::InvalidPublicKey`] on malformed Base64 or SPKI bytes. The
/// caller treats this as state divergence, not a transient condition.
pub fn import_public_key(encoded: &str) -> Result<RsaPublicKey, CryptoError> {
    let der = BASE64
        .decode(encoded)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::{DeviceKeyPair, MIN_RSA_BITS, export_public_key, import_public_key};
    use crate::error::CryptoError;

    #[test]
    fn generate_rejects_small_modulus() {
        let result = DeviceKeyPair::generate(&mut OsRng, 1024);
        assert!(matches!(result, Err(CryptoError::InvalidModulus { bits: 1024 })));
    }

    #[test]
    fn export_is_deterministic_and_round_trips() {
        let pair = DeviceKeyPair::generate(&mut OsRng, MIN_RSA_BITS).unwrap();

        let encoded = export_public_key(pair.public_key()).unwrap();
        let encoded_again = export_public_key(pair.public_key()).unwrap();
        assert_eq!(encoded, encoded_again);

        let imported = import_public_key(&encoded).unwrap();
        assert_eq!(&imported, pair.public_key());
    }

    #[test]
    fn persisted_pair_reloads_with_same_identifier() {
        let pair = DeviceKeyPair::generate(&mut OsRng, MIN_RSA_BITS).unwrap();
        let der = pair.to_pkcs8_der().unwrap();

        let reloaded = DeviceKeyPair::from_pkcs8_der(&der).unwrap();

        assert_eq!(
            export_public_key(pair.public_key()).unwrap(),
            export_public_key(reloaded.public_key()).unwrap()
        );
    }

    #[test]
    fn import_rejects_garbage() {
        assert!(matches!(
            import_public_key("not base64!!!"),
            Err(CryptoError::InvalidPublicKey(_))
        ));

        // Valid Base64 that is not an SPKI document
        assert!(matches!(
            import_public_key("aGVsbG8gd29ybGQ="),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }
}
