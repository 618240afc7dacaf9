//! Opaque per-device key storage.
//!
//! The keystore is a string-keyed blob store with no cryptographic logic of
//! its own. The protocol persists three entries: the device alias and the two
//! halves of the device key pair. The note key is deliberately NOT a keystore
//! entry - it lives in memory only and is re-obtained from the directory
//! after a restart.

use async_trait::async_trait;
use thiserror::Error;

/// Entry holding the SPKI DER encoding of the device's public key.
pub const PUBLIC_KEY_ENTRY: &str = "publicKey";

/// Entry holding the PKCS#8 DER encoding of the device's private key.
pub const PRIVATE_KEY_ENTRY: &str = "privateKey";

/// Entry holding the UTF-8 device alias.
pub const DEVICE_ALIAS_ENTRY: &str = "deviceAlias";

/// Errors from the underlying store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// The backing store failed or returned corrupt data.
    #[error("keystore access failed: {0}")]
    Backend(String),
}

/// Opaque persistent store for device key material.
///
/// # Contract
///
/// - `put` overwrites an existing entry of the same name
/// - `get` of an absent entry is `Ok(None)`, not an error
/// - `clear` removes every entry, including ones this crate does not know
///   about; it is the revocation/logout wipe primitive
#[async_trait]
pub trait KeyStore: Send + Sync + 'static {
    /// Read an entry. `None` if absent.
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeyStoreError>;

    /// Write an entry, replacing any previous value.
    async fn put(&self, name: &str, value: Vec<u8>) -> Result<(), KeyStoreError>;

    /// Remove one entry. Removing an absent entry succeeds.
    async fn delete(&self, name: &str) -> Result<(), KeyStoreError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), KeyStoreError>;
}
