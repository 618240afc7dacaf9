//! Device identity: a stable, locally generated alias.
//!
//! The alias is a UUID created on first run and persisted in the keystore.
//! It never changes for the lifetime of the device; it disappears only when
//! the device is revoked or logs out and the keystore is wiped.

use uuid::Builder;

use crate::{
    env::Environment,
    keystore::{DEVICE_ALIAS_ENTRY, KeyStore, KeyStoreError},
};

/// This device's identity within the account's roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    alias: String,
}

impl DeviceIdentity {
    /// Load the persisted alias, or generate and persist a fresh UUID.
    ///
    /// Idempotent: once an alias exists it is always returned unchanged. A
    /// stored alias that is not valid UTF-8 is corrupt and surfaces as a
    /// keystore error rather than being silently replaced.
    pub async fn load_or_create<S, E>(keystore: &S, env: &E) -> Result<Self, KeyStoreError>
    where
        S: KeyStore,
        E: Environment,
    {
        if let Some(bytes) = keystore.get(DEVICE_ALIAS_ENTRY).await? {
            let alias = String::from_utf8(bytes).map_err(|_| {
                KeyStoreError::Backend("device alias entry is not valid UTF-8".to_string())
            })?;
            return Ok(Self { alias });
        }

        let mut random = [0u8; 16];
        env.random_bytes(&mut random);
        let alias = Builder::from_random_bytes(random).into_uuid().to_string();

        keystore.put(DEVICE_ALIAS_ENTRY, alias.clone().into_bytes()).await?;

        Ok(Self { alias })
    }

    /// The roster alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}
