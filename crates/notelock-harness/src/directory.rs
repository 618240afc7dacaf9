//! In-memory key directory for testing and simulation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use notelock_core::{DirectoryError, KeyDirectory};

/// In-memory directory implementation for one account.
///
/// Mirrors the backend contract: a device roster `(alias → public key)` and
/// a wrapped-key table `(public key → wrapped note key)`. State is wrapped
/// in `Arc<Mutex<_>>` so clones share the account - every device engine in a
/// test holds a clone of the same directory. Thread-safe through the mutex,
/// but uses `lock().expect()` which will panic if the mutex is poisoned -
/// acceptable for test code.
///
/// The mutex also provides the atomicity the protocol requires of
/// `register_symmetric_key`: the check and the insert happen under one
/// guard, so exactly one seed claim can win.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<DirectoryInner>>,
}

#[derive(Default)]
struct DirectoryInner {
    /// Device alias → public key (Base64 SPKI)
    aliases: HashMap<String, String>,

    /// Public key → wrapped note key
    keys: HashMap<String, String>,
}

impl DirectoryInner {
    fn has_public_key(&self, public_key: &str) -> bool {
        self.aliases.values().any(|key| key == public_key)
    }
}

impl MemoryDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, DirectoryInner> {
        self.inner.lock().expect("Mutex poisoned")
    }

    /// Number of registered devices.
    pub fn device_count(&self) -> usize {
        self.lock().aliases.len()
    }

    /// Number of wrapped-key records.
    pub fn wrapped_key_count(&self) -> usize {
        self.lock().keys.len()
    }

    /// The stored wrapped record for a public key, if any.
    pub fn wrapped_key(&self, public_key: &str) -> Option<String> {
        self.lock().keys.get(public_key).cloned()
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    /// Duplicate registration of an existing alias is a no-op success; the
    /// first registered public key for an alias is immutable.
    async fn register_device(&self, alias: &str, public_key: &str) -> Result<(), DirectoryError> {
        let mut inner = self.lock();
        inner.aliases.entry(alias.to_owned()).or_insert_with(|| public_key.to_owned());
        Ok(())
    }

    async fn is_symmetric_key_registered(&self) -> Result<bool, DirectoryError> {
        Ok(!self.lock().keys.is_empty())
    }

    /// Atomic check-and-set: the check and insert share one lock guard, so
    /// the first caller wins and every later caller observes
    /// `AlreadyRegistered`.
    async fn register_symmetric_key(
        &self,
        public_key: &str,
        wrapped_key: &str,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.lock();
        if inner.aliases.is_empty() {
            return Err(DirectoryError::DeviceNotRegistered);
        }
        if !inner.has_public_key(public_key) {
            return Err(DirectoryError::UnknownPublicKey);
        }
        if !inner.keys.is_empty() {
            return Err(DirectoryError::AlreadyRegistered);
        }

        inner.keys.insert(public_key.to_owned(), wrapped_key.to_owned());
        Ok(())
    }

    async fn wrapped_key_for(&self, public_key: &str) -> Result<String, DirectoryError> {
        let inner = self.lock();
        if inner.aliases.is_empty() {
            return Err(DirectoryError::DeviceNotRegistered);
        }
        if !inner.has_public_key(public_key) {
            return Err(DirectoryError::UnknownPublicKey);
        }

        inner
            .keys
            .get(public_key)
            .cloned()
            .ok_or(DirectoryError::KeyNotSynchronized)
    }

    async fn unsynced_public_keys(&self) -> Result<Vec<String>, DirectoryError> {
        let inner = self.lock();
        Ok(inner
            .aliases
            .values()
            .filter(|public_key| !inner.keys.contains_key(*public_key))
            .cloned()
            .collect())
    }

    /// Re-uploading an already-synced pair overwrites it with an equivalent
    /// record, which is the idempotency the protocol relies on.
    async fn upload_wrapped_keys(
        &self,
        pairs: Vec<(String, String)>,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.lock();
        if inner.aliases.is_empty() {
            return Err(DirectoryError::DeviceNotRegistered);
        }
        for (public_key, _) in &pairs {
            if !inner.has_public_key(public_key) {
                return Err(DirectoryError::UnknownPublicKey);
            }
        }

        for (public_key, wrapped_key) in pairs {
            inner.keys.insert(public_key, wrapped_key);
        }
        Ok(())
    }

    async fn device_aliases(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(self.lock().aliases.keys().cloned().collect())
    }

    /// The roster never goes empty while the account exists; deleting the
    /// last device is a contract violation by the caller.
    async fn delete_device(&self, alias: &str) -> Result<(), DirectoryError> {
        let mut inner = self.lock();
        debug_assert!(inner.aliases.len() > 1, "roster must not go empty");

        if let Some(public_key) = inner.aliases.remove(alias) {
            inner.keys.remove(&public_key);
        }
        Ok(())
    }
}
