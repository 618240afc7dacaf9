//! In-memory keystore for testing and simulation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use notelock_core::{KeyStore, KeyStoreError};

/// In-memory keystore implementation.
///
/// One instance per simulated device. Clones share state so a test can keep
/// a handle for assertions while the engine owns another.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyStore {
    /// Create a new empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().expect("Mutex poisoned")
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no entries (e.g. after a revocation wipe).
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, KeyStoreError> {
        Ok(self.lock().get(name).cloned())
    }

    async fn put(&self, name: &str, value: Vec<u8>) -> Result<(), KeyStoreError> {
        self.lock().insert(name.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), KeyStoreError> {
        self.lock().remove(name);
        Ok(())
    }

    async fn clear(&self) -> Result<(), KeyStoreError> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notelock_core::KeyStore;

    use super::MemoryKeyStore;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let store = MemoryKeyStore::new();

        assert_eq!(store.get("publicKey").await.unwrap(), None);

        store.put("publicKey", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("publicKey").await.unwrap(), Some(vec![1, 2, 3]));

        store.delete("publicKey").await.unwrap();
        assert_eq!(store.get("publicKey").await.unwrap(), None);

        // Deleting an absent entry succeeds
        store.delete("publicKey").await.unwrap();
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = MemoryKeyStore::new();
        store.put("a", vec![1]).await.unwrap();
        store.put("b", vec![2]).await.unwrap();

        store.clear().await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryKeyStore::new();
        let handle = store.clone();

        store.put("deviceAlias", b"alias".to_vec()).await.unwrap();

        assert_eq!(handle.entry_count(), 1);
    }
}
