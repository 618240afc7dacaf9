//! Fault-injecting and observing directory wrappers.
//!
//! Both wrappers delegate to an inner [`KeyDirectory`] and change exactly
//! one observable behavior, so tests compose them around
//! [`crate::MemoryDirectory`].

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use notelock_core::{DirectoryError, KeyDirectory};

/// Directory that answers the role check from a stale snapshot.
///
/// `is_symmetric_key_registered` always reports `false`, as if the read
/// raced ahead of another device's seed registration. Every other RPC -
/// including the atomic `register_symmetric_key` - hits the real backend,
/// so a device using this wrapper claims the seed role and loses the
/// election if someone already won.
#[derive(Clone)]
pub struct StaleReadDirectory<D> {
    inner: D,
}

impl<D: KeyDirectory> StaleReadDirectory<D> {
    /// Wrap a directory.
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<D: KeyDirectory> KeyDirectory for StaleReadDirectory<D> {
    async fn register_device(&self, alias: &str, public_key: &str) -> Result<(), DirectoryError> {
        self.inner.register_device(alias, public_key).await
    }

    async fn is_symmetric_key_registered(&self) -> Result<bool, DirectoryError> {
        // Stale answer: the claim below is what actually arbitrates.
        Ok(false)
    }

    async fn register_symmetric_key(
        &self,
        public_key: &str,
        wrapped_key: &str,
    ) -> Result<(), DirectoryError> {
        self.inner.register_symmetric_key(public_key, wrapped_key).await
    }

    async fn wrapped_key_for(&self, public_key: &str) -> Result<String, DirectoryError> {
        self.inner.wrapped_key_for(public_key).await
    }

    async fn unsynced_public_keys(&self) -> Result<Vec<String>, DirectoryError> {
        self.inner.unsynced_public_keys().await
    }

    async fn upload_wrapped_keys(
        &self,
        pairs: Vec<(String, String)>,
    ) -> Result<(), DirectoryError> {
        self.inner.upload_wrapped_keys(pairs).await
    }

    async fn device_aliases(&self) -> Result<Vec<String>, DirectoryError> {
        self.inner.device_aliases().await
    }

    async fn delete_device(&self, alias: &str) -> Result<(), DirectoryError> {
        self.inner.delete_device(alias).await
    }
}

/// Directory that counts every RPC before delegating.
///
/// Used to prove cancelled timers are silent: after teardown the call count
/// must not move, no matter how far the (virtual) clock advances.
#[derive(Clone)]
pub struct CountingDirectory<D> {
    inner: D,
    calls: Arc<AtomicUsize>,
}

impl<D: KeyDirectory> CountingDirectory<D> {
    /// Wrap a directory.
    pub fn new(inner: D) -> Self {
        Self { inner, calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// Total RPCs observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<D: KeyDirectory> KeyDirectory for CountingDirectory<D> {
    async fn register_device(&self, alias: &str, public_key: &str) -> Result<(), DirectoryError> {
        self.record();
        self.inner.register_device(alias, public_key).await
    }

    async fn is_symmetric_key_registered(&self) -> Result<bool, DirectoryError> {
        self.record();
        self.inner.is_symmetric_key_registered().await
    }

    async fn register_symmetric_key(
        &self,
        public_key: &str,
        wrapped_key: &str,
    ) -> Result<(), DirectoryError> {
        self.record();
        self.inner.register_symmetric_key(public_key, wrapped_key).await
    }

    async fn wrapped_key_for(&self, public_key: &str) -> Result<String, DirectoryError> {
        self.record();
        self.inner.wrapped_key_for(public_key).await
    }

    async fn unsynced_public_keys(&self) -> Result<Vec<String>, DirectoryError> {
        self.record();
        self.inner.unsynced_public_keys().await
    }

    async fn upload_wrapped_keys(
        &self,
        pairs: Vec<(String, String)>,
    ) -> Result<(), DirectoryError> {
        self.record();
        self.inner.upload_wrapped_keys(pairs).await
    }

    async fn device_aliases(&self) -> Result<Vec<String>, DirectoryError> {
        self.record();
        self.inner.device_aliases().await
    }

    async fn delete_device(&self, alias: &str) -> Result<(), DirectoryError> {
        self.record();
        self.inner.delete_device(alias).await
    }
}
