//! Convenience wiring for multi-device protocol tests.

use notelock_client::{SyncConfig, SyncEngine};

use crate::{MemoryDirectory, MemoryKeyStore, SimEnv};

/// A simulated device: its engine plus a keystore handle for assertions.
pub struct TestDevice {
    /// The device's synchronization engine, ready to `initialize`.
    pub engine: SyncEngine<SimEnv, MemoryDirectory, MemoryKeyStore>,
    /// Shares state with the engine's keystore.
    pub keystore: MemoryKeyStore,
}

/// One account's worth of simulated devices sharing a directory.
///
/// Every device gets its own keystore and a deterministically seeded
/// environment; the directory is shared, so devices observe each other
/// exactly as they would through the real backend.
pub struct DeviceCluster {
    directory: MemoryDirectory,
    config: SyncConfig,
    next_seed: u64,
}

impl DeviceCluster {
    /// Create an empty cluster with default timing configuration.
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create an empty cluster with explicit configuration.
    pub fn with_config(config: SyncConfig) -> Self {
        Self { directory: MemoryDirectory::new(), config, next_seed: 1 }
    }

    /// The shared backend double, for direct manipulation and assertions.
    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    /// Provision a new device. The engine is NOT initialized; tests drive
    /// that explicitly to observe the transition.
    pub fn add_device(&mut self) -> TestDevice {
        let seed = self.next_seed;
        self.next_seed += 1;

        let keystore = MemoryKeyStore::new();
        let engine = SyncEngine::new(
            SimEnv::with_seed(seed),
            self.directory.clone(),
            keystore.clone(),
            self.config.clone(),
        );

        TestDevice { engine, keystore }
    }
}

impl Default for DeviceCluster {
    fn default() -> Self {
        Self::new()
    }
}
