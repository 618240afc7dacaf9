//! Session layer: owns the engine and its background timers.
//!
//! A [`Session`] is created after successful authentication and torn down on
//! logout - there is no ambient "current user" state. Two tasks are scoped
//! to the session:
//!
//! - the *sync driver*: polls for a wrapped key while `Waiting`, runs
//!   broadcast cycles while `Synced`
//! - the *revocation watcher*: checks the roster and, when this device has
//!   been removed, stops the driver before wiping local key material
//!
//! Teardown ordering is an invariant: timers are cancelled deterministically
//! (signal, then join) BEFORE any key material is wiped, so no timer tick
//! can ever observe cleared state.

use std::sync::Arc;

use notelock_core::{KeyDirectory, KeyStore, env::Environment};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};

use crate::{
    engine::{SyncConfig, SyncEngine, SyncState},
    error::ClientError,
};

/// A logged-in device session driving the synchronization protocol.
///
/// Note encryption is only usable once the underlying engine reaches
/// [`SyncState::Synced`]; until then the session reports a synchronizing
/// status through [`Session::subscribe_state`].
pub struct Session<E, D, S>
where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    engine: Arc<Mutex<SyncEngine<E, D, S>>>,
    state_rx: watch::Receiver<SyncState>,
    shutdown_tx: watch::Sender<bool>,
    driver: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

impl<E, D, S> Session<E, D, S>
where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    /// Initialize the engine and start the session's background tasks.
    ///
    /// # Errors
    ///
    /// Propagates fatal initialization failures (key generation, keystore
    /// corruption, state divergence). A lost seed election is not an error;
    /// the session starts in `Waiting` and converges via the timers.
    pub async fn start(mut engine: SyncEngine<E, D, S>) -> Result<Self, ClientError> {
        let initial = engine.initialize().await?;

        let env = engine.env().clone();
        let config = engine.config().clone();
        let (state_tx, state_rx) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::new(Mutex::new(engine));

        let driver = tokio::spawn(run_sync_driver(
            Arc::clone(&engine),
            env.clone(),
            config.clone(),
            state_tx.clone(),
            shutdown_rx.clone(),
        ));
        let watcher = tokio::spawn(run_revocation_watcher(
            Arc::clone(&engine),
            env,
            config,
            state_tx,
            shutdown_tx.clone(),
            shutdown_rx,
        ));

        Ok(Self { engine, state_rx, shutdown_tx, driver, watcher })
    }

    /// Current synchronization state.
    pub fn state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    /// Watch channel for state transitions (e.g. to render a
    /// "synchronizing" status, or to force logout on `Revoked`).
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    /// This device's roster alias. `None` after revocation.
    pub async fn device_alias(&self) -> Option<String> {
        self.engine.lock().await.device_alias().map(str::to_owned)
    }

    /// Encrypt a note payload with the synchronized note key.
    pub async fn encrypt_note(&self, plaintext: &str) -> Result<String, ClientError> {
        self.engine.lock().await.encrypt_note(plaintext)
    }

    /// Decrypt a note blob with the synchronized note key.
    pub async fn decrypt_note(&self, blob: &str) -> Result<String, ClientError> {
        self.engine.lock().await.decrypt_note(blob)
    }

    /// End the session: cancel both timers deterministically, then wipe
    /// local key material.
    ///
    /// The ordering matters - wiping before cancelling would let an
    /// in-flight tick use cleared key state.
    pub async fn logout(self) -> Result<(), ClientError> {
        let _ = self.shutdown_tx.send(true);
        let _ = self.driver.await;
        let _ = self.watcher.await;

        let mut engine = self.engine.lock().await;
        engine.clear_device_data().await
    }
}

/// Poll while `Waiting`, broadcast while `Synced`; exit on shutdown, fatal
/// error, or a terminal state.
async fn run_sync_driver<E, D, S>(
    engine: Arc<Mutex<SyncEngine<E, D, S>>>,
    env: E,
    config: SyncConfig,
    state_tx: watch::Sender<SyncState>,
    mut shutdown: watch::Receiver<bool>,
) where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    loop {
        let state = { engine.lock().await.state() };
        let interval = match state {
            SyncState::Waiting => config.poll_interval,
            SyncState::Synced => config.broadcast_interval,
            SyncState::Uninitialized | SyncState::Revoked => return,
        };

        tokio::select! {
            () = env.sleep(interval) => {},
            _ = shutdown.changed() => return,
        }

        let mut guard = engine.lock().await;
        let result = match guard.state() {
            SyncState::Waiting => guard.poll_wrapped_key().await.map(|_| ()),
            SyncState::Synced => guard.broadcast_once().await.map(|_| ()),
            SyncState::Uninitialized | SyncState::Revoked => return,
        };

        match result {
            Ok(()) => {
                let new_state = guard.state();
                let _ = state_tx.send_if_modified(|current| {
                    if *current == new_state {
                        false
                    } else {
                        *current = new_state;
                        true
                    }
                });
            },
            Err(error) if error.is_transient() => {
                tracing::debug!(%error, "transient sync failure, will retry");
            },
            Err(error) => {
                tracing::warn!(%error, "sync driver stopping on fatal error");
                return;
            },
        }
    }
}

/// Check the roster each interval; on revocation, stop the driver first,
/// then wipe.
async fn run_revocation_watcher<E, D, S>(
    engine: Arc<Mutex<SyncEngine<E, D, S>>>,
    env: E,
    config: SyncConfig,
    state_tx: watch::Sender<SyncState>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown: watch::Receiver<bool>,
) where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    loop {
        tokio::select! {
            () = env.sleep(config.revocation_check_interval) => {},
            _ = shutdown.changed() => return,
        }

        let revoked = { engine.lock().await.is_revoked_on_roster().await };
        match revoked {
            Ok(false) => {},
            Ok(true) => {
                // Cancel-before-wipe: stop the sync driver at its next
                // select point, then clear key material under the lock (an
                // in-flight tick finishes first).
                let _ = shutdown_tx.send(true);
                let mut engine = engine.lock().await;
                if let Err(error) = engine.clear_device_data().await {
                    tracing::warn!(%error, "failed to clear device data after revocation");
                }
                let _ = state_tx.send(SyncState::Revoked);
                return;
            },
            Err(error) if error.is_transient() => {
                tracing::debug!(%error, "transient roster check failure, will retry");
            },
            Err(error) => {
                tracing::warn!(%error, "revocation watcher stopping on fatal error");
                return;
            },
        }
    }
}
