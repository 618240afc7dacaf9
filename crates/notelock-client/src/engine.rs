//! Synchronization engine: the device key-bootstrap state machine.
//!
//! Drives one device from first run to holding the account's shared note
//! key, then keeps propagating that key to newcomers:
//!
//! ```text
//! Uninitialized
//!   --(keys loaded/created, device registered)--> role check
//! role check
//!   --(no note key registered yet: claim seed, upload wrap-for-self)--> Synced
//!   --(claim lost or key already registered)------------------------> Waiting
//! Waiting
//!   --(poll finds a wrapped key for us)-----------------------------> Synced
//! Synced
//!   steady state; each broadcast cycle wraps the key for unsynced devices
//! Revoked
//!   terminal cleared state; reached when our alias leaves the roster,
//!   or on logout
//! ```
//!
//! A device is either Waiting (polling) or Synced (broadcasting), never
//! both, so the two loops cannot race on one device. Across devices the
//! wrap/upload operations are idempotent and commutative; the only atomic
//! step is the seed claim, which the directory arbitrates.

use std::time::Duration;

use notelock_core::{
    DeviceIdentity, DirectoryError, KeyDirectory, KeyStore, PRIVATE_KEY_ENTRY, PUBLIC_KEY_ENTRY,
    env::Environment,
};
use notelock_crypto::{DeviceKeyPair, NoteKey};

use crate::error::ClientError;

/// Synchronization state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// `initialize` has not run.
    Uninitialized,
    /// Registered, no note key held yet; polling for a wrapped key.
    Waiting,
    /// Note key held; participating in broadcast.
    Synced,
    /// Local key material cleared after roster removal or logout. Terminal.
    Revoked,
}

/// Timing and key-size configuration for the engine and session loops.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between broadcast cycles once synchronized.
    pub broadcast_interval: Duration,
    /// Interval between wrapped-key polls while waiting.
    pub poll_interval: Duration,
    /// Interval between roster checks for revocation.
    pub revocation_check_interval: Duration,
    /// RSA modulus size for newly generated device key pairs.
    pub key_bits: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            revocation_check_interval: Duration::from_secs(1),
            key_bits: 2048,
        }
    }
}

/// Identity material established by `initialize`.
struct DeviceCredentials {
    identity: DeviceIdentity,
    keypair: DeviceKeyPair,
    public_key_b64: String,
}

/// The per-device synchronization engine.
///
/// Owns the device's key material and the protocol state machine. All
/// methods are driven externally - by a [`crate::Session`] in production, or
/// directly by tests.
pub struct SyncEngine<E, D, S>
where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    env: E,
    directory: D,
    keystore: S,
    config: SyncConfig,
    credentials: Option<DeviceCredentials>,
    note_key: Option<NoteKey>,
    seeded: bool,
    state: SyncState,
}

impl<E, D, S> SyncEngine<E, D, S>
where
    E: Environment,
    D: KeyDirectory,
    S: KeyStore,
{
    /// Create an engine in the `Uninitialized` state.
    pub fn new(env: E, directory: D, keystore: S, config: SyncConfig) -> Self {
        Self {
            env,
            directory,
            keystore,
            config,
            credentials: None,
            note_key: None,
            seeded: false,
            state: SyncState::Uninitialized,
        }
    }

    /// Current synchronization state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether this device originated the account's note key.
    pub fn is_seed(&self) -> bool {
        self.seeded
    }

    /// This device's roster alias. `None` before `initialize`.
    pub fn device_alias(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.identity.alias())
    }

    /// This device's canonical public-key identifier. `None` before
    /// `initialize`.
    pub fn public_key(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.public_key_b64.as_str())
    }

    /// The engine's timing configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub(crate) fn env(&self) -> &E {
        &self.env
    }

    fn credentials(&self) -> Result<&DeviceCredentials, ClientError> {
        self.credentials.as_ref().ok_or(ClientError::NotInitialized)
    }

    /// Boot the device: establish identity and key pair, register with the
    /// directory, and either claim the seed role or start waiting.
    ///
    /// Safe to call again after revocation - the wiped keystore yields a
    /// fresh alias and key pair, and the device re-registers.
    ///
    /// # Errors
    ///
    /// Key-generation failure and keystore corruption are fatal. Losing the
    /// seed race is NOT an error: the engine falls back to `Waiting`.
    pub async fn initialize(&mut self) -> Result<SyncState, ClientError> {
        let identity = DeviceIdentity::load_or_create(&self.keystore, &self.env).await?;
        let keypair = self.load_or_create_keypair().await?;
        let public_key_b64 = notelock_crypto::export_public_key(keypair.public_key())?;

        // Duplicate registration is a no-op success on the backend side.
        self.directory.register_device(identity.alias(), &public_key_b64).await?;
        tracing::info!(alias = identity.alias(), "device registered");

        self.credentials = Some(DeviceCredentials { identity, keypair, public_key_b64 });

        if self.directory.is_symmetric_key_registered().await? {
            self.state = SyncState::Waiting;
            // On-demand login check: an earlier broadcast may already have
            // wrapped the key for us.
            self.poll_wrapped_key().await?;
        } else {
            self.claim_seed_role().await?;
        }

        Ok(self.state)
    }

    /// Claim the seed role: generate the account note key, wrap it for
    /// ourselves, and register it as the canonical secret.
    ///
    /// The directory makes the first registration win; on
    /// `AlreadyRegistered` we lost the race and fall back to waiting.
    async fn claim_seed_role(&mut self) -> Result<(), ClientError> {
        let mut rng = self.env.rng();
        let note_key = NoteKey::generate(&mut rng);

        let creds = self.credentials()?;
        let wrapped = notelock_crypto::wrap_note_key(&mut rng, &note_key, creds.keypair.public_key())?;

        match self.directory.register_symmetric_key(&creds.public_key_b64, &wrapped).await {
            Ok(()) => {
                tracing::info!("seed role claimed, note key registered");
                self.note_key = Some(note_key);
                self.seeded = true;
                self.state = SyncState::Synced;
                Ok(())
            },
            Err(DirectoryError::AlreadyRegistered) => {
                tracing::warn!("lost seed election, falling back to waiting");
                self.state = SyncState::Waiting;
                self.poll_wrapped_key().await?;
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// One poll for our wrapped note key. No-op unless `Waiting`.
    ///
    /// # Errors
    ///
    /// `UnknownPublicKey` and `DeviceNotRegistered` indicate state
    /// divergence and are fatal; a failed unwrap is surfaced distinctly as
    /// [`notelock_crypto::CryptoError::UnwrapFailed`].
    pub async fn poll_wrapped_key(&mut self) -> Result<SyncState, ClientError> {
        if self.state != SyncState::Waiting {
            return Ok(self.state);
        }

        let creds = self.credentials()?;
        match self.directory.wrapped_key_for(&creds.public_key_b64).await {
            Ok(wrapped) => {
                let note_key =
                    notelock_crypto::unwrap_note_key(&wrapped, creds.keypair.private_key())?;
                tracing::info!("wrapped note key received and unwrapped");
                self.note_key = Some(note_key);
                self.state = SyncState::Synced;
            },
            Err(DirectoryError::KeyNotSynchronized) => {
                tracing::debug!("note key not yet wrapped for this device");
            },
            Err(e) => return Err(e.into()),
        }

        Ok(self.state)
    }

    /// One broadcast cycle: wrap the note key for every registered device
    /// that has no wrapped-key record, and upload the batch.
    ///
    /// Idempotent and commutative with other devices' broadcasts. Returns
    /// the number of records uploaded.
    ///
    /// # Errors
    ///
    /// [`ClientError::KeyUnavailable`] if this device is not synchronized;
    /// an unsynced public key that fails to import is state divergence and
    /// aborts the cycle.
    pub async fn broadcast_once(&self) -> Result<usize, ClientError> {
        let note_key = self.note_key.as_ref().ok_or(ClientError::KeyUnavailable)?;

        let unsynced = self.directory.unsynced_public_keys().await?;
        if unsynced.is_empty() {
            return Ok(0);
        }

        let mut rng = self.env.rng();
        let mut pairs = Vec::with_capacity(unsynced.len());
        for encoded in unsynced {
            let public_key = notelock_crypto::import_public_key(&encoded)?;
            let wrapped = notelock_crypto::wrap_note_key(&mut rng, note_key, &public_key)?;
            pairs.push((encoded, wrapped));
        }

        let count = pairs.len();
        self.directory.upload_wrapped_keys(pairs).await?;
        tracing::debug!(count, "wrapped note key for unsynced devices");

        Ok(count)
    }

    /// Whether our alias has disappeared from the roster. Read-only.
    pub async fn is_revoked_on_roster(&self) -> Result<bool, ClientError> {
        let creds = self.credentials()?;
        let aliases = self.directory.device_aliases().await?;
        Ok(!aliases.iter().any(|a| a == creds.identity.alias()))
    }

    /// Check the roster and wipe local state if this device was removed.
    ///
    /// Returns true if revocation was observed (the engine is now
    /// `Revoked`). Callers running timers should cancel them BEFORE invoking
    /// the wipe path; see [`crate::Session`] for the ordering.
    pub async fn check_revocation(&mut self) -> Result<bool, ClientError> {
        if !self.is_revoked_on_roster().await? {
            return Ok(false);
        }

        tracing::info!("device alias absent from roster, wiping local key material");
        self.clear_device_data().await?;
        Ok(true)
    }

    /// Wipe all local key material: note key, credentials, every keystore
    /// entry. Leaves the engine in the terminal `Revoked` state.
    ///
    /// Used by both the revocation path and logout; the surrounding session
    /// layer treats the result identically (force logout).
    pub async fn clear_device_data(&mut self) -> Result<(), ClientError> {
        // In-memory secrets first: the note key zeroizes on drop.
        self.note_key = None;
        self.credentials = None;
        self.seeded = false;
        self.state = SyncState::Revoked;

        self.keystore.clear().await?;
        Ok(())
    }

    /// Encrypt a note payload with the synchronized note key.
    ///
    /// # Errors
    ///
    /// [`ClientError::KeyUnavailable`] until the device reaches `Synced`.
    pub fn encrypt_note(&self, plaintext: &str) -> Result<String, ClientError> {
        let note_key = self.note_key.as_ref().ok_or(ClientError::KeyUnavailable)?;
        let mut rng = self.env.rng();
        Ok(notelock_crypto::encrypt_note(&mut rng, note_key, plaintext)?)
    }

    /// Decrypt a note blob with the synchronized note key.
    ///
    /// # Errors
    ///
    /// [`ClientError::KeyUnavailable`] until the device reaches `Synced`;
    /// tag failures surface as
    /// [`notelock_crypto::CryptoError::IntegrityCheckFailed`].
    pub fn decrypt_note(&self, blob: &str) -> Result<String, ClientError> {
        let note_key = self.note_key.as_ref().ok_or(ClientError::KeyUnavailable)?;
        Ok(notelock_crypto::decrypt_note(note_key, blob)?)
    }

    /// Load the persisted key pair, or generate and persist a fresh one.
    ///
    /// Idempotent by construction: once a private key exists it is never
    /// regenerated - a device holding two key pairs would make its existing
    /// wrapped-key records unreadable. A missing public entry is re-derived
    /// from the private half.
    async fn load_or_create_keypair(&self) -> Result<DeviceKeyPair, ClientError> {
        if let Some(der) = self.keystore.get(PRIVATE_KEY_ENTRY).await? {
            let keypair = DeviceKeyPair::from_pkcs8_der(&der)?;
            if self.keystore.get(PUBLIC_KEY_ENTRY).await?.is_none() {
                self.keystore.put(PUBLIC_KEY_ENTRY, keypair.public_key_spki_der()?).await?;
            }
            return Ok(keypair);
        }

        let mut rng = self.env.rng();
        let keypair = DeviceKeyPair::generate(&mut rng, self.config.key_bits)?;

        // Persist both halves before first use.
        self.keystore.put(PRIVATE_KEY_ENTRY, keypair.to_pkcs8_der()?).await?;
        self.keystore.put(PUBLIC_KEY_ENTRY, keypair.public_key_spki_der()?).await?;

        Ok(keypair)
    }
}
