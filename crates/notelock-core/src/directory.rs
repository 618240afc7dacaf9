//! Backend key-directory interface.
//!
//! The directory is the untrusted storage/coordination collaborator. It holds
//! the account's device roster `(alias → public key)` and the wrapped-key
//! table `(public key → wrapped note key)`. It never sees plaintext notes or
//! the note key itself.
//!
//! We avoid stringly-typed results for directory failures: every RPC returns
//! a [`DirectoryError`] variant matched exhaustively by the engine, because
//! each variant maps to a different recovery (retry, role fallback, or
//! abort).

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by the backend directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The public key has no roster entry for this account.
    ///
    /// Indicates local/remote state divergence; never retried silently.
    #[error("public key is not registered for this account")]
    UnknownPublicKey,

    /// A note key is already registered for the account.
    ///
    /// Losing the seed race surfaces as this variant; the engine falls back
    /// to waiting rather than treating it as fatal.
    #[error("a symmetric key is already registered for this account")]
    AlreadyRegistered,

    /// The calling device has no roster entry.
    ///
    /// Fatal for the current operation; the device must re-register.
    #[error("device is not registered")]
    DeviceNotRegistered,

    /// No wrapped-key record exists for this device yet.
    ///
    /// Transient: an already-synced device's broadcast will produce one.
    #[error("symmetric key is not yet synchronized to this device")]
    KeyNotSynchronized,

    /// Network-level failure reaching the backend.
    #[error("directory transport error: {0}")]
    Transport(String),
}

impl DirectoryError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Transient errors are absorbed by the poll/broadcast timers. State
    /// divergence (`UnknownPublicKey`, `DeviceNotRegistered`) is never
    /// transient - retrying cannot fix a state mismatch.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::KeyNotSynchronized | Self::Transport(_))
    }
}

/// The backend directory RPCs, scoped to one authenticated account.
///
/// # Contract
///
/// - All key material crosses this interface Base64-encoded; the SPKI Base64
///   form of a public key is the canonical device identifier
/// - `register_device` is idempotent: duplicate registration of the same
///   alias is a no-op success
/// - `register_symmetric_key` is ATOMIC check-and-set: the first caller wins
///   and every later caller observes [`DirectoryError::AlreadyRegistered`].
///   This is the primitive that makes seed election exclusive; there is no
///   separate "am I the seed?" RPC
/// - `upload_wrapped_keys` is idempotent and order-independent: re-uploading
///   an already-synced pair is accepted without error
/// - The roster never goes empty while the account exists: the backend
///   refuses to delete the last device
#[async_trait]
pub trait KeyDirectory: Send + Sync + 'static {
    /// Register this device's alias and public key. Idempotent.
    async fn register_device(&self, alias: &str, public_key: &str) -> Result<(), DirectoryError>;

    /// Whether a note key has been registered for the account.
    ///
    /// The role check: a `false` answer invites a seed claim, but only
    /// [`Self::register_symmetric_key`] is authoritative.
    async fn is_symmetric_key_registered(&self) -> Result<bool, DirectoryError>;

    /// Claim the seed role by registering the account's wrapped note key.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownPublicKey`]: `public_key` has no roster row
    /// - [`DirectoryError::AlreadyRegistered`]: another device won the race
    /// - [`DirectoryError::DeviceNotRegistered`]: the account has no devices
    async fn register_symmetric_key(
        &self,
        public_key: &str,
        wrapped_key: &str,
    ) -> Result<(), DirectoryError>;

    /// Fetch the wrapped note key addressed to `public_key`.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownPublicKey`]: no roster row for the key
    /// - [`DirectoryError::KeyNotSynchronized`]: no wrapped record yet
    /// - [`DirectoryError::DeviceNotRegistered`]: the account has no devices
    async fn wrapped_key_for(&self, public_key: &str) -> Result<String, DirectoryError>;

    /// Public keys of registered devices that have no wrapped-key record.
    async fn unsynced_public_keys(&self) -> Result<Vec<String>, DirectoryError>;

    /// Upload wrapped-key records for other devices, as one batch.
    ///
    /// # Errors
    ///
    /// - [`DirectoryError::UnknownPublicKey`]: a pair names an unregistered
    ///   public key
    /// - [`DirectoryError::DeviceNotRegistered`]: the account has no devices
    async fn upload_wrapped_keys(
        &self,
        pairs: Vec<(String, String)>,
    ) -> Result<(), DirectoryError>;

    /// The current device-alias roster.
    async fn device_aliases(&self) -> Result<Vec<String>, DirectoryError>;

    /// Remove a device (and its wrapped-key record) from the roster.
    async fn delete_device(&self, alias: &str) -> Result<(), DirectoryError>;
}
