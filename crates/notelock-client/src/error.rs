//! Error types for the synchronization engine and session layer.
//!
//! The protocol's failure taxonomy, matched exhaustively by the engine:
//!
//! - *transient* - pending synchronization, transport failure: absorbed by
//!   the poll/broadcast timers, invisible to callers beyond a
//!   "synchronizing" status
//! - *race loss* - a lost seed election: recovered inside `initialize` by
//!   falling back to waiting; it never escapes as an error
//! - *state divergence* - unknown public key, unregistered device, failed
//!   unwrap or integrity check: fatal for the current operation, surfaced to
//!   the caller, never silently retried
//! - *environment* - key generation unsupported or failing: fatal at
//!   initialization

use notelock_core::{DirectoryError, KeyStoreError};
use notelock_crypto::CryptoError;
use thiserror::Error;

/// Errors surfaced by the synchronization engine and session.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Backend directory call failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Local keystore access failed.
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    /// The note key is not held yet; the device has not synchronized.
    #[error("note key unavailable: device is not synchronized")]
    KeyUnavailable,

    /// `initialize` has not completed on this engine.
    #[error("engine is not initialized")]
    NotInitialized,
}

impl ClientError {
    /// Returns true if this error is transient and absorbed by the timers.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Directory(e) => e.is_transient(),
            Self::Crypto(_) | Self::KeyStore(_) | Self::KeyUnavailable | Self::NotInitialized => {
                false
            },
        }
    }

    /// Returns true if this error aborts the current operation.
    ///
    /// Everything non-transient is fatal here: the race-loss class
    /// (`AlreadyRegistered`) is handled inside `initialize` and never
    /// surfaces through this type during normal operation.
    pub fn is_fatal(&self) -> bool {
        !self.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use notelock_core::DirectoryError;

    use super::ClientError;

    #[test]
    fn directory_transience_passes_through() {
        assert!(ClientError::Directory(DirectoryError::KeyNotSynchronized).is_transient());
        assert!(ClientError::Directory(DirectoryError::Transport("timeout".into())).is_transient());
        assert!(ClientError::Directory(DirectoryError::UnknownPublicKey).is_fatal());
    }

    #[test]
    fn local_failures_are_fatal() {
        assert!(ClientError::KeyUnavailable.is_fatal());
        assert!(ClientError::NotInitialized.is_fatal());
    }
}
