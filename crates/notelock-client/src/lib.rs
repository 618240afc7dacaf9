//! Notelock Client
//!
//! The synchronization engine and session layer for the notelock protocol:
//! device key bootstrap, seed election, gossip-style wrapped-key
//! propagation, revocation handling, and the note encryption surface.
//!
//! # Architecture
//!
//! [`SyncEngine`] is the protocol state machine. It performs one operation
//! per call (initialize, poll, broadcast, revocation check) and holds all
//! per-device key material; it never owns a timer. [`Session`] owns the
//! engine after login and drives it with cancellable timer tasks, exposing
//! the state over a watch channel. This split keeps the protocol logic
//! directly drivable by deterministic tests.
//!
//! # Components
//!
//! - [`SyncEngine`]: per-device state machine over abstract collaborators
//! - [`SyncState`]: `Uninitialized → Waiting/Synced → Revoked`
//! - [`SyncConfig`]: timer intervals and key-size configuration
//! - [`Session`]: login-scoped task owner with deterministic teardown
//! - [`ClientError`]: the protocol's error taxonomy

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod engine;
mod error;
mod session;

pub use engine::{SyncConfig, SyncEngine, SyncState};
pub use error::ClientError;
pub use notelock_core::{
    DeviceIdentity, DirectoryError, KeyDirectory, KeyStore, KeyStoreError, env::Environment,
};
pub use session::Session;
