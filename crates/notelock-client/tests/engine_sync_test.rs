//! Multi-device synchronization tests driven directly against the engine.
//!
//! These tests step the protocol by hand - initialize, broadcast, poll - so
//! every transition is observable without timers. Timer-driven behavior is
//! covered by the session tests in the harness crate.

use notelock_client::{
    ClientError, DirectoryError, KeyDirectory, SyncConfig, SyncEngine, SyncState,
};
use notelock_harness::{DeviceCluster, MemoryKeyStore, SimEnv, StaleReadDirectory};

#[tokio::test]
async fn first_device_claims_the_seed_role() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();

    let state = a.engine.initialize().await.unwrap();

    assert_eq!(state, SyncState::Synced);
    assert!(a.engine.is_seed());

    // The seed registered exactly one wrapped record: its own.
    assert_eq!(cluster.directory().device_count(), 1);
    assert_eq!(cluster.directory().wrapped_key_count(), 1);

    // A synced device can immediately use the note cipher.
    let blob = a.engine.encrypt_note("first note").unwrap();
    assert_eq!(a.engine.decrypt_note(&blob).unwrap(), "first note");
}

#[tokio::test]
async fn later_device_waits_then_converges_after_broadcast() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let mut b = cluster.add_device();
    let state = b.engine.initialize().await.unwrap();
    assert_eq!(state, SyncState::Waiting);
    assert!(!b.engine.is_seed());

    // B cannot encrypt or decrypt until it holds the key.
    assert!(matches!(b.engine.encrypt_note("too early"), Err(ClientError::KeyUnavailable)));

    // One broadcast cycle from A wraps the key for B.
    assert_eq!(a.engine.broadcast_once().await.unwrap(), 1);
    assert_eq!(b.engine.poll_wrapped_key().await.unwrap(), SyncState::Synced);

    // Both directions decrypt: the devices hold bit-for-bit the same key.
    let from_a = a.engine.encrypt_note("みんなの buying list ✓").unwrap();
    assert_eq!(b.engine.decrypt_note(&from_a).unwrap(), "みんなの buying list ✓");

    let from_b = b.engine.encrypt_note("reply from b").unwrap();
    assert_eq!(a.engine.decrypt_note(&from_b).unwrap(), "reply from b");
}

#[tokio::test]
async fn broadcast_is_idempotent_and_settles_to_zero() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let mut b = cluster.add_device();
    b.engine.initialize().await.unwrap();

    assert_eq!(a.engine.broadcast_once().await.unwrap(), 1);
    // Nothing left to wrap; re-running is a no-op, not an error.
    assert_eq!(a.engine.broadcast_once().await.unwrap(), 0);

    b.engine.poll_wrapped_key().await.unwrap();
    assert_eq!(b.engine.broadcast_once().await.unwrap(), 0);
}

#[tokio::test]
async fn reinitialize_never_regenerates_the_key_pair() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let alias = a.engine.device_alias().unwrap().to_owned();
    let public_key = a.engine.public_key().unwrap().to_owned();

    // Same keystore, fresh engine: simulates an app restart.
    let mut restarted = SyncEngine::new(
        SimEnv::with_seed(99),
        cluster.directory().clone(),
        a.keystore.clone(),
        SyncConfig::default(),
    );
    restarted.initialize().await.unwrap();

    assert_eq!(restarted.device_alias().unwrap(), alias);
    assert_eq!(restarted.public_key().unwrap(), public_key);

    // Still one roster row; duplicate registration was a no-op.
    assert_eq!(cluster.directory().device_count(), 1);
}

#[tokio::test]
async fn seed_race_loser_falls_back_to_waiting_and_converges() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    // B's role check races ahead of A's registration: it sees a stale "no
    // key registered" answer, claims the seed role, and must lose at the
    // atomic claim.
    let stale = StaleReadDirectory::new(cluster.directory().clone());
    let mut b = SyncEngine::new(
        SimEnv::with_seed(2),
        stale,
        MemoryKeyStore::new(),
        SyncConfig::default(),
    );

    let state = b.initialize().await.unwrap();
    assert_eq!(state, SyncState::Waiting);
    assert!(!b.is_seed());

    // Exactly one key exists: the winner's record is untouched.
    assert_eq!(cluster.directory().wrapped_key_count(), 1);

    // The loser converges through the normal gossip path.
    assert_eq!(a.engine.broadcast_once().await.unwrap(), 1);
    assert_eq!(b.poll_wrapped_key().await.unwrap(), SyncState::Synced);

    let blob = a.engine.encrypt_note("after the race").unwrap();
    assert_eq!(b.decrypt_note(&blob).unwrap(), "after the race");
}

#[tokio::test]
async fn poll_after_device_deletion_is_fatal_not_retried() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let mut b = cluster.add_device();
    b.engine.initialize().await.unwrap();
    let b_alias = b.engine.device_alias().unwrap().to_owned();

    cluster.directory().delete_device(&b_alias).await.unwrap();

    let error = b.engine.poll_wrapped_key().await.unwrap_err();
    assert!(matches!(error, ClientError::Directory(DirectoryError::UnknownPublicKey)));
    assert!(error.is_fatal());
}

#[tokio::test]
async fn revocation_wipes_local_state() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let mut b = cluster.add_device();
    b.engine.initialize().await.unwrap();
    let b_alias = b.engine.device_alias().unwrap().to_owned();

    // Still on the roster: no-op.
    assert!(!b.engine.check_revocation().await.unwrap());
    assert!(!b.keystore.is_empty());

    cluster.directory().delete_device(&b_alias).await.unwrap();

    assert!(b.engine.check_revocation().await.unwrap());
    assert_eq!(b.engine.state(), SyncState::Revoked);
    assert!(b.keystore.is_empty());
    assert_eq!(b.engine.device_alias(), None);
    assert!(matches!(b.engine.encrypt_note("gone"), Err(ClientError::KeyUnavailable)));

    // The surviving device is unaffected.
    assert!(!a.engine.check_revocation().await.unwrap());
    let blob = a.engine.encrypt_note("still here").unwrap();
    assert_eq!(a.engine.decrypt_note(&blob).unwrap(), "still here");
}

#[tokio::test]
async fn revoked_device_can_reregister_with_fresh_identity() {
    let mut cluster = DeviceCluster::new();
    let mut a = cluster.add_device();
    a.engine.initialize().await.unwrap();

    let mut b = cluster.add_device();
    b.engine.initialize().await.unwrap();
    let old_alias = b.engine.device_alias().unwrap().to_owned();
    let old_public_key = b.engine.public_key().unwrap().to_owned();

    cluster.directory().delete_device(&old_alias).await.unwrap();
    b.engine.check_revocation().await.unwrap();

    // Re-registration: wiped keystore yields a fresh alias and key pair.
    let state = b.engine.initialize().await.unwrap();
    assert_eq!(state, SyncState::Waiting);
    assert_ne!(b.engine.device_alias().unwrap(), old_alias);
    assert_ne!(b.engine.public_key().unwrap(), old_public_key);

    a.engine.broadcast_once().await.unwrap();
    assert_eq!(b.engine.poll_wrapped_key().await.unwrap(), SyncState::Synced);
}
