//! Deterministic test harness for the notelock protocol.
//!
//! In-memory implementations of the [`notelock_core`] collaborator traits
//! for deterministic, reproducible testing:
//!
//! - [`MemoryDirectory`]: the backend double, with the atomic
//!   first-caller-wins semantics for seed election
//! - [`MemoryKeyStore`]: per-device keystore double
//! - [`SimEnv`]: seeded RNG plus tokio virtual time, for
//!   `#[tokio::test(start_paused = true)]` tests
//! - [`StaleReadDirectory`]: serves stale role-check answers to force the
//!   seed race
//! - [`CountingDirectory`]: counts RPCs to prove timers stop on teardown
//! - [`DeviceCluster`]: wires several simulated devices onto one account

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cluster;
mod directory;
mod keystore;
mod sim_env;
mod wrappers;

pub use cluster::{DeviceCluster, TestDevice};
pub use directory::MemoryDirectory;
pub use keystore::MemoryKeyStore;
pub use sim_env::SimEnv;
pub use wrappers::{CountingDirectory, StaleReadDirectory};
