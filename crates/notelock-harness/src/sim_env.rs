//! Simulation environment: seeded randomness over tokio virtual time.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use notelock_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic environment for tests.
///
/// Randomness comes from a seeded `ChaCha8Rng`; each [`Environment::rng`]
/// call forks a child stream from the shared parent, so concurrent
/// cryptographic operations stay reproducible for a given seed. Time is
/// tokio time, which `#[tokio::test(start_paused = true)]` turns into a
/// virtual clock.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment with the default seed.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an environment with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))) }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;
    type Rng = ChaCha8Rng;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    /// Fork a child RNG from the shared parent stream.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/simulation code.
    #[allow(clippy::expect_used)]
    fn rng(&self) -> Self::Rng {
        let mut parent = self.rng.lock().expect("Mutex poisoned");
        ChaCha8Rng::seed_from_u64(parent.next_u64())
    }
}
