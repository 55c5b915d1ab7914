use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{DoclensError, DoclensResult};

static GLOBAL: LazyLock<Arc<LocationLocks>> = LazyLock::new(|| Arc::new(LocationLocks::new()));

/// One ingest lock per storage location.
///
/// Acquisition never waits: a second ingest into a busy location fails with
/// [`DoclensError::Busy`] instead of queueing behind the first.
#[derive(Debug, Default)]
pub struct LocationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LocationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide lock table shared by every engine.
    pub fn global() -> Arc<LocationLocks> {
        Arc::clone(&GLOBAL)
    }

    /// Take the lock for `location`, or fail if it is held.
    pub fn try_acquire(&self, location: &str) -> DoclensResult<OwnedMutexGuard<()>> {
        let lock = Arc::clone(
            &self
                .locks
                .entry(location.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );

        lock.try_lock_owned().map_err(|_| DoclensError::Busy {
            location: location.to_string(),
        })
    }
}
