//! Per-key async locks.

use std::{hash::Hash, sync::Arc};

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use and dropped once no task
/// holds or awaits it.
#[derive(Debug)]
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<FxHashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash> KeyedLocks<K> {
    /// Waits for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;

            locks.retain(|_, lock| Arc::strong_count(lock) > 1);

            Arc::clone(locks.entry(key).or_default())
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
