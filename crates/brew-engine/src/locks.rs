//! Per-order mutual exclusion.
//!
//! Update, close and delete of one order id run one at a time; different
//! ids never contend beyond the brief map lookup.
//!
//! An entry lives only while some caller holds or waits on it. The last
//! guard to drop removes it, so the map is bounded by in-flight calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<Mutex<()>>>;

#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Arc<StdMutex<LockMap>>,
}

/// Exclusive access to one order id.
#[derive(Debug)]
pub struct OrderGuard {
    order_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<StdMutex<LockMap>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`. Released when the guard drops.
    pub async fn acquire(&self, order_id: &str) -> OrderGuard {
        let lock = Arc::clone(lock_map(&self.locks).entry(order_id.to_string()).or_default());
        let guard = lock.lock_owned().await;
        OrderGuard {
            order_id: order_id.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

impl Drop for OrderGuard {
    fn drop(&mut self) {
        // Our own clone of the mutex goes away with the guard
        drop(self.guard.take());

        let mut locks = lock_map(&self.locks);
        let idle = locks
            .get(&self.order_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.order_id);
        }
    }
}

/// The map is never left half-updated, so a poisoned lock is still usable.
fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}
