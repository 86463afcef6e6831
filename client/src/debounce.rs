//! Keyed debounce timers.
//!
//! Each key has at most one pending timer. Scheduling a key again cancels the
//! pending one, so only the last call inside the window fires. Once a timer
//! fires its work runs to completion; cancellation only reaches timers that
//! are still sleeping.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::busy::BusyCounter;

struct Pending {
    generation: u64,
    token: CancellationToken,
}

type PendingMap<K> = Arc<Mutex<HashMap<K, Pending>>>;

fn lock<K>(map: &Mutex<HashMap<K, Pending>>) -> MutexGuard<'_, HashMap<K, Pending>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Debouncer<K> {
    pending: PendingMap<K>,
    next_generation: AtomicU64,
    active: BusyCounter,
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            active: BusyCounter::new(),
        }
    }

    /// Run `work` after `delay` unless `key` is scheduled again or cancelled
    /// first. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let replaced = lock(&self.pending).insert(
            key.clone(),
            Pending {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = replaced {
            previous.token.cancel();
        }

        let pending = Arc::clone(&self.pending);
        let guard = self.active.enter();
        tokio::spawn(async move {
            let _guard = guard;
            let slept = tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            // Claiming the entry under the lock decides the race with
            // `cancel`/`schedule`: whoever removes or replaces it first wins.
            let fire = {
                let mut map = lock(&pending);
                let current = map.get(&key).is_some_and(|p| p.generation == generation);
                if current {
                    map.remove(&key);
                }
                slept && current
            };
            if fire {
                work.await;
            }
        });
    }

    /// Cancel the pending timer for `key`. Returns `false` when nothing was
    /// pending, including when the timer already fired.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.pending).remove(key) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.pending).contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Timers that are sleeping or whose work is still running.
    pub fn active_count(&self) -> usize {
        self.active.count()
    }

    pub async fn idle(&self) {
        self.active.idle().await;
    }
}
