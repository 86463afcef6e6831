//! In-flight counter with RAII guards.

use std::sync::Arc;

use tokio::sync::watch;

/// Counts outstanding work. Every [`BusyCounter::enter`] returns a guard
/// that decrements on drop, so early returns and `?` cannot leak a count.
#[derive(Clone, Debug)]
pub struct BusyCounter {
    count: Arc<watch::Sender<usize>>,
}

impl Default for BusyCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BusyCounter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    pub fn enter(&self) -> BusyGuard {
        self.count.send_modify(|n| *n += 1);
        BusyGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }

    /// Resolve once the count reaches zero.
    pub async fn idle(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so this only errs if it was dropped.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}
