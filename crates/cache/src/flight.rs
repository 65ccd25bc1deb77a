//! Per-key request collapsing
//!
//! Concurrent misses on the same cache key serialize on a per-key lock.
//! The first holder resolves and fills the cache; everyone queued behind it
//! re-checks the cache after acquiring the lock and finds the entry.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of per-key locks
#[derive(Clone, Default)]
pub struct SingleFlight {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held while a key is being resolved; releasing it wakes the next waiter
pub struct FlightGuard {
    key: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Number of keys with a holder or waiters
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

impl std::fmt::Debug for SingleFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl std::fmt::Debug for FlightGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGuard").field("key", &self.key).finish()
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Release the lock before checking whether anyone else still references it
        drop(self.guard.take());
        // Only the map's own handle left: nobody holds or waits for this key
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_serializes_same_key() {
        let flights = SingleFlight::new();
        let running = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = flights.acquire("same").await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), flights.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(flights.in_flight(), 2);
    }
}
