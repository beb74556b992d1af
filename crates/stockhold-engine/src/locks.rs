//! # Per-SKU Lock Manager
//!
//! One async mutex per SKU, created lazily on first use.
//!
//! ## Locking Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SKU Lock Registry                                │
//! │                                                                         │
//! │  registry: Mutex<HashMap<sku, Arc<Mutex<()>>>>                          │
//! │     │   held only for get-or-create, never while waiting on a SKU      │
//! │     │                                                                   │
//! │     ├── "SKU-A" ──► Mutex<()>  ◄── task 1 (holding)                     │
//! │     │                          ◄── task 2 (waiting)                     │
//! │     │                                                                   │
//! │     └── "SKU-B" ──► Mutex<()>  ◄── task 3 (holding, in parallel)        │
//! │                                                                         │
//! │  • Same SKU: strictly serialized                                       │
//! │  • Different SKUs: fully parallel                                      │
//! │  • Never hold one SKU lock while acquiring another                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard releases the SKU lock when dropped, so every exit path from a
//! critical section (including `?` returns) unlocks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of per-SKU mutexes.
#[derive(Debug, Default)]
pub struct SkuLocks {
    registry: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Exclusive access to one SKU. Unlocks on drop.
#[derive(Debug)]
pub struct SkuGuard {
    _guard: OwnedMutexGuard<()>,
}

impl SkuLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the mutex for `sku`, creating it on first use.
    ///
    /// Creation happens under the registry lock, so concurrent first-time
    /// callers always receive the same mutex.
    pub async fn lock_for(&self, sku: &str) -> Arc<Mutex<()>> {
        let mut registry = self.registry.lock().await;
        if let Some(lock) = registry.get(sku) {
            return Arc::clone(lock);
        }

        debug!(sku = %sku, "Creating SKU lock");
        let lock = Arc::new(Mutex::new(()));
        registry.insert(sku.to_string(), Arc::clone(&lock));
        lock
    }

    /// Waits for exclusive access to `sku`.
    pub async fn acquire(&self, sku: &str) -> SkuGuard {
        // Registry lock is released before we wait on the SKU itself
        let lock = self.lock_for(sku).await;
        SkuGuard {
            _guard: lock.lock_owned().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_shares_one_lock() {
        let locks = Arc::new(SkuLocks::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let locks = Arc::clone(&locks);
                tokio::spawn(async move { locks.lock_for("HOT").await })
            })
            .collect();

        let mut created = Vec::new();
        for handle in handles {
            created.push(handle.await.unwrap());
        }

        assert!(created.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(Arc::ptr_eq(&created[0], &locks.lock_for("HOT").await));
        assert!(!Arc::ptr_eq(&created[0], &locks.lock_for("COLD").await));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_sku_is_serialized() {
        let locks = Arc::new(SkuLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _guard = locks.acquire("X").await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_skus_do_not_block() {
        let locks = SkuLocks::new();
        let _a = locks.acquire("A").await;

        // Would deadlock if SKUs shared a lock
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("B")).await;
        assert!(b.is_ok(), "different SKU should not wait");

        // Same SKU does wait
        let a_again = tokio::time::timeout(Duration::from_millis(50), locks.acquire("A")).await;
        assert!(a_again.is_err());
    }

    #[tokio::test]
    async fn test_guard_drop_releases() {
        let locks = SkuLocks::new();
        {
            let _guard = locks.acquire("X").await;
        }
        let reacquired = tokio::time::timeout(Duration::from_secs(1), locks.acquire("X")).await;
        assert!(reacquired.is_ok());
    }
}
