//! # Inventory Store
//!
//! Per-SKU available-quantity counters.
//!
//! The store is a plain data holder. Its internal `RwLock` only keeps the
//! map memory-safe; it does NOT make check-then-act sequences atomic. Every
//! caller that decrements must hold the SKU's lock from [`crate::locks`]
//! across the sufficiency check and the decrement.
//!
//! ```text
//!   SkuLocks::acquire("X") ──► get("X") >= qty ? ──► decrement("X", qty)
//!   └──────────────── one critical section ─────────────────────────┘
//! ```

use std::collections::HashMap;

use stockhold_core::validation::validate_stock_quantity;
use stockhold_core::{CoreError, CoreResult};
use tokio::sync::RwLock;
use tracing::warn;

/// SKU → available units. Absence means zero.
#[derive(Debug, Default)]
pub struct InventoryStore {
    counters: RwLock<HashMap<String, i64>>,
}

impl InventoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the counter for `sku` to `quantity`, creating it if needed.
    ///
    /// ## Errors
    /// `InvalidArgument` if `quantity` is negative.
    pub async fn initialize(&self, sku: &str, quantity: i64) -> CoreResult<()> {
        validate_stock_quantity(quantity)?;
        self.counters.write().await.insert(sku.to_string(), quantity);
        Ok(())
    }

    /// Returns the available units, or 0 for an unknown SKU.
    pub async fn get(&self, sku: &str) -> i64 {
        self.counters.read().await.get(sku).copied().unwrap_or(0)
    }

    /// Removes `quantity` units.
    ///
    /// The caller must already hold the SKU lock and have checked
    /// `get(sku) >= quantity`. A counter that would go negative is refused
    /// rather than corrupted.
    ///
    /// ## Errors
    /// - `UnknownSku` if the SKU was never initialized
    /// - `InsufficientInventory` if the caller skipped the check
    pub async fn decrement(&self, sku: &str, quantity: i64) -> CoreResult<()> {
        let mut counters = self.counters.write().await;
        let available = counters
            .get_mut(sku)
            .ok_or_else(|| CoreError::UnknownSku(sku.to_string()))?;

        if *available < quantity {
            return Err(CoreError::InsufficientInventory {
                sku: sku.to_string(),
                available: *available,
                requested: quantity,
            });
        }

        *available -= quantity;
        Ok(())
    }

    /// Returns `quantity` units, creating the counter if it was missing.
    ///
    /// A release runs after the reservation has already left `RESERVED`, so
    /// it cannot fail. The counter saturates at `i64::MAX` instead of
    /// wrapping. Stock levels are capped well below that by
    /// [`stockhold_core::MAX_STOCK_QUANTITY`], so saturation needs millions
    /// of max-size restocks with every unit still held.
    pub async fn increment(&self, sku: &str, quantity: i64) {
        let mut counters = self.counters.write().await;
        let available = counters.entry(sku.to_string()).or_insert(0);

        *available = available.checked_add(quantity).unwrap_or_else(|| {
            warn!(sku = %sku, quantity, "Inventory counter saturated");
            i64::MAX
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_sku_reads_zero() {
        let store = InventoryStore::new();
        assert_eq!(store.get("missing").await, 0);
    }

    #[tokio::test]
    async fn test_initialize_rejects_negative() {
        let store = InventoryStore::new();
        let err = store.initialize("X", -1).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert!(store.decrement("X", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_initialize_rejects_above_cap() {
        let store = InventoryStore::new();
        let err = store.initialize("X", i64::MAX).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
        assert_eq!(store.get("X").await, 0);
    }

    #[tokio::test]
    async fn test_initialize_overwrites() {
        let store = InventoryStore::new();
        store.initialize("X", 5).await.unwrap();
        store.initialize("X", 2).await.unwrap();
        assert_eq!(store.get("X").await, 2);
    }

    #[tokio::test]
    async fn test_decrement_and_increment() {
        let store = InventoryStore::new();
        store.initialize("X", 5).await.unwrap();

        store.decrement("X", 3).await.unwrap();
        assert_eq!(store.get("X").await, 2);

        store.increment("X", 1).await;
        assert_eq!(store.get("X").await, 3);
    }

    #[tokio::test]
    async fn test_decrement_unknown_sku() {
        let store = InventoryStore::new();
        let err = store.decrement("ghost", 1).await.unwrap_err();
        assert!(matches!(err, CoreError::UnknownSku(sku) if sku == "ghost"));
    }

    #[tokio::test]
    async fn test_decrement_never_goes_negative() {
        let store = InventoryStore::new();
        store.initialize("X", 1).await.unwrap();

        let err = store.decrement("X", 2).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientInventory {
                available: 1,
                requested: 2,
                ..
            }
        ));
        assert_eq!(store.get("X").await, 1);
    }

    #[tokio::test]
    async fn test_increment_saturates_instead_of_wrapping() {
        let store = InventoryStore::new();
        store
            .initialize("X", stockhold_core::MAX_STOCK_QUANTITY)
            .await
            .unwrap();

        store.increment("X", i64::MAX).await;
        assert_eq!(store.get("X").await, i64::MAX);

        store.increment("X", 1).await;
        assert_eq!(store.get("X").await, i64::MAX);
    }

    #[tokio::test]
    async fn test_increment_creates_counter() {
        let store = InventoryStore::new();
        store.increment("late", 4).await;
        assert_eq!(store.get("late").await, 4);
    }
}
