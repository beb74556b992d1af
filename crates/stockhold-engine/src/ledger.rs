//! # Reservation Ledger
//!
//! Reservation records keyed by ID, plus a secondary index of active holds.
//!
//! ## Indexes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger State                                    │
//! │                                                                         │
//! │  reservations: reservation_id ──► Reservation   (every status, forever) │
//! │                                                                         │
//! │  active:       (sku, user_id) ──► reservation_id  (RESERVED only)       │
//! │                                                                         │
//! │  insert:     adds both, unless the pair already has an active hold     │
//! │  transition: updates status; leaving RESERVED drops the active entry   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both maps live under one lock so they can never disagree. Status checks
//! and the transition that follows them happen under that lock, so two
//! racing operations on one reservation cannot both succeed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use stockhold_core::{CoreError, CoreResult, Reservation, ReservationStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct LedgerState {
    reservations: HashMap<Uuid, Reservation>,
    active: HashMap<(String, String), Uuid>,
}

/// Owns every reservation record.
#[derive(Debug, Default)]
pub struct ReservationLedger {
    state: RwLock<LedgerState>,
}

impl ReservationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a reservation by ID.
    pub async fn get(&self, reservation_id: Uuid) -> Option<Reservation> {
        self.state
            .read()
            .await
            .reservations
            .get(&reservation_id)
            .cloned()
    }

    /// Returns the user's `RESERVED` hold on `sku`, if any.
    pub async fn active_for(&self, sku: &str, user_id: &str) -> Option<Reservation> {
        let state = self.state.read().await;
        state
            .active
            .get(&(sku.to_string(), user_id.to_string()))
            .and_then(|id| state.reservations.get(id))
            .cloned()
    }

    /// Stores a new `RESERVED` hold.
    ///
    /// If the same `(sku, user_id)` already has an active hold, nothing is
    /// stored and the existing hold is returned as `Err`. The caller still
    /// owns the inventory it decremented for the rejected record.
    pub async fn insert(&self, reservation: Reservation) -> Result<Reservation, Reservation> {
        let mut state = self.state.write().await;
        let key = (reservation.sku.clone(), reservation.user_id.clone());

        if let Some(existing) = state
            .active
            .get(&key)
            .and_then(|id| state.reservations.get(id))
        {
            return Err(existing.clone());
        }

        if reservation.is_active() {
            state.active.insert(key, reservation.reservation_id);
        }
        state
            .reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(reservation)
    }

    /// Moves a reservation to `next`, after `check` approves it.
    ///
    /// `check` runs under the ledger lock, after the status check, and sees
    /// the record as it is right now. Returning `Err` from it aborts the
    /// transition and surfaces that error.
    ///
    /// ## Errors
    /// - `NotFound` for an unknown ID
    /// - `InvalidState` if the current status has no edge to `next`
    /// - whatever `check` returns
    pub async fn transition<F>(
        &self,
        reservation_id: Uuid,
        next: ReservationStatus,
        check: F,
    ) -> CoreResult<Reservation>
    where
        F: FnOnce(&Reservation) -> CoreResult<()>,
    {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(CoreError::NotFound(reservation_id))?;

        if !reservation.status.can_transition_to(next) {
            return Err(CoreError::InvalidState {
                reservation_id,
                status: reservation.status,
            });
        }

        check(reservation)?;
        reservation.transition_to(next)?;

        let key = (reservation.sku.clone(), reservation.user_id.clone());
        if state.active.get(&key) == Some(&reservation_id) {
            state.active.remove(&key);
        }

        Ok(reservation.clone())
    }

    /// IDs of `RESERVED` holds whose expiry is strictly before `now`.
    pub async fn overdue(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let state = self.state.read().await;
        state
            .active
            .values()
            .filter_map(|id| state.reservations.get(id))
            .filter(|r| r.is_expired_at(now))
            .map(|r| r.reservation_id)
            .collect()
    }

    /// Units currently held by `RESERVED` reservations on `sku`.
    pub async fn held_quantity(&self, sku: &str) -> i64 {
        let state = self.state.read().await;
        state
            .active
            .iter()
            .filter(|((s, _), _)| s == sku)
            .filter_map(|(_, id)| state.reservations.get(id))
            .map(|r| r.quantity)
            .sum()
    }

    /// All reservations for `sku`, in no particular order.
    pub async fn for_sku(&self, sku: &str) -> Vec<Reservation> {
        self.state
            .read()
            .await
            .reservations
            .values()
            .filter(|r| r.sku == sku)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hold(sku: &str, user: &str, quantity: i64, now: DateTime<Utc>) -> Reservation {
        Reservation::new(sku, user, quantity, now, Duration::seconds(60))
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let r = ledger.insert(hold("X", "alice", 2, now)).await.unwrap();

        assert_eq!(ledger.get(r.reservation_id).await, Some(r.clone()));
        assert_eq!(ledger.active_for("X", "alice").await, Some(r));
        assert_eq!(ledger.active_for("X", "bob").await, None);
        assert_eq!(ledger.held_quantity("X").await, 2);
    }

    #[tokio::test]
    async fn test_second_active_hold_is_rejected() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let first = ledger.insert(hold("X", "alice", 1, now)).await.unwrap();

        let existing = ledger.insert(hold("X", "alice", 3, now)).await.unwrap_err();
        assert_eq!(existing.reservation_id, first.reservation_id);
        assert_eq!(ledger.for_sku("X").await.len(), 1);

        // Different SKU is a different hold
        assert!(ledger.insert(hold("Y", "alice", 1, now)).await.is_ok());
    }

    #[tokio::test]
    async fn test_transition_clears_active_index() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let r = ledger.insert(hold("X", "alice", 1, now)).await.unwrap();

        let cancelled = ledger
            .transition(r.reservation_id, ReservationStatus::Cancelled, |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(ledger.active_for("X", "alice").await, None);
        assert_eq!(ledger.held_quantity("X").await, 0);

        // A fresh hold is allowed again
        assert!(ledger.insert(hold("X", "alice", 1, now)).await.is_ok());
    }

    #[tokio::test]
    async fn test_transition_errors() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();

        let err = ledger
            .transition(Uuid::new_v4(), ReservationStatus::Confirmed, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let r = ledger.insert(hold("X", "alice", 1, now)).await.unwrap();
        ledger
            .transition(r.reservation_id, ReservationStatus::Confirmed, |_| Ok(()))
            .await
            .unwrap();

        let err = ledger
            .transition(r.reservation_id, ReservationStatus::Confirmed, |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState {
                status: ReservationStatus::Confirmed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rejected_check_leaves_record_untouched() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let r = ledger.insert(hold("X", "alice", 1, now)).await.unwrap();

        let err = ledger
            .transition(r.reservation_id, ReservationStatus::Confirmed, |r| {
                Err(CoreError::Expired {
                    reservation_id: r.reservation_id,
                    expired_at: r.expires_at,
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Expired { .. }));

        let stored = ledger.get(r.reservation_id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Reserved);
        assert!(ledger.active_for("X", "alice").await.is_some());
    }

    #[tokio::test]
    async fn test_overdue() {
        let ledger = ReservationLedger::new();
        let now = Utc::now();
        let old = ledger
            .insert(hold("X", "alice", 1, now - Duration::seconds(120)))
            .await
            .unwrap();
        let fresh = ledger.insert(hold("X", "bob", 1, now)).await.unwrap();

        let overdue = ledger.overdue(now).await;
        assert_eq!(overdue, vec![old.reservation_id]);
        assert!(!overdue.contains(&fresh.reservation_id));
    }
}
