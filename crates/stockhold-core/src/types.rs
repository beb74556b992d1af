//! # Domain Types
//!
//! Core domain types used throughout Stockhold.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Reservation   │   │  WaitlistEntry  │   │ UserFairness    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │     Stats       │       │
//! │  │  id (UUID)      │   │  sku            │   │  ─────────────  │       │
//! │  │  sku, user_id   │   │  user_id        │   │  total_attempts │       │
//! │  │  quantity       │   │  quantity       │   │  successful_    │       │
//! │  │  status         │   │  sequence       │   │   completions   │       │
//! │  │  expires_at     │   │  enqueued_at    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ReservationStatus│   │ ReservationOut- │   │  DemandStatus   │       │
//! │  │  ─────────────  │   │     come        │   │  ─────────────  │       │
//! │  │  RESERVED       │   │  ─────────────  │   │  HEALTHY        │       │
//! │  │  CONFIRMED      │   │  Reserved(..)   │   │  OUT_OF_STOCK   │       │
//! │  │  CANCELLED      │   │  Waitlisted(..) │   │  HIGH_DEMAND    │       │
//! │  │  EXPIRED        │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reservation State Machine
//! ```text
//!                  ┌──────────► CONFIRMED   (before expires_at)
//!                  │
//!   RESERVED ──────┼──────────► CANCELLED   (explicit cancel)
//!                  │
//!                  └──────────► EXPIRED     (lazy touch or reaper sweep)
//!
//!   No transition leaves a terminal state.
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Reservation Status
// =============================================================================

/// Lifecycle status of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Inventory is held for the user until `expires_at`.
    #[default]
    Reserved,
    /// The user completed the transaction.
    Confirmed,
    /// The user released the hold.
    Cancelled,
    /// The hold lapsed and inventory was returned.
    Expired,
}

impl ReservationStatus {
    /// Returns true for statuses no transition can leave.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Reserved)
    }

    /// Returns true if moving from `self` to `next` is legal.
    ///
    /// Only `RESERVED` has outgoing edges, and every edge ends in a
    /// terminal status.
    #[inline]
    pub const fn can_transition_to(&self, next: ReservationStatus) -> bool {
        matches!(self, ReservationStatus::Reserved) && next.is_terminal()
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationStatus::Reserved => write!(f, "RESERVED"),
            ReservationStatus::Confirmed => write!(f, "CONFIRMED"),
            ReservationStatus::Cancelled => write!(f, "CANCELLED"),
            ReservationStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

// =============================================================================
// Reservation
// =============================================================================

/// A time-boxed claim on a quantity of a SKU for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier (UUID v4).
    pub reservation_id: Uuid,

    /// SKU the hold is against.
    pub sku: String,

    /// User holding the inventory.
    pub user_id: String,

    /// Units held. Always positive.
    pub quantity: i64,

    /// Current lifecycle status.
    pub status: ReservationStatus,

    /// When the hold was granted.
    pub created_at: DateTime<Utc>,

    /// When the hold lapses if not confirmed.
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a fresh `RESERVED` hold lasting `ttl` from `now`.
    ///
    /// Callers must only construct this after the inventory decrement
    /// succeeded.
    pub fn new(
        sku: impl Into<String>,
        user_id: impl Into<String>,
        quantity: i64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Reservation {
            reservation_id: Uuid::new_v4(),
            sku: sku.into(),
            user_id: user_id.into(),
            quantity,
            status: ReservationStatus::Reserved,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Returns true while the reservation still holds inventory.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Reserved
    }

    /// Returns true once `now` is strictly past the expiry timestamp.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Applies a state-machine transition.
    ///
    /// ## Errors
    /// `InvalidState` if the current status has no edge to `next`.
    pub fn transition_to(&mut self, next: ReservationStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidState {
                reservation_id: self.reservation_id,
                status: self.status,
            });
        }
        self.status = next;
        Ok(())
    }
}

// =============================================================================
// Waitlist
// =============================================================================

/// Demand that could not be satisfied when it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub sku: String,
    pub user_id: String,
    pub quantity: i64,
    /// Global enqueue order. Lower values were queued first.
    pub sequence: u64,
    pub enqueued_at: DateTime<Utc>,
}

/// Returned to a caller whose request was queued instead of reserved.
///
/// The caller holds no inventory. A later release may promote the request
/// into a real reservation without the caller asking again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistTicket {
    pub sku: String,
    pub user_id: String,
    pub quantity: i64,
    /// Queue length right after this request was appended.
    pub position: usize,
}

/// Result of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReservationOutcome {
    /// Inventory is held (newly, or by an existing idempotent hold).
    Reserved(Reservation),
    /// Stock was short; the request waits in the SKU's queue.
    Waitlisted(WaitlistTicket),
}

impl ReservationOutcome {
    /// Returns the reservation if inventory is held.
    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            ReservationOutcome::Reserved(reservation) => Some(reservation),
            ReservationOutcome::Waitlisted(_) => None,
        }
    }

    /// Consumes the outcome, returning the reservation if inventory is held.
    pub fn into_reservation(self) -> Option<Reservation> {
        match self {
            ReservationOutcome::Reserved(reservation) => Some(reservation),
            ReservationOutcome::Waitlisted(_) => None,
        }
    }

    /// Returns true if the request was queued.
    pub fn is_waitlisted(&self) -> bool {
        matches!(self, ReservationOutcome::Waitlisted(_))
    }
}

// =============================================================================
// Fairness Stats
// =============================================================================

/// Per-user counters backing the fairness score.
///
/// Both counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFairnessStats {
    /// Reservation requests made (promotion retries are not counted).
    pub total_attempts: u64,
    /// Reservations the user confirmed.
    pub successful_completions: u64,
}

impl UserFairnessStats {
    /// Ratio of confirmations to attempts.
    ///
    /// New users are granted full trust (1.0).
    pub fn score(&self) -> f64 {
        if self.total_attempts == 0 {
            return 1.0;
        }
        self.successful_completions as f64 / self.total_attempts as f64
    }
}

// =============================================================================
// Inventory Views
// =============================================================================

/// Current stock level for a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub sku: String,
    pub available_quantity: i64,
}

/// Coarse demand signal derived from stock and queue length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DemandStatus {
    /// Stock is available.
    Healthy,
    /// No stock and nobody waiting.
    OutOfStock,
    /// No stock and a non-empty waitlist.
    HighDemand,
}

impl DemandStatus {
    /// Classifies a SKU from its available stock and waitlist length.
    pub fn classify(available: i64, waitlist_size: usize) -> Self {
        if available > 0 {
            DemandStatus::Healthy
        } else if waitlist_size > 0 {
            DemandStatus::HighDemand
        } else {
            DemandStatus::OutOfStock
        }
    }
}

/// Read-only health snapshot consumed by monitoring collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryHealth {
    pub sku: String,
    pub available_inventory: i64,
    pub waitlist_size: usize,
    pub status: DemandStatus,
}

impl InventoryHealth {
    /// Builds a snapshot, deriving the demand status.
    pub fn new(sku: impl Into<String>, available_inventory: i64, waitlist_size: usize) -> Self {
        InventoryHealth {
            sku: sku.into(),
            available_inventory,
            waitlist_size,
            status: DemandStatus::classify(available_inventory, waitlist_size),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(ttl_secs: i64) -> Reservation {
        let now = Utc::now();
        Reservation::new("SKU-1", "alice", 2, now, Duration::seconds(ttl_secs))
    }

    #[test]
    fn test_new_reservation_is_reserved() {
        let r = hold(300);
        assert_eq!(r.status, ReservationStatus::Reserved);
        assert!(r.is_active());
        assert_eq!(r.expires_at - r.created_at, Duration::seconds(300));
        assert_eq!(ReservationStatus::default(), ReservationStatus::Reserved);
    }

    #[test]
    fn test_expiry_is_strict() {
        let r = hold(60);
        assert!(!r.is_expired_at(r.expires_at));
        assert!(r.is_expired_at(r.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn test_legal_transitions() {
        for next in [
            ReservationStatus::Confirmed,
            ReservationStatus::Cancelled,
            ReservationStatus::Expired,
        ] {
            let mut r = hold(60);
            assert!(r.transition_to(next).is_ok());
            assert_eq!(r.status, next);
            assert!(!r.is_active());
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut r = hold(60);
        r.transition_to(ReservationStatus::Confirmed).unwrap();

        let err = r.transition_to(ReservationStatus::Cancelled).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState {
                status: ReservationStatus::Confirmed,
                ..
            }
        ));
        assert!(r.transition_to(ReservationStatus::Reserved).is_err());
        assert_eq!(r.status, ReservationStatus::Confirmed);
    }

    #[test]
    fn test_reserved_to_reserved_is_illegal() {
        let mut r = hold(60);
        assert!(r.transition_to(ReservationStatus::Reserved).is_err());
    }

    #[test]
    fn test_fairness_score() {
        assert_eq!(UserFairnessStats::default().score(), 1.0);

        let stats = UserFairnessStats {
            total_attempts: 10,
            successful_completions: 8,
        };
        assert!((stats.score() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_demand_classification() {
        assert_eq!(DemandStatus::classify(5, 0), DemandStatus::Healthy);
        assert_eq!(DemandStatus::classify(5, 3), DemandStatus::Healthy);
        assert_eq!(DemandStatus::classify(0, 0), DemandStatus::OutOfStock);
        assert_eq!(DemandStatus::classify(0, 2), DemandStatus::HighDemand);
    }

    #[test]
    fn test_outcome_serialization() {
        let ticket = ReservationOutcome::Waitlisted(WaitlistTicket {
            sku: "X".into(),
            user_id: "bob".into(),
            quantity: 1,
            position: 1,
        });
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["outcome"], "waitlisted");
        assert_eq!(json["user_id"], "bob");

        let reserved = ReservationOutcome::Reserved(hold(60));
        let json = serde_json::to_value(&reserved).unwrap();
        assert_eq!(json["outcome"], "reserved");
        assert_eq!(json["status"], "RESERVED");
    }
}
