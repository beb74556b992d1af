//! # Reservation Engine
//!
//! The only component callers talk to. It validates input, enforces
//! idempotency, takes SKU locks, applies the fairness policy, drives the
//! reservation state machine and promotes waitlisted demand.
//!
//! ## Reserve Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   create_reservation(sku, user, qty)                    │
//! │                                                                         │
//! │  1. validate input ─────────────────────────► InvalidArgument          │
//! │  2. active hold for (sku, user)? ───── yes ─► return it unchanged      │
//! │  3. record attempt, size TTL from prior stats                          │
//! │  4. ┌── SKU lock ─────────────────────────┐                            │
//! │     │ available >= qty ? decrement : short │                            │
//! │     └──────────────────────────────────────┘                            │
//! │  5a. decremented ──► ledger.insert(RESERVED) ──► Reserved(..)          │
//! │  5b. short ────────► waitlist.enqueue ─────────► Waitlisted(..)        │
//! │      (queued before the SKU lock is released)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Release Flow (cancel / expire)
//! ```text
//!   ledger.transition(..)  ──►  SKU lock: increment  ──►  promote_waitlist
//!   (ledger lock only)          (SKU lock only)           (no lock held)
//! ```
//!
//! ## Lock Rules
//! - The ledger lock and a SKU lock are never held at the same time
//! - A short request is (re-)queued while its SKU lock is still held, so a
//!   release on that SKU either sees the stock taken or sees the entry
//! - No SKU lock is held while promotion runs
//! - Promotion is a bounded loop, never recursion

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use stockhold_core::validation::{
    validate_reservation_quantity, validate_sku, validate_stock_quantity, validate_user_id,
};
use stockhold_core::{
    CoreError, CoreResult, InventoryHealth, InventoryLevel, Reservation, ReservationOutcome,
    ReservationStatus, UserFairnessStats, WaitlistEntry, WaitlistTicket,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, WaitlistSettings};
use crate::fairness::FairnessTracker;
use crate::inventory::InventoryStore;
use crate::ledger::ReservationLedger;
use crate::locks::{SkuGuard, SkuLocks};
use crate::waitlist::WaitlistQueue;

/// Orchestrates inventory, locks, fairness, ledger and waitlist.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct ReservationEngine {
    inventory: InventoryStore,
    locks: SkuLocks,
    fairness: FairnessTracker,
    ledger: ReservationLedger,
    waitlist: WaitlistQueue,
    settings: WaitlistSettings,
    clock: Arc<dyn Clock>,
}

impl ReservationEngine {
    /// Creates an engine on the wall clock.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine reading time from `clock`.
    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        ReservationEngine {
            inventory: InventoryStore::new(),
            locks: SkuLocks::new(),
            fairness: FairnessTracker::new(config.fairness.clone()),
            ledger: ReservationLedger::new(),
            waitlist: WaitlistQueue::new(),
            settings: config.waitlist.clone(),
            clock,
        }
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    /// Sets the stock level for `sku`.
    ///
    /// Runs under the SKU lock so it never lands in the middle of another
    /// caller's check-then-decrement. Fresh stock promotes waiting demand.
    ///
    /// ## Errors
    /// `InvalidArgument` for a malformed SKU or a negative quantity.
    pub async fn initialize_inventory(
        &self,
        sku: &str,
        quantity: i64,
    ) -> CoreResult<InventoryLevel> {
        validate_sku(sku)?;
        validate_stock_quantity(quantity)?;

        {
            let _guard = self.locks.acquire(sku).await;
            self.inventory.initialize(sku, quantity).await?;
        }
        info!(sku = %sku, quantity, "Inventory initialized");

        if quantity > 0 {
            self.promote_waitlist(sku).await;
        }

        Ok(InventoryLevel {
            sku: sku.to_string(),
            available_quantity: quantity,
        })
    }

    /// Current stock for `sku` (0 if never initialized). Never fails.
    pub async fn get_inventory(&self, sku: &str) -> InventoryLevel {
        InventoryLevel {
            sku: sku.to_string(),
            available_quantity: self.inventory.get(sku).await,
        }
    }

    // =========================================================================
    // Reservations
    // =========================================================================

    /// Reserves `quantity` units of `sku` for `user_id`, or waitlists the
    /// request if stock is short.
    ///
    /// A user with a `RESERVED` hold on the same SKU gets that hold back
    /// unchanged; no second hold is ever created for the pair.
    ///
    /// ## Errors
    /// `InvalidArgument` for a malformed SKU, user ID or non-positive
    /// quantity. A shortage is not an error: it yields `Waitlisted`.
    pub async fn create_reservation(
        &self,
        sku: &str,
        user_id: &str,
        quantity: i64,
    ) -> CoreResult<ReservationOutcome> {
        validate_sku(sku)?;
        validate_user_id(user_id)?;
        validate_reservation_quantity(quantity)?;

        if let Some(existing) = self.ledger.active_for(sku, user_id).await {
            debug!(
                sku = %sku,
                user_id = %user_id,
                reservation_id = %existing.reservation_id,
                "Returning existing active reservation"
            );
            return Ok(ReservationOutcome::Reserved(existing));
        }

        let prior = self.fairness.record_attempt(user_id).await;
        let ttl = self.fairness.policy().ttl(&prior);

        match self.hold_stock(sku, user_id, quantity, ttl).await? {
            Hold::Placed(reservation) => Ok(ReservationOutcome::Reserved(reservation)),
            Hold::Duplicate(existing) => {
                // Stock this request took and gave back may be owed to the queue
                self.promote_waitlist(sku).await;
                Ok(ReservationOutcome::Reserved(existing))
            }
            Hold::Short { available, guard } => {
                let position = self
                    .waitlist
                    .enqueue(sku, user_id, quantity, self.clock.now())
                    .await;
                drop(guard);
                warn!(
                    sku = %sku,
                    user_id = %user_id,
                    quantity,
                    available,
                    position,
                    "Insufficient inventory, request waitlisted"
                );
                Ok(ReservationOutcome::Waitlisted(WaitlistTicket {
                    sku: sku.to_string(),
                    user_id: user_id.to_string(),
                    quantity,
                    position,
                }))
            }
        }
    }

    /// Completes a hold.
    ///
    /// An overdue hold is expired on the spot (stock released, waitlist
    /// promoted) and the call fails with `Expired`.
    ///
    /// ## Errors
    /// `NotFound`, `InvalidState` (status is not `RESERVED`), `Expired`.
    pub async fn confirm_reservation(&self, reservation_id: Uuid) -> CoreResult<Reservation> {
        let now = self.clock.now();
        let result = self
            .ledger
            .transition(reservation_id, ReservationStatus::Confirmed, |r| {
                reject_if_overdue(r, now)
            })
            .await;

        match result {
            Ok(reservation) => {
                self.fairness.record_success(&reservation.user_id).await;
                info!(
                    reservation_id = %reservation_id,
                    sku = %reservation.sku,
                    user_id = %reservation.user_id,
                    "Reservation confirmed"
                );
                Ok(reservation)
            }
            Err(err @ CoreError::Expired { .. }) => {
                self.expire_reservation(reservation_id).await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Releases a hold at the user's request and promotes the waitlist.
    ///
    /// An overdue hold is expired instead, exactly as on confirm.
    ///
    /// ## Errors
    /// `NotFound`, `InvalidState` (status is not `RESERVED`), `Expired`.
    pub async fn cancel_reservation(&self, reservation_id: Uuid) -> CoreResult<Reservation> {
        let now = self.clock.now();
        let result = self
            .ledger
            .transition(reservation_id, ReservationStatus::Cancelled, |r| {
                reject_if_overdue(r, now)
            })
            .await;

        match result {
            Ok(reservation) => {
                self.release_stock(&reservation.sku, reservation.quantity).await;
                info!(
                    reservation_id = %reservation_id,
                    sku = %reservation.sku,
                    quantity = reservation.quantity,
                    "Reservation cancelled"
                );
                self.promote_waitlist(&reservation.sku).await;
                Ok(reservation)
            }
            Err(err @ CoreError::Expired { .. }) => {
                self.expire_reservation(reservation_id).await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Expires a `RESERVED` hold, releasing its stock and promoting the
    /// waitlist.
    ///
    /// Safe to call on anything: unknown IDs and holds that already left
    /// `RESERVED` are a no-op returning `None`. The expiry timestamp is not
    /// consulted; callers decide when a hold is due.
    pub async fn expire_reservation(&self, reservation_id: Uuid) -> Option<Reservation> {
        let reservation = self
            .ledger
            .transition(reservation_id, ReservationStatus::Expired, |_| Ok(()))
            .await
            .ok()?;

        self.release_stock(&reservation.sku, reservation.quantity).await;
        info!(
            reservation_id = %reservation_id,
            sku = %reservation.sku,
            user_id = %reservation.user_id,
            quantity = reservation.quantity,
            "Reservation expired"
        );
        self.promote_waitlist(&reservation.sku).await;
        Some(reservation)
    }

    /// Expires every `RESERVED` hold past its expiry. Returns how many.
    ///
    /// This is what the background reaper runs on each sweep.
    pub async fn expire_overdue(&self) -> usize {
        let overdue = self.ledger.overdue(self.clock.now()).await;
        let mut expired = 0;
        for reservation_id in overdue {
            if self.expire_reservation(reservation_id).await.is_some() {
                expired += 1;
            }
        }

        if expired > 0 {
            info!(expired, "Expired overdue reservations");
        }
        expired
    }

    // =========================================================================
    // Waitlist Promotion
    // =========================================================================

    /// Turns waiting requests for `sku` into reservations while stock lasts.
    ///
    /// Pops the head, retries the reserve path for it, and repeats until
    /// the queue is empty, an attempt fails, or the per-release bound is
    /// hit. Entries for users who already hold the SKU are dropped without
    /// counting toward the bound. A failed entry goes back per the
    /// configured requeue position; the failure itself is logged and
    /// swallowed since nobody is waiting on the result.
    ///
    /// Promotion retries do not count as new fairness attempts. The hold
    /// is sized from the user's stats at promotion time.
    pub async fn promote_waitlist(&self, sku: &str) -> Vec<Reservation> {
        let mut promoted = Vec::new();
        let mut attempts = 0;

        while attempts < self.settings.max_promotions_per_release {
            let Some(entry) = self.waitlist.pop_front(sku).await else {
                break;
            };

            if let Some(existing) = self.ledger.active_for(&entry.sku, &entry.user_id).await {
                debug!(
                    sku = %entry.sku,
                    user_id = %entry.user_id,
                    reservation_id = %existing.reservation_id,
                    "Waitlisted user already holds this SKU, dropping entry"
                );
                continue;
            }

            attempts += 1;
            let ttl = self.fairness.ttl(&entry.user_id).await;
            match self
                .hold_stock(&entry.sku, &entry.user_id, entry.quantity, ttl)
                .await
            {
                Ok(Hold::Placed(reservation)) => {
                    info!(
                        sku = %entry.sku,
                        user_id = %entry.user_id,
                        reservation_id = %reservation.reservation_id,
                        waited_secs = (reservation.created_at - entry.enqueued_at).num_seconds(),
                        "Waitlisted request promoted"
                    );
                    promoted.push(reservation);
                }
                Ok(Hold::Duplicate(existing)) => {
                    debug!(
                        sku = %entry.sku,
                        user_id = %entry.user_id,
                        reservation_id = %existing.reservation_id,
                        "Waitlisted user got a hold concurrently, dropping entry"
                    );
                }
                Ok(Hold::Short { available, guard }) => {
                    warn!(
                        sku = %entry.sku,
                        user_id = %entry.user_id,
                        quantity = entry.quantity,
                        available,
                        requeue = %self.settings.requeue_position,
                        "Promotion short on stock, re-queueing"
                    );
                    self.waitlist
                        .requeue(entry, self.settings.requeue_position)
                        .await;
                    drop(guard);
                    break;
                }
                Err(e) => {
                    warn!(
                        sku = %entry.sku,
                        user_id = %entry.user_id,
                        error = %e,
                        requeue = %self.settings.requeue_position,
                        "Promotion failed, re-queueing"
                    );
                    self.waitlist
                        .requeue(entry, self.settings.requeue_position)
                        .await;
                    break;
                }
            }
        }

        promoted
    }

    // =========================================================================
    // Read-Only Accessors
    // =========================================================================

    /// Looks up a reservation.
    ///
    /// ## Errors
    /// `NotFound` for an unknown ID.
    pub async fn get_reservation(&self, reservation_id: Uuid) -> CoreResult<Reservation> {
        self.ledger
            .get(reservation_id)
            .await
            .ok_or(CoreError::NotFound(reservation_id))
    }

    /// The user's active hold on `sku`, if any.
    pub async fn active_reservation(&self, sku: &str, user_id: &str) -> Option<Reservation> {
        self.ledger.active_for(sku, user_id).await
    }

    /// All reservations ever made against `sku`.
    pub async fn reservations_for(&self, sku: &str) -> Vec<Reservation> {
        self.ledger.for_sku(sku).await
    }

    /// Units currently held by `RESERVED` reservations on `sku`.
    pub async fn held_quantity(&self, sku: &str) -> i64 {
        self.ledger.held_quantity(sku).await
    }

    /// Number of requests waiting on `sku`.
    pub async fn waitlist_len(&self, sku: &str) -> usize {
        self.waitlist.len(sku).await
    }

    /// Copy of `sku`'s waitlist, head first.
    pub async fn waitlist(&self, sku: &str) -> Vec<WaitlistEntry> {
        self.waitlist.snapshot(sku).await
    }

    /// The user's fairness counters.
    pub async fn fairness_stats(&self, user_id: &str) -> UserFairnessStats {
        self.fairness.stats(user_id).await
    }

    /// Hold duration the user would get right now, in seconds.
    pub async fn ttl_secs_for(&self, user_id: &str) -> u64 {
        self.fairness.ttl_secs(user_id).await
    }

    /// Stock level, queue length and demand status for `sku`.
    pub async fn health(&self, sku: &str) -> InventoryHealth {
        let available = self.inventory.get(sku).await;
        let waitlist_size = self.waitlist.len(sku).await;
        InventoryHealth::new(sku, available, waitlist_size)
    }

    /// The engine's time source.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Decrements stock and records a `RESERVED` hold.
    ///
    /// The sufficiency check and the decrement form one critical section
    /// under the SKU lock. On a shortfall that lock is handed back to the
    /// caller inside [`Hold::Short`].
    async fn hold_stock(
        &self,
        sku: &str,
        user_id: &str,
        quantity: i64,
        ttl: Duration,
    ) -> CoreResult<Hold> {
        {
            let guard = self.locks.acquire(sku).await;
            let available = self.inventory.get(sku).await;
            if available < quantity {
                return Ok(Hold::Short { available, guard });
            }
            self.inventory.decrement(sku, quantity).await?;
        }

        let reservation = Reservation::new(sku, user_id, quantity, self.clock.now(), ttl);
        match self.ledger.insert(reservation).await {
            Ok(reservation) => {
                info!(
                    reservation_id = %reservation.reservation_id,
                    sku = %sku,
                    user_id = %user_id,
                    quantity,
                    ttl_secs = ttl.num_seconds(),
                    "Inventory reserved"
                );
                Ok(Hold::Placed(reservation))
            }
            Err(existing) => {
                self.release_stock(sku, quantity).await;
                debug!(
                    reservation_id = %existing.reservation_id,
                    sku = %sku,
                    user_id = %user_id,
                    "Concurrent duplicate hold, keeping the first"
                );
                Ok(Hold::Duplicate(existing))
            }
        }
    }

    /// Returns stock under the SKU lock.
    async fn release_stock(&self, sku: &str, quantity: i64) {
        let _guard = self.locks.acquire(sku).await;
        self.inventory.increment(sku, quantity).await;
    }
}

/// Result of trying to place a hold.
enum Hold {
    /// Stock taken and a new `RESERVED` record stored.
    Placed(Reservation),
    /// Another task stored a hold for the same pair first. The stock taken
    /// here has already been given back.
    Duplicate(Reservation),
    /// Not enough stock. The SKU stays locked until `guard` is dropped.
    Short { available: i64, guard: SkuGuard },
}

/// Fails with `Expired` once `now` is past the hold's expiry.
fn reject_if_overdue(reservation: &Reservation, now: DateTime<Utc>) -> CoreResult<()> {
    if reservation.is_expired_at(now) {
        return Err(CoreError::Expired {
            reservation_id: reservation.reservation_id,
            expired_at: reservation.expires_at,
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
