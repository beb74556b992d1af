//! # stockhold-engine: Concurrent Reservation Engine
//!
//! This crate turns the rules in `stockhold-core` into a thread-safe engine
//! that many tasks can hit at once for the same hot SKU without ever
//! overselling.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reservation Engine Layout                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │               ReservationEngine (Main Orchestrator)              │  │
//! │  │                                                                  │  │
//! │  │  create / confirm / cancel / expire / initialize / promote       │  │
//! │  └──────┬──────────────┬──────────────┬─────────────┬───────────────┘  │
//! │         ▼              ▼              ▼             ▼                  │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐ ┌────────────┐          │
//! │  │  SkuLocks  │ │ Inventory  │ │  Ledger    │ │ Waitlist   │          │
//! │  │            │ │  Store     │ │            │ │  Queue     │          │
//! │  │ one mutex  │ │ sku → qty  │ │ id → hold  │ │ sku → FIFO │          │
//! │  │ per SKU    │ │            │ │ active idx │ │            │          │
//! │  └────────────┘ └────────────┘ └────────────┘ └────────────┘          │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │FairnessTracker │  │     Clock      │  │     ExpiryReaper       │    │
//! │  │ user → stats   │  │ System/Manual  │  │ tokio task, periodic   │    │
//! │  │ score → TTL    │  │                │  │ expire_overdue()       │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`engine`] - `ReservationEngine`, the public entry point
//! - [`config`] - Engine configuration (TOML + environment)
//! - [`error`] - Engine plumbing errors
//! - [`clock`] - Injectable time source
//! - [`locks`] - Per-SKU mutex registry
//! - [`inventory`] - Stock counters
//! - [`ledger`] - Reservation records and the active-hold index
//! - [`waitlist`] - Per-SKU FIFO of unmet demand
//! - [`fairness`] - Per-user stats and TTL sizing
//! - [`reaper`] - Background expiry sweep
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use stockhold_engine::{EngineConfig, ReservationEngine};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let engine = Arc::new(ReservationEngine::new(&EngineConfig::default()));
//! engine.initialize_inventory("SKU-1", 1).await.unwrap();
//!
//! let first = engine.create_reservation("SKU-1", "alice", 1).await.unwrap();
//! let second = engine.create_reservation("SKU-1", "bob", 1).await.unwrap();
//! assert!(!first.is_waitlisted());
//! assert!(second.is_waitlisted());
//! # });
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fairness;
pub mod inventory;
pub mod ledger;
pub mod locks;
pub mod reaper;
pub mod waitlist;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, ReaperSettings, WaitlistSettings};
pub use engine::ReservationEngine;
pub use error::{EngineError, EngineResult};
pub use reaper::{ExpiryReaper, ReaperHandle};
pub use waitlist::RequeuePosition;
