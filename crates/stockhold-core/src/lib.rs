//! # stockhold-core: Pure Domain Logic for Stockhold
//!
//! This crate holds the rules of the reservation engine as plain types and
//! pure functions: the reservation state machine, the fairness policy that
//! sizes holds, input validation and the error taxonomy. It has no locks, no
//! async runtime and never reads the clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockhold Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Callers (HTTP layer, simulator, tests)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockhold-engine (ReservationEngine)            │   │
//! │  │    SKU locks, inventory store, ledger, waitlist, reaper         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stockhold-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ fairness  │  │   error   │  │ validation│  │   │
//! │  │   │Reservation│  │  Policy   │  │ CoreError │  │   rules   │  │   │
//! │  │   │ Waitlist  │  │ score→TTL │  │           │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO LOCKS • NO CLOCK • PURE FUNCTIONS                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Reservation, WaitlistEntry, fairness stats)
//! - [`fairness`] - Trust score → hold duration policy
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stockhold_core::{FairnessPolicy, UserFairnessStats};
//!
//! let policy = FairnessPolicy::default();
//!
//! // A user who abandoned three holds in a row
//! let stats = UserFairnessStats { total_attempts: 3, successful_completions: 0 };
//! assert_eq!(policy.ttl_secs(&stats), 60);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod fairness;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fairness::FairnessPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a SKU identifier.
pub const MAX_SKU_LENGTH: usize = 64;

/// Maximum length of a user identifier.
pub const MAX_USER_ID_LENGTH: usize = 64;

/// Largest stock level or hold size accepted (one trillion units).
///
/// Keeps the `i64` counters far from overflow when stock is returned.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000_000;
