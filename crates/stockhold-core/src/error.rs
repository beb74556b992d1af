//! # Error Types
//!
//! Domain-specific error types for stockhold-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockhold-core errors (this file)                                     │
//! │  ├── CoreError        - Reservation engine taxonomy                    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stockhold-engine errors (separate crate)                              │
//! │  └── EngineError      - Configuration and background task failures     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError::InvalidArgument → caller           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, reservation ID, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every error is local and recoverable at the request level

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::types::ReservationStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Reservation engine errors.
///
/// None of these are retried by the engine itself. The one exception is
/// waitlist promotion, which swallows its own failures and re-queues.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed caller input (negative, zero or oversized quantity, bad IDs).
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Decrement attempted on a SKU that was never initialized.
    #[error("Unknown SKU: {0}")]
    UnknownSku(String),

    /// Not enough stock to satisfy a hold.
    ///
    /// ## When This Occurs
    /// ```text
    /// reserve(sku: "X", qty: 5)
    ///      │
    ///      ▼
    /// Check stock under SKU lock: available=3
    ///      │
    ///      ▼
    /// InsufficientInventory { sku: "X", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Engine waitlists the request (never surfaced to the caller)
    /// ```
    #[error("Insufficient inventory for {sku}: available {available}, requested {requested}")]
    InsufficientInventory {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// No reservation with this identifier exists.
    #[error("Reservation not found: {0}")]
    NotFound(Uuid),

    /// The reservation's current status does not allow the operation.
    ///
    /// ## When This Occurs
    /// - Confirming an already confirmed reservation
    /// - Cancelling a reservation that already expired
    #[error("Reservation {reservation_id} is {status}, cannot perform operation")]
    InvalidState {
        reservation_id: Uuid,
        status: ReservationStatus,
    },

    /// The hold lapsed before the caller acted on it.
    #[error("Reservation {reservation_id} expired at {expired_at}")]
    Expired {
        reservation_id: Uuid,
        expired_at: DateTime<Utc>,
    },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any lock is taken.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value exceeds the allowed maximum.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: i64 },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientInventory {
            sku: "TICKET-A".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient inventory for TICKET-A: available 3, requested 5"
        );

        let id = Uuid::nil();
        let err = CoreError::InvalidState {
            reservation_id: id,
            status: ReservationStatus::Confirmed,
        };
        assert_eq!(
            err.to_string(),
            format!("Reservation {} is CONFIRMED, cannot perform operation", id)
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity cannot be negative");
    }

    #[test]
    fn test_validation_converts_to_invalid_argument() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::InvalidArgument(_)));
    }
}
