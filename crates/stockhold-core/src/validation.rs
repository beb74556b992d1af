//! # Validation Module
//!
//! Input validation run by the engine before any lock is taken.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport (outside this repo)                                │
//! │  ├── Schema / deserialization checks                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── SKU / user ID format                                              │
//! │  └── Quantity signs and upper bound                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine invariants                                            │
//! │  ├── Sufficiency check under the SKU lock                              │
//! │  └── Reservation state machine                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockhold_core::validation::{validate_sku, validate_reservation_quantity};
//!
//! assert!(validate_sku("TICKET-GA").is_ok());
//! assert!(validate_reservation_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_SKU_LENGTH, MAX_STOCK_QUANTITY, MAX_USER_ID_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockhold_core::validation::validate_sku;
///
/// assert!(validate_sku("SNEAKER-42").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    if sku.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > MAX_SKU_LENGTH {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LENGTH,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a user identifier.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
pub fn validate_user_id(user_id: &str) -> ValidationResult<()> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "user_id".to_string(),
        });
    }

    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "user_id".to_string(),
            max: MAX_USER_ID_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an absolute stock level (zero allowed, at most
/// [`MAX_STOCK_QUANTITY`]).
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    check_upper_bound(quantity)
}

/// Validates the number of units requested in a hold (must be > 0).
pub fn validate_reservation_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    check_upper_bound(quantity)
}

fn check_upper_bound(quantity: i64) -> ValidationResult<()> {
    if quantity > MAX_STOCK_QUANTITY {
        return Err(ValidationError::TooLarge {
            field: "quantity".to_string(),
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
