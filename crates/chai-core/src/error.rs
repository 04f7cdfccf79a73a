//! # Error Types
//!
//! Domain-specific error types for chai-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  chai-core errors (this file)                                          │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── PromoError       - Promo code validation outcomes                 │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  chai-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Server errors (in app)                                                │
//! │  └── ApiError         - What clients see (serialized, status-mapped)   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (IDs, amounts, limits)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Split groups do not exactly reconstruct the parent order.
    ///
    /// ## When This Occurs
    /// - A line was dropped from every group
    /// - Quantities across groups do not sum to the original
    /// - A group contains an item the parent never had
    #[error("Split does not match the original order: {detail}")]
    SplitMismatch { detail: String },

    /// A split needs at least two groups to be a split.
    #[error("A split bill requires at least 2 groups, got {got}")]
    NotEnoughSplitGroups { got: usize },

    /// Refund quantity must be between 1 and the originally sold quantity.
    #[error("Refund quantity {requested} is invalid for original quantity {original}")]
    InvalidRefundQuantity { requested: i64, original: i64 },

    /// Customer has not reached the free-item visit threshold.
    #[error("Customer is not eligible for a free item")]
    NotEligible,

    /// Requested point redemption exceeds the customer's balance.
    #[error("Insufficient points: balance {balance}, requested {requested}")]
    InsufficientBalance { balance: i64, requested: i64 },

    /// Order has exceeded maximum allowed lines.
    #[error("Order cannot have more than {max} lines")]
    OrderTooLarge { max: usize },

    /// Promo validation failure (wraps PromoError).
    #[error(transparent)]
    Promo(#[from] PromoError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Promo Error
// =============================================================================

/// Promo code validation outcomes.
///
/// Checked in a fixed order so the customer always gets the most
/// specific reason: existence, usage, minimum, window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromoError {
    /// Code does not exist or has been deactivated.
    #[error("Invalid promo code")]
    NotFound,

    /// Code has reached its usage limit.
    #[error("Promo code usage limit reached")]
    UsageExceeded,

    /// Order subtotal is below the code's minimum.
    #[error("Minimum order amount of {min_cents} paisa required")]
    MinimumNotMet { min_cents: i64 },

    /// Code's validity window has not opened yet.
    #[error("Promo code is not valid yet")]
    NotYetValid,

    /// Code's validity window has closed.
    #[error("Promo code has expired")]
    Expired,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate phone number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
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
        let err = CoreError::InvalidRefundQuantity {
            requested: 5,
            original: 3,
        };
        assert_eq!(
            err.to_string(),
            "Refund quantity 5 is invalid for original quantity 3"
        );
    }

    #[test]
    fn test_promo_error_is_transparent() {
        let err: CoreError = PromoError::UsageExceeded.into();
        assert_eq!(err.to_string(), "Promo code usage limit reached");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
