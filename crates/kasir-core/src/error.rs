//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors                                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kasir-api errors                                                      │
//! │  └── ApiError         - What the client sees (response envelope)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A checkout line references a product that does not exist.
    ///
    /// ## When This Occurs
    /// - Product ID was never created on the server
    /// - Product was deleted after the client cached the catalog
    #[error("Product with ID {0} not found")]
    ProductNotFound(String),

    /// Insufficient stock to complete a checkout.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 2)
    ///      │
    ///      ▼
    /// Check stock: available=1
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Nasi Goreng Spesial", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// Whole checkout aborted, no stock touched
    /// ```
    #[error("Insufficient stock for product: {product}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The transaction status machine does not allow this move.
    ///
    /// ## When This Occurs
    /// - A late gateway callback targets a PAID or CANCELLED transaction
    #[error("Transaction cannot move from {from} to {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// A report period could not be computed for the given local time.
    #[error("Invalid report period: {0}")]
    InvalidPeriod(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any mutation runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: String },

    /// Invalid format (e.g., invalid URL, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value exceeds what can be represented.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Name of the offending field, used as the key in error details.
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::MustBePositive { field }
            | Self::MustBeNonNegative { field }
            | Self::TooLarge { field }
            | Self::InvalidFormat { field, .. }
            | Self::NotAllowed { field, .. }
            | Self::Duplicate { field, .. } => field,
        }
    }
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
        let err = CoreError::InsufficientStock {
            product: "Nasi Goreng Spesial".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product: Nasi Goreng Spesial"
        );

        let err = CoreError::ProductNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Product with ID abc not found");

        let err = CoreError::InvalidStatusTransition {
            from: TransactionStatus::Paid,
            to: TransactionStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Transaction cannot move from PAID to CANCELLED");
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::MustBePositive {
            field: "items[0].quantity".to_string(),
        };
        assert_eq!(err.field(), "items[0].quantity");
        assert_eq!(err.to_string(), "items[0].quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
