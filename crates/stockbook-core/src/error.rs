//! # Error Types
//!
//! Domain-specific error types for stockbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  stockbook-core errors (this file)                                  │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  stockbook-db errors (separate crate)                               │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → caller               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, location, quantities)
//! 3. Errors are enum variants, never String
//! 4. Bulk operations report these per-row instead of aborting

use thiserror::Error;

use crate::types::{Location, TransferStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic
/// failures. The db layer maps storage outcomes (missing rows, failed
/// conditional updates) back onto these variants.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Transfer transaction cannot be found.
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    /// SKU already in use by another product.
    #[error("Duplicate SKU: '{0}' already exists")]
    DuplicateSku(String),

    /// Barcode already in use by another product.
    #[error("Duplicate barcode: '{0}' already exists")]
    DuplicateBarcode(String),

    /// A batch with non-positive quantity or unit cost.
    #[error("Invalid batch: {reason}")]
    InvalidBatch { reason: String },

    /// Insufficient stock at a location to complete an operation.
    ///
    /// ## When This Occurs
    /// - Checkout requesting more than the location holds
    /// - Transfer completion against a drained source location
    /// - Negative adjustment below zero
    ///
    /// The failing product and both quantities are reported so the
    /// caller can show "only {available} left at {location}".
    #[error("Insufficient stock for {sku} at {location}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        location: Location,
        available: i64,
        requested: i64,
    },

    /// Transfer is not in a state that allows the requested transition.
    ///
    /// ## When This Occurs
    /// - Completing an already-completed transfer (double-application guard)
    /// - Cancelling a completed transfer
    /// - Any transition out of a terminal status
    #[error("Transfer {transfer_id} is {from:?}, cannot move to {to:?}")]
    InvalidTransition {
        transfer_id: String,
        from: TransferStatus,
        to: TransferStatus,
    },

    /// Stored stock counters disagree with a replay of the ledger.
    ///
    /// Kept in the taxonomy even though the conditional-update design
    /// prevents new drift: historical data and manual edits can still
    /// produce counters the ledger cannot explain.
    #[error("Stock drift for {product} at {location}: stored {stored}, ledger replay {replayed}")]
    StockDrift {
        product: String,
        location: Location,
        stored: i64,
        replayed: i64,
    },

    /// Product has recorded sales and cannot be hard-deleted.
    #[error("Product {0} has recorded sales and cannot be deleted")]
    ProductHasSales(String),

    /// Mutating operation attempted without an acting user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet field-level requirements.
/// Used for early validation before business logic runs, and collected
/// per-row by the bulk import service.
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

    /// Invalid format (e.g., invalid UUID, bad mobile number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU within an import file).
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
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            sku: "RICE-5KG".to_string(),
            location: Location::Shop,
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for RICE-5KG at shop: available 3, requested 5"
        );
    }

    #[test]
    fn test_stock_drift_message() {
        let err = CoreError::StockDrift {
            product: "RICE-5KG".to_string(),
            location: Location::Warehouse,
            stored: 12,
            replayed: 10,
        };
        assert_eq!(
            err.to_string(),
            "Stock drift for RICE-5KG at warehouse: stored 12, ledger replay 10"
        );
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
