//! # Validation Module
//!
//! Field-level validation used by the direct APIs and, per-row, by the
//! bulk import service.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: THIS MODULE - field rules, before any I/O                 │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Business rules (costing, stock, transfer modules)         │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (UNIQUE / CHECK / FK constraints)                │
//! │                                                                     │
//! │  Defense in depth: bulk import reports layer-1 failures per row     │
//! │  so one bad row never blocks the rest.                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_SALE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use stockbook_core::validation::validate_sku;
///
/// assert!(validate_sku("RICE-5KG").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
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

/// Validates a barcode.
///
/// ## Rules
/// - Must not be empty (callers generate one when absent)
/// - At most 32 characters, digits only
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    let barcode = barcode.trim();

    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 32,
        });
    }

    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a customer mobile number.
///
/// ## Rules
/// - Must not be empty (the customer grouping key requires it)
/// - 6-15 characters: digits with optional leading `+`
pub fn validate_mobile(mobile: &str) -> ValidationResult<()> {
    let mobile = mobile.trim();

    if mobile.is_empty() {
        return Err(ValidationError::Required {
            field: "mobile".to_string(),
        });
    }

    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if digits.len() < 6 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            reason: "must be 6-15 digits with optional leading +".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (zero allowed: giveaway items)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents.
///
/// ## Rules
/// - Must be non-negative (zero = unpaid credit sale)
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a checkout or purchase.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("RICE-5KG").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("5901234123457").is_ok());
        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("ABC123").is_err());
        assert!(validate_barcode(&"9".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_mobile() {
        assert!(validate_mobile("+8801712345678").is_ok());
        assert!(validate_mobile("01712345678").is_ok());
        assert!(validate_mobile("").is_err());
        assert!(validate_mobile("12345").is_err());
        assert!(validate_mobile("phone-number").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(0).is_ok());
        assert!(validate_payment_amount(500).is_ok());
        assert!(validate_payment_amount(-1).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_SALE_LINES).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(MAX_SALE_LINES + 1).is_err());
    }
}
