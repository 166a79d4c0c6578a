//! # Batch Ledger Costing
//!
//! Cost-of-goods math over a product's purchase batches.
//!
//! ## Costing Policy: Average Cost, No Depletion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    How Costing Works Here                           │
//! │                                                                     │
//! │  Batches:  [ {qty: 10, cost: 5.00}, {qty: 10, cost: 7.00} ]         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  average_unit_cost = (10×5.00 + 10×7.00) / 20 = 6.00                │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Sell 5 @ 10.00 → profit = (10.00 − 6.00) × 5 = 20.00               │
//! │                                                                     │
//! │  Batches stay untouched: physical stock lives in the two            │
//! │  location counters, batches only price cost of goods.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a deliberate policy choice, not an accident: strict FIFO lot
//! consumption was considered and rejected because it changes observed
//! profit figures. Cost and physical stock location are tracked
//! independently.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Batch;

/// Validates batch fields before it enters the ledger.
///
/// ## Rules
/// - quantity > 0
/// - unit cost > 0
pub fn validate_batch(quantity: i64, unit_cost: Money) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidBatch {
            reason: format!("quantity must be positive, got {}", quantity),
        });
    }

    if !unit_cost.is_positive() {
        return Err(CoreError::InvalidBatch {
            reason: format!("unit cost must be positive, got {}", unit_cost),
        });
    }

    Ok(())
}

/// Sum of batch quantities.
///
/// Stored on the product as `total_quantity` and recomputed whenever a
/// batch is appended.
pub fn total_quantity(batches: &[Batch]) -> i64 {
    batches.iter().map(|b| b.quantity).sum()
}

/// Quantity-weighted average unit cost across batches.
///
/// Returns zero when there are no batches (a product sold before any
/// purchase is recorded prices its cost of goods at zero).
///
/// ## Rounding
/// Integer cents with half-up rounding; i128 intermediates prevent
/// overflow on large ledgers.
///
/// ## Example
/// ```rust
/// use stockbook_core::costing::average_unit_cost;
/// # use stockbook_core::types::Batch;
/// # use chrono::Utc;
/// # fn batch(quantity: i64, unit_cost_cents: i64) -> Batch {
/// #     Batch {
/// #         id: String::new(), product_id: String::new(),
/// #         batch_number: None, supplier: None,
/// #         quantity, unit_cost_cents,
/// #         purchase_date: Utc::now(), created_at: Utc::now(),
/// #     }
/// # }
/// let batches = vec![batch(10, 500), batch(10, 700)];
/// assert_eq!(average_unit_cost(&batches).cents(), 600);
/// ```
pub fn average_unit_cost(batches: &[Batch]) -> Money {
    let total_units: i64 = total_quantity(batches);
    if total_units <= 0 {
        return Money::zero();
    }

    let total_cost: i128 = batches
        .iter()
        .map(|b| b.quantity as i128 * b.unit_cost_cents as i128)
        .sum();

    // Half-up: (2×sum + units) / (2×units)
    let avg = (total_cost * 2 + total_units as i128) / (total_units as i128 * 2);
    Money::from_cents(avg as i64)
}

/// Representative cost for `quantity` units sold.
///
/// Average cost × quantity; used by the checkout processor to compute
/// per-line profit.
pub fn cost_of_goods(batches: &[Batch], quantity: i64) -> Money {
    average_unit_cost(batches).multiply_quantity(quantity)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn batch(quantity: i64, unit_cost_cents: i64) -> Batch {
        Batch {
            id: "b".to_string(),
            product_id: "p".to_string(),
            batch_number: None,
            supplier: None,
            quantity,
            unit_cost_cents,
            purchase_date: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_batch() {
        assert!(validate_batch(10, Money::from_cents(500)).is_ok());
        assert!(validate_batch(0, Money::from_cents(500)).is_err());
        assert!(validate_batch(-3, Money::from_cents(500)).is_err());
        assert!(validate_batch(10, Money::zero()).is_err());
        assert!(validate_batch(10, Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_total_quantity() {
        let batches = vec![batch(10, 500), batch(15, 700)];
        assert_eq!(total_quantity(&batches), 25);
        assert_eq!(total_quantity(&[]), 0);
    }

    #[test]
    fn test_average_unit_cost_weighted() {
        // (10×500 + 10×700) / 20 = 600
        let batches = vec![batch(10, 500), batch(10, 700)];
        assert_eq!(average_unit_cost(&batches).cents(), 600);

        // Weighted, not simple: (30×400 + 10×800) / 40 = 500
        let batches = vec![batch(30, 400), batch(10, 800)];
        assert_eq!(average_unit_cost(&batches).cents(), 500);
    }

    #[test]
    fn test_average_unit_cost_empty() {
        assert_eq!(average_unit_cost(&[]), Money::zero());
    }

    #[test]
    fn test_average_unit_cost_rounds_half_up() {
        // (1×100 + 2×101) / 3 = 100.67 → 101
        let batches = vec![batch(1, 100), batch(2, 101)];
        assert_eq!(average_unit_cost(&batches).cents(), 101);

        // (2×100 + 1×101) / 3 = 100.33 → 100
        let batches = vec![batch(2, 100), batch(1, 101)];
        assert_eq!(average_unit_cost(&batches).cents(), 100);
    }

    #[test]
    fn test_cost_of_goods() {
        let batches = vec![batch(10, 500), batch(10, 700)];
        assert_eq!(cost_of_goods(&batches, 5).cents(), 3000);
        assert_eq!(cost_of_goods(&[], 5), Money::zero());
    }
}
