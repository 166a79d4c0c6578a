//! # Checkout Math
//!
//! Pure pricing, totalling and settlement functions for the checkout
//! processor. The source system derived `due_amount`/`payment_status`
//! in implicit pre-save hooks; here they are explicit functions the
//! db layer calls before persisting - nothing is computed at save time.
//!
//! ## Checkout Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  per line:  price_line(product, batches, qty, price)                │
//! │               unit_cost = average_unit_cost(batches)                │
//! │               profit    = (price − unit_cost) × qty                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  total_sale(lines, discount, tax_rate)                              │
//! │               subtotal → − discount → + tax → total                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  settle(total, amount_paid) → (due_amount, payment_status)          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::costing::average_unit_cost;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Batch, PaymentStatus, Product, TaxRate};
use crate::validation::validate_quantity;

// =============================================================================
// Priced Line
// =============================================================================

/// A checkout line after pricing: cost and profit frozen from the
/// product's batch ledger at this moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub profit: Money,
    pub line_total: Money,
}

/// Prices one checkout line against a product and its batches.
///
/// `unit_cost` comes from the average-cost policy (see
/// [`crate::costing`]); profit is `(price − cost) × quantity` and may
/// be negative when selling below cost.
pub fn price_line(
    product: &Product,
    batches: &[Batch],
    quantity: i64,
    unit_price: Money,
) -> CoreResult<PricedLine> {
    validate_quantity(quantity)?;

    if unit_price.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "unit price".to_string(),
        }
        .into());
    }

    let unit_cost = average_unit_cost(batches);
    let profit = (unit_price - unit_cost).multiply_quantity(quantity);
    let line_total = unit_price.multiply_quantity(quantity);

    Ok(PricedLine {
        product_id: product.id.clone(),
        sku: product.sku.clone(),
        name: product.name.clone(),
        quantity,
        unit_price,
        unit_cost,
        profit,
        line_total,
    })
}

// =============================================================================
// Totals
// =============================================================================

/// The monetary summary of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes sale totals from priced lines.
///
/// Tax applies to the discounted subtotal. A discount larger than the
/// subtotal clamps the taxable base (and the total) at zero.
pub fn total_sale(lines: &[PricedLine], discount: Money, tax_rate: TaxRate) -> SaleTotals {
    let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
    let taxable = (subtotal - discount).max_zero();
    let tax = taxable.calculate_tax(tax_rate);

    SaleTotals {
        subtotal,
        discount,
        tax,
        total: taxable + tax,
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// Derives the due amount and payment status for a sale.
///
/// ## Rules
/// - `amount_paid >= total` → Paid, due 0
/// - `0 < amount_paid < total` → Partial, due = total − paid
/// - `amount_paid == 0` → Unpaid, due = total
///
/// Recomputed on every save of a sale (checkout and later payments);
/// the stored fields are never edited directly.
pub fn settle(total: Money, amount_paid: Money) -> (Money, PaymentStatus) {
    let due = (total - amount_paid).max_zero();

    let status = if amount_paid >= total {
        PaymentStatus::Paid
    } else if amount_paid.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    };

    (due, status)
}

// =============================================================================
// Unit Tests
// =============================================================================
