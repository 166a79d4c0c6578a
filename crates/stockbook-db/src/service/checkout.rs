//! # Checkout Service
//!
//! Executes a complete sale as ONE SQL transaction.
//!
//! ## Checkout Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  validate request ──► BEGIN                                         │
//! │    for each item:                                                   │
//! │      load product + batches                                         │
//! │      price_line (avg cost, profit)                                  │
//! │      conditional UPDATE: stock −= qty  ── floor fails? ──► ROLLBACK │
//! │      total_sold += qty                                              │
//! │      append 'sale' ledger row                                       │
//! │    totals → settle → insert sale + lines                            │
//! │  COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two checkouts racing over the last units are decided by the
//! conditional UPDATE alone: exactly one matches, the other rolls back
//! with InsufficientStock. No advisory locks, no retry loops.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{product, sale, transaction};
use stockbook_core::checkout::{price_line, settle, total_sale, PricedLine};
use stockbook_core::validation::{
    validate_line_count, validate_mobile, validate_payment_amount, validate_price_cents,
};
use stockbook_core::{
    CoreError, Location, Money, PaymentMethod, Sale, SaleLine, TaxRate,
};

// =============================================================================
// Request / Response Types
// =============================================================================

/// One item in a checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    /// Override price in cents; `None` uses the product's selling price.
    pub unit_price_cents: Option<i64>,
}

/// Customer identity attached to a sale (the grouping key, not a row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub mobile: String,
}

/// A complete checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    /// Location stock is consumed from.
    pub location: Location,
    pub customer: CustomerInfo,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    pub discount_cents: i64,
    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,
    pub notes: Option<String>,
}

/// The persisted outcome of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

// =============================================================================
// Service
// =============================================================================

/// Service that executes checkouts transactionally.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Executes a checkout. All-or-nothing: any line failing leaves no
    /// trace of the sale.
    #[instrument(skip(self, request), fields(items = request.items.len(), user = %user_id))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
        user_id: &str,
    ) -> DbResult<CheckoutReceipt> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("checkout requires a signed-in user".to_string()).into());
        }

        validate_line_count(request.items.len())?;
        validate_mobile(&request.customer.mobile)?;
        validate_payment_amount(request.amount_paid_cents)?;
        validate_price_cents(request.discount_cents)?;

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let mut priced: Vec<PricedLine> = Vec::with_capacity(request.items.len());

        for item in &request.items {
            // Soft-deleted products are not sellable
            let product = product::get_by_id_tx(&mut *tx, &item.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

            let batches = product::list_batches_tx(&mut *tx, &product.id).await?;
            let unit_price = item
                .unit_price_cents
                .map(Money::from_cents)
                .unwrap_or_else(|| product.selling_price());

            let line = price_line(&product, &batches, item.quantity, unit_price)?;

            // The race-deciding step: one conditional UPDATE
            let adjusted = product::try_adjust_stock_tx(
                &mut *tx,
                &product.id,
                request.location,
                -item.quantity,
            )
            .await?;

            if !adjusted {
                let available = product.stock_at(request.location);
                return Err(CoreError::InsufficientStock {
                    sku: product.sku,
                    location: request.location,
                    available,
                    requested: item.quantity,
                }
                .into());
            }

            product::increment_total_sold_tx(&mut *tx, &product.id, item.quantity).await?;

            transaction::insert_tx(
                &mut *tx,
                &transaction::sale_row(
                    &product.id,
                    item.quantity,
                    request.location,
                    Some(sale_id.clone()),
                    user_id,
                ),
            )
            .await?;

            priced.push(line);
        }

        let totals = total_sale(
            &priced,
            Money::from_cents(request.discount_cents),
            TaxRate::from_bps(request.tax_rate_bps),
        );
        let paid = Money::from_cents(request.amount_paid_cents);
        let (due, payment_status) = settle(totals.total, paid);

        let sale = Sale {
            id: sale_id.clone(),
            customer_name: request.customer.name.trim().to_string(),
            customer_mobile: request.customer.mobile.trim().to_string(),
            location: request.location,
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            payment_method: request.payment_method,
            amount_paid_cents: paid.cents(),
            due_cents: due.cents(),
            payment_status,
            notes: request.notes,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        sale::insert_sale_tx(&mut *tx, &sale).await?;

        let mut lines = Vec::with_capacity(priced.len());
        for line in &priced {
            let row = SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: line.product_id.clone(),
                sku_snapshot: line.sku.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                unit_cost_cents: line.unit_cost.cents(),
                profit_cents: line.profit.cents(),
                line_total_cents: line.line_total.cents(),
                created_at: now,
            };
            sale::insert_line_tx(&mut *tx, &row).await?;
            lines.push(row);
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total_cents = %sale.total_cents,
            status = ?sale.payment_status,
            "Checkout complete"
        );

        Ok(CheckoutReceipt { sale, lines })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
