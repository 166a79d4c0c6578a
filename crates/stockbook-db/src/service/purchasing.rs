//! # Purchasing Service
//!
//! Records supplier purchases: each line becomes a batch (the cost
//! record), a warehouse stock increment, and a `purchase` ledger row,
//! all inside one transaction with the purchase document itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{product, purchase, transaction};
use stockbook_core::costing::validate_batch;
use stockbook_core::validation::{validate_line_count, validate_price_cents};
use stockbook_core::{
    Batch, CoreError, Location, Money, Purchase, PurchaseLine,
};

// =============================================================================
// Request Types
// =============================================================================

/// One line of a purchase: a lot of units at one unit cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    /// Defaults to now when absent.
    pub purchase_date: Option<DateTime<Utc>>,
}

/// A supplier purchase to record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub invoice_number: Option<String>,
    pub lines: Vec<PurchaseLineRequest>,
    pub tax_cents: i64,
    pub notes: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Service recording supplier purchases.
#[derive(Debug, Clone)]
pub struct PurchasingService {
    pool: SqlitePool,
}

impl PurchasingService {
    /// Creates a new PurchasingService.
    pub fn new(pool: SqlitePool) -> Self {
        PurchasingService { pool }
    }

    /// Records a purchase. Stock always lands in the warehouse.
    #[instrument(skip(self, request), fields(lines = request.lines.len(), user = %user_id))]
    pub async fn record_purchase(
        &self,
        request: PurchaseRequest,
        user_id: &str,
    ) -> DbResult<Purchase> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("purchase requires a signed-in user".to_string()).into());
        }
        validate_line_count(request.lines.len())?;
        validate_price_cents(request.tax_cents)?;

        let purchase_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        // Pure pass first: every line must be a valid batch, and the
        // document totals are known before anything is written
        let mut subtotal = Money::zero();
        for line in &request.lines {
            validate_batch(line.quantity, Money::from_cents(line.unit_cost_cents))?;
            subtotal += Money::from_cents(line.unit_cost_cents).multiply_quantity(line.quantity);
        }

        let tax = Money::from_cents(request.tax_cents);
        let document = Purchase {
            id: purchase_id.clone(),
            invoice_number: request.invoice_number.clone(),
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            total_cents: (subtotal + tax).cents(),
            notes: request.notes.clone(),
            user_id: user_id.to_string(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        // Parent document goes in first: purchase_lines.purchase_id
        // carries a foreign key to it
        purchase::insert_purchase_tx(&mut *tx, &document).await?;

        for line in &request.lines {
            let product = product::get_by_id_tx(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            let purchase_date = line.purchase_date.unwrap_or(now);

            let batch = Batch {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                batch_number: line.batch_number.clone(),
                supplier: line.supplier.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
                purchase_date,
                created_at: now,
            };
            product::add_batch_tx(&mut *tx, &batch).await?;

            // Intake always increases, so the floor check cannot fail
            product::try_adjust_stock_tx(&mut *tx, &product.id, Location::Warehouse, line.quantity)
                .await?;

            transaction::insert_tx(
                &mut *tx,
                &transaction::purchase_row(
                    &product.id,
                    line.quantity,
                    Location::Warehouse,
                    Some(purchase_id.clone()),
                    user_id,
                ),
            )
            .await?;

            purchase::insert_line_tx(
                &mut *tx,
                &PurchaseLine {
                    id: Uuid::new_v4().to_string(),
                    purchase_id: purchase_id.clone(),
                    product_id: product.id,
                    quantity: line.quantity,
                    unit_cost_cents: line.unit_cost_cents,
                    supplier: line.supplier.clone(),
                    batch_number: line.batch_number.clone(),
                    purchase_date,
                    created_at: now,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            purchase_id = %document.id,
            total_cents = %document.total_cents,
            "Purchase recorded"
        );

        Ok(document)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::new_product;

    fn line(product_id: &str, quantity: i64, unit_cost_cents: i64) -> PurchaseLineRequest {
        PurchaseLineRequest {
            product_id: product_id.to_string(),
            quantity,
            unit_cost_cents,
            supplier: Some("Acme".to_string()),
            batch_number: None,
            purchase_date: None,
        }
    }

    #[tokio::test]
    async fn test_purchase_creates_batch_stock_and_ledger() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();

        let document = db
            .purchasing()
            .record_purchase(
                PurchaseRequest {
                    invoice_number: Some("INV-001".to_string()),
                    lines: vec![line(&product.id, 30, 800)],
                    tax_cents: 0,
                    notes: None,
                },
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(document.subtotal_cents, 24_000);
        assert_eq!(document.total_cents, 24_000);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 30);
        assert_eq!(after.total_quantity, 30);

        let batches = db.products().list_batches(&product.id).await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].unit_cost_cents, 800);

        // Counters reconcile with the ledger
        let history = db.transactions().history_for_product(&product.id).await.unwrap();
        let replayed = stockbook_core::stock::replay(&history);
        assert_eq!(replayed.warehouse, 30);

        let lines = db.purchases().get_lines(&document.id).await.unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn test_multi_line_purchase_persists_document_and_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let rice = new_product("RICE-5KG", "Rice 5kg", 1250);
        let tea = new_product("TEA-1KG", "Green Tea", 700);
        db.products().insert(&rice).await.unwrap();
        db.products().insert(&tea).await.unwrap();

        let document = db
            .purchasing()
            .record_purchase(
                PurchaseRequest {
                    invoice_number: Some("INV-002".to_string()),
                    lines: vec![line(&rice.id, 10, 800), line(&tea.id, 5, 400)],
                    tax_cents: 500,
                    notes: None,
                },
                "user-1",
            )
            .await
            .unwrap();

        // FK chain intact: the stored document is retrievable and every
        // line references it
        let stored = db.purchases().get_by_id(&document.id).await.unwrap().unwrap();
        assert_eq!(stored.subtotal_cents, 10_000);
        assert_eq!(stored.total_cents, 10_500);

        let lines = db.purchases().get_lines(&document.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.purchase_id == document.id));
    }

    #[tokio::test]
    async fn test_purchase_rejects_invalid_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();

        let err = db
            .purchasing()
            .record_purchase(
                PurchaseRequest {
                    invoice_number: None,
                    lines: vec![line(&product.id, 0, 800)],
                    tax_cents: 0,
                    notes: None,
                },
                "user-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidBatch { .. })));

        // Nothing persisted
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 0);
        assert_eq!(after.total_quantity, 0);
    }

    #[tokio::test]
    async fn test_purchase_unknown_product_rolls_back_all_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();

        let err = db
            .purchasing()
            .record_purchase(
                PurchaseRequest {
                    invoice_number: None,
                    lines: vec![line(&product.id, 10, 800), line("ghost", 5, 100)],
                    tax_cents: 0,
                    notes: None,
                },
                "user-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 0);
    }

    #[tokio::test]
    async fn test_average_cost_across_purchases() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();

        for (qty, cost) in [(10, 500), (10, 700)] {
            db.purchasing()
                .record_purchase(
                    PurchaseRequest {
                        invoice_number: None,
                        lines: vec![line(&product.id, qty, cost)],
                        tax_cents: 0,
                        notes: None,
                    },
                    "user-1",
                )
                .await
                .unwrap();
        }

        let batches = db.products().list_batches(&product.id).await.unwrap();
        let avg = stockbook_core::costing::average_unit_cost(&batches);
        assert_eq!(avg.cents(), 600);
    }
}
