//! # Inventory Service
//!
//! Manual stock corrections. Every mutation pairs a counter change
//! with an `adjustment` ledger row in the same transaction, so the
//! replay invariant survives human intervention:
//!
//! - `adjust`: apply a signed delta at a location
//! - `set_stock`: declare the physically counted value; the service
//!   derives the delta
//! - `reconcile_to_batches`: reset the warehouse so warehouse + shop
//!   equals the batch total (the "trust the batches" repair)

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use crate::error::DbResult;
use crate::repository::{product, transaction};
use stockbook_core::{CoreError, InventoryTransaction, Location, Product, ValidationError};

/// Service for manual stock adjustments and counter repairs.
#[derive(Debug, Clone)]
pub struct InventoryService {
    pool: SqlitePool,
}

impl InventoryService {
    /// Creates a new InventoryService.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryService { pool }
    }

    /// Applies a signed stock delta at a location.
    ///
    /// Negative deltas are floor-checked: the counter can never go
    /// below zero, even by manual correction.
    #[instrument(skip(self))]
    pub async fn adjust(
        &self,
        product_id: &str,
        location: Location,
        delta: i64,
        notes: Option<String>,
        user_id: &str,
    ) -> DbResult<InventoryTransaction> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("adjustment requires a signed-in user".to_string()).into());
        }
        if delta == 0 {
            return Err(ValidationError::MustBePositive {
                field: "delta".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let product = product::get_by_id_tx(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let txn = apply_delta(&mut *tx, &product, location, delta, notes, user_id).await?;

        tx.commit().await?;

        info!(product_id = %product.id, location = %location, delta, "Stock adjusted");
        Ok(txn)
    }

    /// Sets a location's counter to a physically counted value.
    ///
    /// The current counter is read and the derived delta applied inside
    /// one transaction, so a concurrent mutation cannot slip between
    /// them. Returns the corrective adjustment, or `None` when the
    /// counter already matched and nothing was written.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        product_id: &str,
        location: Location,
        target: i64,
        user_id: &str,
    ) -> DbResult<Option<InventoryTransaction>> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("adjustment requires a signed-in user".to_string()).into());
        }
        if target < 0 {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let product = product::get_by_id_tx(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let current = product.stock_at(location);
        let delta = target - current;
        if delta == 0 {
            return Ok(None);
        }

        let txn = apply_delta(
            &mut *tx,
            &product,
            location,
            delta,
            Some(format!("stock count: {current} -> {target}")),
            user_id,
        )
        .await?;

        tx.commit().await?;

        info!(product_id = %product.id, location = %location, target, "Stock counted");
        Ok(Some(txn))
    }

    /// Resets the warehouse so warehouse + shop equals the batch total.
    ///
    /// Used when the batch records (cost side) are trusted over the
    /// counters. The shop counter is left alone; the warehouse absorbs
    /// the difference, floored at zero.
    #[instrument(skip(self))]
    pub async fn reconcile_to_batches(
        &self,
        product_id: &str,
        user_id: &str,
    ) -> DbResult<Option<InventoryTransaction>> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("adjustment requires a signed-in user".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;

        let product = product::get_by_id_tx(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let current = product.warehouse_stock;
        let target = (product.total_quantity - product.shop_stock).max(0);
        let delta = target - current;
        if delta == 0 {
            return Ok(None);
        }

        let txn = apply_delta(
            &mut *tx,
            &product,
            Location::Warehouse,
            delta,
            Some(format!("batch reconciliation: {current} -> {target}")),
            user_id,
        )
        .await?;

        tx.commit().await?;

        info!(product_id = %product.id, target, "Warehouse reconciled to batches");
        Ok(Some(txn))
    }
}

/// Floor-checked counter change plus its adjustment ledger row, on the
/// caller's transaction.
async fn apply_delta(
    conn: &mut SqliteConnection,
    product: &Product,
    location: Location,
    delta: i64,
    notes: Option<String>,
    user_id: &str,
) -> DbResult<InventoryTransaction> {
    let adjusted = product::try_adjust_stock_tx(&mut *conn, &product.id, location, delta).await?;
    if !adjusted {
        return Err(CoreError::InsufficientStock {
            sku: product.sku.clone(),
            location,
            available: product.stock_at(location),
            requested: -delta,
        }
        .into());
    }

    let txn = transaction::adjustment_row(&product.id, delta, location, notes, user_id);
    transaction::insert_tx(conn, &txn).await?;
    Ok(txn)
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
    use stockbook_core::TransactionType;

    async fn db_with_product() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_adjust_writes_ledger_row() {
        let (db, pid) = db_with_product().await;

        let txn = db
            .inventory()
            .adjust(&pid, Location::Shop, 7, Some("found in back room".to_string()), "user-1")
            .await
            .unwrap();
        assert_eq!(txn.txn_type, TransactionType::Adjustment);
        assert_eq!(txn.quantity, 7);

        let product = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(product.shop_stock, 7);

        // Negative adjustment
        db.inventory()
            .adjust(&pid, Location::Shop, -2, None, "user-1")
            .await
            .unwrap();
        let product = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(product.shop_stock, 5);

        // Counters reconcile with ledger replay
        let history = db.transactions().history_for_product(&pid).await.unwrap();
        let replayed = stockbook_core::stock::replay(&history);
        assert_eq!(replayed.shop, 5);
    }

    #[tokio::test]
    async fn test_adjust_respects_floor() {
        let (db, pid) = db_with_product().await;
        db.inventory()
            .adjust(&pid, Location::Shop, 3, None, "user-1")
            .await
            .unwrap();

        let err = db
            .inventory()
            .adjust(&pid, Location::Shop, -5, None, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        // Failed adjustment left no ledger row
        let history = db.transactions().history_for_product(&pid).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_adjust_rejects_zero_delta() {
        let (db, pid) = db_with_product().await;
        let err = db
            .inventory()
            .adjust(&pid, Location::Shop, 0, None, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_set_stock_derives_delta() {
        let (db, pid) = db_with_product().await;
        db.inventory()
            .adjust(&pid, Location::Warehouse, 10, None, "user-1")
            .await
            .unwrap();

        let txn = db
            .inventory()
            .set_stock(&pid, Location::Warehouse, 4, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(txn.quantity, -6);

        let product = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(product.warehouse_stock, 4);

        // Setting to the current value is a no-op
        let none = db
            .inventory()
            .set_stock(&pid, Location::Warehouse, 4, "user-1")
            .await
            .unwrap();
        assert!(none.is_none());

        // The count and its correction land together: replay agrees
        let history = db.transactions().history_for_product(&pid).await.unwrap();
        let replayed = stockbook_core::stock::replay(&history);
        assert_eq!(replayed.warehouse, 4);
    }

    #[tokio::test]
    async fn test_set_stock_requires_user() {
        let (db, pid) = db_with_product().await;
        let err = db
            .inventory()
            .set_stock(&pid, Location::Warehouse, 3, "")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_reconcile_to_batches() {
        let (db, pid) = db_with_product().await;

        // 25 units on the books (batches), 5 of them in the shop
        let now = chrono::Utc::now();
        db.products()
            .add_batch(&stockbook_core::Batch {
                id: uuid::Uuid::new_v4().to_string(),
                product_id: pid.clone(),
                batch_number: None,
                supplier: None,
                quantity: 25,
                unit_cost_cents: 800,
                purchase_date: now,
                created_at: now,
            })
            .await
            .unwrap();
        db.inventory()
            .adjust(&pid, Location::Shop, 5, None, "user-1")
            .await
            .unwrap();

        let txn = db
            .inventory()
            .reconcile_to_batches(&pid, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(txn.quantity, 20);

        let product = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(product.warehouse_stock, 20);
        assert_eq!(product.warehouse_stock + product.shop_stock, product.total_quantity);
    }
}
