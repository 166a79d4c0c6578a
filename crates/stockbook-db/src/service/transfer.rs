//! # Transfer Service
//!
//! Moves stock between warehouse and shop via a two-step protocol:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  create()     appends a 'transfer' ledger row, status = pending     │
//! │               stock does NOT move yet                               │
//! │                                                                     │
//! │  complete()   BEGIN                                                 │
//! │                 flip status pending → completed (conditional)       │
//! │                 source −= qty (floor-checked)                       │
//! │                 destination += qty                                  │
//! │               COMMIT                                                │
//! │                                                                     │
//! │  cancel()     flip status pending → cancelled; no stock effect      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The status flip and the stock moves share one transaction, so a
//! transfer can never be completed twice and never half-applies: the
//! conditional status UPDATE matches at most once, and a floor failure
//! on the source rolls the flip back.

use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{product, transaction};
use stockbook_core::validation::validate_quantity;
use stockbook_core::{
    CoreError, InventoryTransaction, Location, TransactionType, TransferStatus, ValidationError,
};

/// Service managing the transfer lifecycle.
#[derive(Debug, Clone)]
pub struct TransferService {
    pool: SqlitePool,
}

impl TransferService {
    /// Creates a new TransferService.
    pub fn new(pool: SqlitePool) -> Self {
        TransferService { pool }
    }

    /// Records a pending transfer. Stock stays put until `complete`.
    ///
    /// The source must exist and the two locations must differ, but
    /// stock is NOT reserved: availability is only checked at
    /// completion time, against the stock present then.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        product_id: &str,
        from: Location,
        to: Location,
        quantity: i64,
        user_id: &str,
    ) -> DbResult<InventoryTransaction> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("transfer requires a signed-in user".to_string()).into());
        }
        validate_quantity(quantity)?;

        if from == to {
            return Err(ValidationError::InvalidFormat {
                field: "to_location".to_string(),
                reason: "must differ from from_location".to_string(),
            }
            .into());
        }

        let product = self
            .get_product(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let txn = transaction::transfer_row(&product.id, quantity, from, to, user_id);

        let mut conn = self.pool.acquire().await?;
        transaction::insert_tx(&mut *conn, &txn).await?;

        info!(transfer_id = %txn.id, product_id = %product.id, quantity, "Transfer created");
        Ok(txn)
    }

    /// Completes a pending transfer, moving the stock.
    #[instrument(skip(self))]
    pub async fn complete(&self, transfer_id: &str, user_id: &str) -> DbResult<InventoryTransaction> {
        self.resolve(transfer_id, TransferStatus::Completed, user_id).await
    }

    /// Cancels a pending transfer. No stock effect.
    #[instrument(skip(self))]
    pub async fn cancel(&self, transfer_id: &str, user_id: &str) -> DbResult<InventoryTransaction> {
        self.resolve(transfer_id, TransferStatus::Cancelled, user_id).await
    }

    async fn resolve(
        &self,
        transfer_id: &str,
        target: TransferStatus,
        user_id: &str,
    ) -> DbResult<InventoryTransaction> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("transfer requires a signed-in user".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;

        let txn = transaction::get_by_id_tx(&mut *tx, transfer_id)
            .await?
            .filter(|t| t.txn_type == TransactionType::Transfer)
            .ok_or_else(|| CoreError::TransferNotFound(transfer_id.to_string()))?;

        // Validate the transition before touching anything; terminal
        // states get a precise InvalidTransition error.
        stockbook_core::transfer::transition(transfer_id, txn.status, target)?;

        let flipped = transaction::transition_transfer_tx(&mut *tx, transfer_id, target).await?;
        if !flipped {
            // Lost a race: someone resolved it between our read and update
            warn!(transfer_id, "Transfer resolved concurrently");
            return Err(CoreError::InvalidTransition {
                transfer_id: transfer_id.to_string(),
                from: txn.status,
                to: target,
            }
            .into());
        }

        if target == TransferStatus::Completed {
            let (from, to) = match (txn.from_location, txn.to_location) {
                (Some(f), Some(t)) => (f, t),
                _ => return Err(CoreError::TransferNotFound(transfer_id.to_string()).into()),
            };

            let taken =
                product::try_adjust_stock_tx(&mut *tx, &txn.product_id, from, -txn.quantity).await?;
            if !taken {
                let product = product::get_by_id_tx(&mut *tx, &txn.product_id)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(txn.product_id.clone()))?;
                let available = product.stock_at(from);
                return Err(CoreError::InsufficientStock {
                    sku: product.sku,
                    location: from,
                    available,
                    requested: txn.quantity,
                }
                .into());
            }

            if !product::try_adjust_stock_tx(&mut *tx, &txn.product_id, to, txn.quantity).await? {
                return Err(DbError::not_found("Product", &txn.product_id));
            }
        }

        tx.commit().await?;

        info!(transfer_id, status = ?target, "Transfer resolved");

        let mut conn = self.pool.acquire().await?;
        let resolved = transaction::get_by_id_tx(&mut *conn, transfer_id)
            .await?
            .ok_or_else(|| CoreError::TransferNotFound(transfer_id.to_string()))?;
        Ok(resolved)
    }

    async fn get_product(&self, product_id: &str) -> DbResult<Option<stockbook_core::Product>> {
        let mut conn = self.pool.acquire().await?;
        product::get_by_id_tx(&mut *conn, product_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::new_product;

    async fn db_with_warehouse(qty: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();
        db.products()
            .try_adjust_stock(&product.id, Location::Warehouse, qty)
            .await
            .unwrap();
        db.transactions()
            .insert(&transaction::purchase_row(
                &product.id,
                qty,
                Location::Warehouse,
                None,
                "seed",
            ))
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_transfer_lifecycle_completed() {
        let (db, pid) = db_with_warehouse(20).await;

        let transfer = db
            .transfers()
            .create(&pid, Location::Warehouse, Location::Shop, 8, "user-1")
            .await
            .unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);

        // Pending: stock untouched
        let mid = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(mid.warehouse_stock, 20);
        assert_eq!(mid.shop_stock, 0);

        let done = db.transfers().complete(&transfer.id, "user-1").await.unwrap();
        assert_eq!(done.status, TransferStatus::Completed);

        let after = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 12);
        assert_eq!(after.shop_stock, 8);
    }

    #[tokio::test]
    async fn test_double_completion_rejected() {
        let (db, pid) = db_with_warehouse(20).await;
        let transfer = db
            .transfers()
            .create(&pid, Location::Warehouse, Location::Shop, 5, "user-1")
            .await
            .unwrap();

        db.transfers().complete(&transfer.id, "user-1").await.unwrap();
        let err = db.transfers().complete(&transfer.id, "user-1").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));

        // Stock moved exactly once
        let after = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 15);
        assert_eq!(after.shop_stock, 5);
    }

    #[tokio::test]
    async fn test_cancel_has_no_stock_effect_and_is_terminal() {
        let (db, pid) = db_with_warehouse(20).await;
        let transfer = db
            .transfers()
            .create(&pid, Location::Warehouse, Location::Shop, 5, "user-1")
            .await
            .unwrap();

        let cancelled = db.transfers().cancel(&transfer.id, "user-1").await.unwrap();
        assert_eq!(cancelled.status, TransferStatus::Cancelled);

        let after = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(after.warehouse_stock, 20);

        let err = db.transfers().complete(&transfer.id, "user-1").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_completion_checks_stock_at_completion_time() {
        let (db, pid) = db_with_warehouse(10).await;
        let transfer = db
            .transfers()
            .create(&pid, Location::Warehouse, Location::Shop, 8, "user-1")
            .await
            .unwrap();

        // Stock drains between create and complete
        db.products()
            .try_adjust_stock(&pid, Location::Warehouse, -5)
            .await
            .unwrap();

        let err = db.transfers().complete(&transfer.id, "user-1").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 5, requested: 8, .. })
        ));

        // Failed completion leaves the transfer pending for retry
        let still = db.transactions().get_by_id(&transfer.id).await.unwrap().unwrap();
        assert_eq!(still.status, TransferStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_rejects_same_location() {
        let (db, pid) = db_with_warehouse(10).await;
        let err = db
            .transfers()
            .create(&pid, Location::Shop, Location::Shop, 1, "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resolve_unknown_transfer() {
        let (db, _) = db_with_warehouse(10).await;
        let err = db.transfers().complete("no-such-id", "user-1").await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TransferNotFound(_))));
    }
}
