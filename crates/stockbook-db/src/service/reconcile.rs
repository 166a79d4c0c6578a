//! # Reconciliation Service
//!
//! Verifies the system's central invariant: replaying a product's
//! ledger from zero reproduces its stored counters. Drift means a
//! counter was changed outside a recorded transaction (or a bug ate
//! a write), and is surfaced as a typed error rather than silently
//! absorbed.
//!
//! ## Repair Semantics
//! Drift is a disagreement between two views of the truth. An
//! adjustment row cannot fix it (it moves both views in lockstep), so
//! `repair` rewrites the counter side only, trusting the ledger.
//! Physical-count corrections, where the COUNTER side is the truth,
//! live in the inventory service instead and do write ledger rows.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::error::DbResult;
use crate::repository::{product, transaction};
use stockbook_core::stock::{check_drift, replay, StockLevels};
use stockbook_core::{CoreError, Location};

/// Per-product drift report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    pub product_id: String,
    pub sku: String,
    pub stored: StockLevels,
    pub replayed: StockLevels,
}

impl DriftReport {
    /// Whether the counters match the ledger.
    pub fn is_consistent(&self) -> bool {
        self.stored == self.replayed
    }
}

/// Service verifying and repairing the ledger/counter invariant.
#[derive(Debug, Clone)]
pub struct ReconciliationService {
    pool: SqlitePool,
}

impl ReconciliationService {
    /// Creates a new ReconciliationService.
    pub fn new(pool: SqlitePool) -> Self {
        ReconciliationService { pool }
    }

    /// Compares a product's counters against its ledger replay.
    #[instrument(skip(self))]
    pub async fn report(&self, product_id: &str) -> DbResult<DriftReport> {
        let mut conn = self.pool.acquire().await?;

        let item = product::get_by_id_tx(&mut *conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let history = transaction::history_for_product_tx(&mut *conn, product_id).await?;

        let report = DriftReport {
            product_id: item.id.clone(),
            sku: item.sku.clone(),
            stored: item.stock_levels(),
            replayed: replay(&history),
        };

        if !report.is_consistent() {
            warn!(
                product_id = %report.product_id,
                sku = %report.sku,
                stored = ?report.stored,
                replayed = ?report.replayed,
                "Stock drift detected"
            );
        }

        Ok(report)
    }

    /// Errors with `StockDrift` if the invariant is violated.
    #[instrument(skip(self))]
    pub async fn verify(&self, product_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;

        let item = product::get_by_id_tx(&mut *conn, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let history = transaction::history_for_product_tx(&mut *conn, product_id).await?;

        check_drift(&item, &history)?;
        Ok(())
    }

    /// Rewrites drifted counters to the ledger-replayed values.
    ///
    /// Deliberately writes NO ledger row (see module docs). Returns the
    /// report captured before repair.
    #[instrument(skip(self))]
    pub async fn repair(&self, product_id: &str, user_id: &str) -> DbResult<DriftReport> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("repair requires a signed-in user".to_string()).into());
        }

        let mut tx = self.pool.begin().await?;

        let item = product::get_by_id_tx(&mut *tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let history = transaction::history_for_product_tx(&mut *tx, product_id).await?;

        let report = DriftReport {
            product_id: item.id.clone(),
            sku: item.sku.clone(),
            stored: item.stock_levels(),
            replayed: replay(&history),
        };

        if report.is_consistent() {
            return Ok(report);
        }

        if report.stored.warehouse != report.replayed.warehouse {
            product::force_set_stock_tx(
                &mut *tx,
                &item.id,
                Location::Warehouse,
                report.replayed.warehouse,
            )
            .await?;
        }
        if report.stored.shop != report.replayed.shop {
            product::force_set_stock_tx(&mut *tx, &item.id, Location::Shop, report.replayed.shop)
                .await?;
        }

        tx.commit().await?;

        info!(
            product_id = %report.product_id,
            user_id = %user_id,
            stored = ?report.stored,
            replayed = ?report.replayed,
            "Counters repaired from ledger"
        );

        Ok(report)
    }

    /// Reports drift across every active product.
    pub async fn audit(&self) -> DbResult<Vec<DriftReport>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM products WHERE is_active = 1 ORDER BY sku")
                .fetch_all(&self.pool)
                .await?;

        let mut drifted = Vec::new();
        for id in ids {
            let report = self.report(&id).await?;
            if !report.is_consistent() {
                drifted.push(report);
            }
        }
        Ok(drifted)
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

    async fn db_with_clean_history() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&item).await.unwrap();

        // All movement goes through the inventory service, so
        // counters and ledger agree by construction.
        db.inventory()
            .adjust(&item.id, Location::Warehouse, 20, None, "user-1")
            .await
            .unwrap();
        db.inventory()
            .adjust(&item.id, Location::Shop, 5, None, "user-1")
            .await
            .unwrap();

        (db, item.id)
    }

    async fn corrupt_counter(db: &Database, pid: &str) {
        // Simulates a write that bypassed the ledger
        sqlx::query("UPDATE products SET shop_stock = 99 WHERE id = ?")
            .bind(pid)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_consistent_product_verifies() {
        let (db, pid) = db_with_clean_history().await;

        db.reconciliation().verify(&pid).await.unwrap();
        let report = db.reconciliation().report(&pid).await.unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.stored, StockLevels::new(20, 5));
    }

    #[tokio::test]
    async fn test_drift_detected() {
        let (db, pid) = db_with_clean_history().await;
        corrupt_counter(&db, &pid).await;

        let err = db.reconciliation().verify(&pid).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::StockDrift { .. })));

        let report = db.reconciliation().report(&pid).await.unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.stored.shop, 99);
        assert_eq!(report.replayed.shop, 5);
    }

    #[tokio::test]
    async fn test_repair_restores_invariant_without_ledger_rows() {
        let (db, pid) = db_with_clean_history().await;
        let rows_before = db.transactions().history_for_product(&pid).await.unwrap().len();
        corrupt_counter(&db, &pid).await;

        let report = db.reconciliation().repair(&pid, "user-1").await.unwrap();
        assert!(!report.is_consistent());

        // Invariant restored, ledger untouched
        db.reconciliation().verify(&pid).await.unwrap();
        let rows_after = db.transactions().history_for_product(&pid).await.unwrap().len();
        assert_eq!(rows_before, rows_after);

        let item = db.products().get_by_id(&pid).await.unwrap().unwrap();
        assert_eq!(item.shop_stock, 5);
    }

    #[tokio::test]
    async fn test_repair_noop_when_consistent() {
        let (db, pid) = db_with_clean_history().await;
        let report = db.reconciliation().repair(&pid, "user-1").await.unwrap();
        assert!(report.is_consistent());
    }

    #[tokio::test]
    async fn test_audit_lists_only_drifted() {
        let (db, pid) = db_with_clean_history().await;
        let other = new_product("TEA-1KG", "Tea 1kg", 700);
        db.products().insert(&other).await.unwrap();

        assert!(db.reconciliation().audit().await.unwrap().is_empty());

        corrupt_counter(&db, &pid).await;
        let drifted = db.reconciliation().audit().await.unwrap();
        assert_eq!(drifted.len(), 1);
        assert_eq!(drifted[0].product_id, pid);
    }
}
