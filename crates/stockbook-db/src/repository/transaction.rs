//! # Inventory Transaction Repository
//!
//! The append-only stock ledger. Every stock movement (purchase, sale,
//! transfer, adjustment) is a row here; the counters on `products` are
//! a cache that must always equal a replay of these rows.
//!
//! ## Row Shapes
//! ```text
//! purchase    quantity > 0, to_location set           always completed
//! sale        quantity > 0, from_location set         always completed
//! transfer    quantity > 0, both locations set        pending → completed/cancelled
//! adjustment  quantity signed, to_location set        always completed
//! ```
//!
//! Rows are never updated after the fact, with one exception: a
//! transfer's `status` column, flipped exactly once by a conditional
//! UPDATE (see `transition_transfer_tx`).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use stockbook_core::{InventoryTransaction, Location, TransactionType, TransferStatus};

const TXN_COLUMNS: &str = "id, product_id, txn_type, quantity, from_location, to_location, \
     status, reference, notes, user_id, created_at, updated_at";

/// Repository for the inventory transaction ledger.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a ledger row by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryTransaction>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id_tx(&mut *conn, id).await
    }

    /// Appends a ledger row.
    pub async fn insert(&self, txn: &InventoryTransaction) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_tx(&mut *conn, txn).await
    }

    /// Lists ledger rows, newest first, optionally filtered.
    ///
    /// `NULL`-tolerant filters keep this a single static query:
    /// a `None` filter matches every row.
    pub async fn list(
        &self,
        product_id: Option<&str>,
        txn_type: Option<TransactionType>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM inventory_transactions \
             WHERE (?1 IS NULL OR product_id = ?1) \
               AND (?2 IS NULL OR txn_type = ?2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?3 OFFSET ?4"
        );
        let rows = sqlx::query_as::<_, InventoryTransaction>(&sql)
            .bind(product_id)
            .bind(txn_type)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Lists pending transfers, oldest first.
    pub async fn list_pending_transfers(&self, limit: u32) -> DbResult<Vec<InventoryTransaction>> {
        let sql = format!(
            "SELECT {TXN_COLUMNS} FROM inventory_transactions \
             WHERE txn_type = 'transfer' AND status = 'pending' \
             ORDER BY created_at, id LIMIT ?"
        );
        let rows = sqlx::query_as::<_, InventoryTransaction>(&sql)
            .bind(super::page_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Full ledger history for one product, oldest first.
    ///
    /// This is the replay input for reconciliation, so it is
    /// deliberately unpaginated.
    pub async fn history_for_product(
        &self,
        product_id: &str,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let mut conn = self.pool.acquire().await?;
        history_for_product_tx(&mut *conn, product_id).await
    }

    /// Counts ledger rows (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional variants
// =============================================================================

/// Gets a ledger row by ID on an existing connection/transaction.
pub async fn get_by_id_tx(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<InventoryTransaction>> {
    let sql = format!("SELECT {TXN_COLUMNS} FROM inventory_transactions WHERE id = ?");
    let txn = sqlx::query_as::<_, InventoryTransaction>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(txn)
}

/// Appends a ledger row on an existing connection/transaction.
pub async fn insert_tx(conn: &mut SqliteConnection, txn: &InventoryTransaction) -> DbResult<()> {
    debug!(
        id = %txn.id,
        product_id = %txn.product_id,
        txn_type = ?txn.txn_type,
        quantity = %txn.quantity,
        "Recording inventory transaction"
    );

    sqlx::query(
        "INSERT INTO inventory_transactions ( \
            id, product_id, txn_type, quantity, from_location, to_location, \
            status, reference, notes, user_id, created_at, updated_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&txn.id)
    .bind(&txn.product_id)
    .bind(txn.txn_type)
    .bind(txn.quantity)
    .bind(txn.from_location)
    .bind(txn.to_location)
    .bind(txn.status)
    .bind(&txn.reference)
    .bind(&txn.notes)
    .bind(&txn.user_id)
    .bind(txn.created_at)
    .bind(txn.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Flips a pending transfer's status exactly once.
///
/// The `status = 'pending'` guard in the WHERE clause makes concurrent
/// completion attempts race safely: only one UPDATE matches.
/// Returns `false` when no row matched (missing, not a transfer, or
/// already resolved); the caller re-reads to report the precise error.
pub async fn transition_transfer_tx(
    conn: &mut SqliteConnection,
    id: &str,
    to: TransferStatus,
) -> DbResult<bool> {
    debug!(id = %id, to = ?to, "Transitioning transfer");

    let result = sqlx::query(
        "UPDATE inventory_transactions \
         SET status = ?, updated_at = ? \
         WHERE id = ? AND txn_type = 'transfer' AND status = 'pending'",
    )
    .bind(to)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Full product history on an existing connection/transaction.
pub async fn history_for_product_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<InventoryTransaction>> {
    let sql = format!(
        "SELECT {TXN_COLUMNS} FROM inventory_transactions \
         WHERE product_id = ? ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, InventoryTransaction>(&sql)
        .bind(product_id)
        .fetch_all(conn)
        .await?;

    Ok(rows)
}

// =============================================================================
// Constructors
// =============================================================================

/// Builds a completed purchase row (stock arriving at a location).
pub fn purchase_row(
    product_id: &str,
    quantity: i64,
    to: Location,
    reference: Option<String>,
    user_id: &str,
) -> InventoryTransaction {
    base_row(product_id, TransactionType::Purchase, quantity, None, Some(to), reference, user_id)
}

/// Builds a completed sale row (stock leaving a location).
pub fn sale_row(
    product_id: &str,
    quantity: i64,
    from: Location,
    reference: Option<String>,
    user_id: &str,
) -> InventoryTransaction {
    base_row(product_id, TransactionType::Sale, quantity, Some(from), None, reference, user_id)
}

/// Builds a pending transfer row. Stock does not move until completion.
pub fn transfer_row(
    product_id: &str,
    quantity: i64,
    from: Location,
    to: Location,
    user_id: &str,
) -> InventoryTransaction {
    let mut txn = base_row(
        product_id,
        TransactionType::Transfer,
        quantity,
        Some(from),
        Some(to),
        None,
        user_id,
    );
    txn.status = TransferStatus::Pending;
    txn
}

/// Builds a completed adjustment row (signed quantity).
pub fn adjustment_row(
    product_id: &str,
    quantity: i64,
    location: Location,
    notes: Option<String>,
    user_id: &str,
) -> InventoryTransaction {
    let mut txn = base_row(
        product_id,
        TransactionType::Adjustment,
        quantity,
        None,
        Some(location),
        None,
        user_id,
    );
    txn.notes = notes;
    txn
}

fn base_row(
    product_id: &str,
    txn_type: TransactionType,
    quantity: i64,
    from: Option<Location>,
    to: Option<Location>,
    reference: Option<String>,
    user_id: &str,
) -> InventoryTransaction {
    let now = Utc::now();
    InventoryTransaction {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        txn_type,
        quantity,
        from_location: from,
        to_location: to,
        status: TransferStatus::Completed,
        reference,
        notes: None,
        user_id: user_id.to_string(),
        created_at: now,
        updated_at: now,
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

    async fn db_with_product() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = new_product("RICE-5KG", "Rice 5kg", 1250);
        db.products().insert(&product).await.unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (db, pid) = db_with_product().await;

        db.transactions()
            .insert(&purchase_row(&pid, 20, Location::Warehouse, None, "user-1"))
            .await
            .unwrap();
        db.transactions()
            .insert(&sale_row(&pid, 5, Location::Shop, None, "user-1"))
            .await
            .unwrap();

        let all = db.transactions().list(Some(&pid), None, 20, 0).await.unwrap();
        assert_eq!(all.len(), 2);

        let sales = db
            .transactions()
            .list(Some(&pid), Some(TransactionType::Sale), 20, 0)
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_transfer_transitions_once() {
        let (db, pid) = db_with_product().await;

        let transfer = transfer_row(&pid, 8, Location::Warehouse, Location::Shop, "user-1");
        db.transactions().insert(&transfer).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(
            transition_transfer_tx(&mut *conn, &transfer.id, TransferStatus::Completed)
                .await
                .unwrap()
        );
        // Second attempt finds no pending row
        assert!(
            !transition_transfer_tx(&mut *conn, &transfer.id, TransferStatus::Completed)
                .await
                .unwrap()
        );
        assert!(
            !transition_transfer_tx(&mut *conn, &transfer.id, TransferStatus::Cancelled)
                .await
                .unwrap()
        );
        drop(conn);

        let found = db.transactions().get_by_id(&transfer.id).await.unwrap().unwrap();
        assert_eq!(found.status, TransferStatus::Completed);
    }

    #[tokio::test]
    async fn test_pending_transfers_listing() {
        let (db, pid) = db_with_product().await;

        let t1 = transfer_row(&pid, 3, Location::Warehouse, Location::Shop, "user-1");
        let t2 = transfer_row(&pid, 4, Location::Warehouse, Location::Shop, "user-1");
        db.transactions().insert(&t1).await.unwrap();
        db.transactions().insert(&t2).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        transition_transfer_tx(&mut *conn, &t1.id, TransferStatus::Cancelled)
            .await
            .unwrap();
        drop(conn);

        let pending = db.transactions().list_pending_transfers(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, t2.id);
    }

    #[tokio::test]
    async fn test_history_is_oldest_first() {
        let (db, pid) = db_with_product().await;

        db.transactions()
            .insert(&purchase_row(&pid, 20, Location::Warehouse, None, "u"))
            .await
            .unwrap();
        db.transactions()
            .insert(&adjustment_row(&pid, -2, Location::Warehouse, None, "u"))
            .await
            .unwrap();

        let history = db.transactions().history_for_product(&pid).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].txn_type, TransactionType::Purchase);
        assert_eq!(history[1].txn_type, TransactionType::Adjustment);
    }
}
