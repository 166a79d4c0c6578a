//! # Purchase Repository
//!
//! Row-level access for supplier purchase documents. The purchasing
//! service composes these with batch creation and warehouse stock
//! intake inside one transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use stockbook_core::{Purchase, PurchaseLine};

const PURCHASE_COLUMNS: &str =
    "id, invoice_number, subtotal_cents, tax_cents, total_cents, notes, user_id, created_at";

const LINE_COLUMNS: &str = "id, purchase_id, product_id, quantity, unit_cost_cents, \
     supplier, batch_number, purchase_date, created_at";

/// Repository for purchase documents.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// Gets a purchase's line items.
    pub async fn get_lines(&self, purchase_id: &str) -> DbResult<Vec<PurchaseLine>> {
        let sql =
            format!("SELECT {LINE_COLUMNS} FROM purchase_lines WHERE purchase_id = ? ORDER BY id");
        let lines = sqlx::query_as::<_, PurchaseLine>(&sql)
            .bind(purchase_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Lists purchases, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let purchases = sqlx::query_as::<_, Purchase>(&sql)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(purchases)
    }
}

// =============================================================================
// Transactional variants
// =============================================================================

/// Inserts a purchase document on an existing connection/transaction.
pub async fn insert_purchase_tx(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    debug!(id = %purchase.id, total_cents = %purchase.total_cents, "Inserting purchase");

    sqlx::query(
        "INSERT INTO purchases ( \
            id, invoice_number, subtotal_cents, tax_cents, total_cents, \
            notes, user_id, created_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&purchase.id)
    .bind(&purchase.invoice_number)
    .bind(purchase.subtotal_cents)
    .bind(purchase.tax_cents)
    .bind(purchase.total_cents)
    .bind(&purchase.notes)
    .bind(&purchase.user_id)
    .bind(purchase.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a purchase line on an existing connection/transaction.
pub async fn insert_line_tx(conn: &mut SqliteConnection, line: &PurchaseLine) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO purchase_lines ( \
            id, purchase_id, product_id, quantity, unit_cost_cents, \
            supplier, batch_number, purchase_date, created_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&line.id)
    .bind(&line.purchase_id)
    .bind(&line.product_id)
    .bind(line.quantity)
    .bind(line.unit_cost_cents)
    .bind(&line.supplier)
    .bind(&line.batch_number)
    .bind(line.purchase_date)
    .bind(line.created_at)
    .execute(conn)
    .await?;

    Ok(())
}
