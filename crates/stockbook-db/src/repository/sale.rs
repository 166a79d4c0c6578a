//! # Sale Repository
//!
//! Row-level access for sales and their line items. Checkout itself
//! (pricing, stock consumption, ledger rows) lives in the checkout
//! service; this repository only reads and writes the documents.
//!
//! ## Settlement
//! `due_cents` and `payment_status` are always derived with
//! [`stockbook_core::checkout::settle`]; `record_payment` re-derives
//! both after adding to the paid amount.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockbook_core::checkout::settle;
use stockbook_core::{Money, Sale, SaleLine};

const SALE_COLUMNS: &str = "id, customer_name, customer_mobile, location, \
     subtotal_cents, discount_cents, tax_cents, total_cents, \
     payment_method, amount_paid_cents, due_cents, payment_status, \
     notes, user_id, created_at, updated_at";

const LINE_COLUMNS: &str = "id, sale_id, product_id, sku_snapshot, name_snapshot, \
     quantity, unit_price_cents, unit_cost_cents, profit_cents, line_total_cents, created_at";

/// Repository for sale documents.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets a sale's line items.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ? ORDER BY id");
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    /// Lists sales, newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Lists sales for one customer identity, newest first.
    pub async fn list_for_customer(
        &self,
        name: &str,
        mobile: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE customer_name = ? AND customer_mobile = ? \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(name)
            .bind(mobile)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Records an additional payment against a sale.
    ///
    /// Adds `amount_cents` to the paid amount and re-derives the due
    /// amount and payment status. Overpayment is allowed; the due
    /// amount clamps at zero.
    pub async fn record_payment(&self, sale_id: &str, amount_cents: i64) -> DbResult<Sale> {
        stockbook_core::validation::validate_payment_amount(amount_cents)?;
        debug!(sale_id = %sale_id, amount_cents = %amount_cents, "Recording payment");

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let paid = Money::from_cents(sale.amount_paid_cents + amount_cents);
        let (due, status) = settle(sale.total(), paid);

        sqlx::query(
            "UPDATE sales SET amount_paid_cents = ?, due_cents = ?, payment_status = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(paid.cents())
        .bind(due.cents())
        .bind(status)
        .bind(Utc::now())
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let updated = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        Ok(updated)
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional variants
// =============================================================================

/// Inserts a sale document on an existing connection/transaction.
pub async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total_cents = %sale.total_cents, "Inserting sale");

    sqlx::query(
        "INSERT INTO sales ( \
            id, customer_name, customer_mobile, location, \
            subtotal_cents, discount_cents, tax_cents, total_cents, \
            payment_method, amount_paid_cents, due_cents, payment_status, \
            notes, user_id, created_at, updated_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&sale.id)
    .bind(&sale.customer_name)
    .bind(&sale.customer_mobile)
    .bind(sale.location)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.amount_paid_cents)
    .bind(sale.due_cents)
    .bind(sale.payment_status)
    .bind(&sale.notes)
    .bind(&sale.user_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a sale line on an existing connection/transaction.
pub async fn insert_line_tx(conn: &mut SqliteConnection, line: &SaleLine) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO sale_lines ( \
            id, sale_id, product_id, sku_snapshot, name_snapshot, \
            quantity, unit_price_cents, unit_cost_cents, profit_cents, line_total_cents, \
            created_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&line.id)
    .bind(&line.sale_id)
    .bind(&line.product_id)
    .bind(&line.sku_snapshot)
    .bind(&line.name_snapshot)
    .bind(line.quantity)
    .bind(line.unit_price_cents)
    .bind(line.unit_cost_cents)
    .bind(line.profit_cents)
    .bind(line.line_total_cents)
    .bind(line.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
