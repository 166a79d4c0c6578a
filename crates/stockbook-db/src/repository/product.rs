//! # Product Repository
//!
//! Database operations for products and their purchase batches.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │             Conditional Delta Update (race-free)                    │
//! │                                                                     │
//! │  ❌ WRONG: read-modify-write (two concurrent sales both read 5,     │
//! │     both write 2 → one sale vanishes from the counter)              │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional UPDATE with a floor check              │
//! │     UPDATE products                                                 │
//! │     SET shop_stock = shop_stock + ?delta, version = version + 1     │
//! │     WHERE id = ? AND (?delta >= 0 OR shop_stock + ?delta >= 0)      │
//! │                                                                     │
//! │  rows_affected = 0 → floor would be violated (or row missing);      │
//! │  the caller rolls back and reports InsufficientStock.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transactional variants (`*_tx`) take a `&mut SqliteConnection` so
//! services can compose them inside one SQL transaction.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::{Batch, CoreError, Location, Money, Product};

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, description, category, \
     selling_price_cents, warehouse_stock, shop_stock, total_quantity, total_sold, \
     is_active, created_at, updated_at, version";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        get_by_id_tx(&mut *conn, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Searches active products by name or SKU substring.
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();
        let limit = super::page_limit(limit);
        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND (name LIKE ? OR sku LIKE ?) \
             ORDER BY name LIMIT ? OFFSET ?"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(CoreError::DuplicateSku/DuplicateBarcode)` - unique key taken
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_tx(&mut *conn, product).await
    }

    /// Updates a product's catalog fields (not stock counters).
    ///
    /// Stock counters are only reachable through `try_adjust_stock` so
    /// every change stays paired with a ledger row.
    pub async fn update_catalog(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET \
                sku = ?, barcode = ?, name = ?, description = ?, category = ?, \
                selling_price_cents = ?, is_active = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.selling_price_cents)
        .bind(product.is_active)
        .bind(now)
        .bind(&product.id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_unique(DbError::from(e), product))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Atomically adjusts a stock counter with a floor check.
    ///
    /// Returns `false` when the conditional update matched no row:
    /// either the product is missing or the floor would be violated.
    pub async fn try_adjust_stock(
        &self,
        id: &str,
        location: Location,
        delta: i64,
    ) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        try_adjust_stock_tx(&mut *conn, id, location, delta).await
    }

    /// Appends a purchase batch and recomputes `total_quantity`.
    pub async fn add_batch(&self, batch: &Batch) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        add_batch_tx(&mut *tx, batch).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Lists a product's batches, oldest purchase first.
    pub async fn list_batches(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let mut conn = self.pool.acquire().await?;
        list_batches_tx(&mut *conn, product_id).await
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Guard
    /// Products with recorded sales stay: history references them.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if product.total_sold > 0 {
            return Err(CoreError::ProductHasSales(product.sku).into());
        }

        let now = Utc::now();

        sqlx::query("UPDATE products SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transactional variants
// =============================================================================

/// Gets a product by ID on an existing connection/transaction.
pub async fn get_by_id_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(product)
}

/// Inserts a product on an existing connection/transaction.
pub async fn insert_tx(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(sku = %product.sku, "Inserting product");

    sqlx::query(
        "INSERT INTO products ( \
            id, sku, barcode, name, description, category, \
            selling_price_cents, warehouse_stock, shop_stock, total_quantity, total_sold, \
            is_active, created_at, updated_at, version \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.barcode)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.category)
    .bind(product.selling_price_cents)
    .bind(product.warehouse_stock)
    .bind(product.shop_stock)
    .bind(product.total_quantity)
    .bind(product.total_sold)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .bind(product.version)
    .execute(conn)
    .await
    .map_err(|e| classify_unique(DbError::from(e), product))?;

    Ok(())
}

/// The atomic conditional stock update (see module docs).
pub async fn try_adjust_stock_tx(
    conn: &mut SqliteConnection,
    id: &str,
    location: Location,
    delta: i64,
) -> DbResult<bool> {
    debug!(id = %id, location = %location, delta = %delta, "Adjusting stock");

    let sql = match location {
        Location::Warehouse => {
            "UPDATE products \
             SET warehouse_stock = warehouse_stock + ?, updated_at = ?, version = version + 1 \
             WHERE id = ? AND (? >= 0 OR warehouse_stock + ? >= 0)"
        }
        Location::Shop => {
            "UPDATE products \
             SET shop_stock = shop_stock + ?, updated_at = ?, version = version + 1 \
             WHERE id = ? AND (? >= 0 OR shop_stock + ? >= 0)"
        }
    };

    let now = Utc::now();

    let result = sqlx::query(sql)
        .bind(delta)
        .bind(now)
        .bind(id)
        .bind(delta)
        .bind(delta)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Overwrites a stock counter without a floor check.
///
/// Reserved for ledger-replay repair, which rewrites the counter side
/// of the drift without touching the ledger. Everything else goes
/// through `try_adjust_stock_tx`.
pub async fn force_set_stock_tx(
    conn: &mut SqliteConnection,
    id: &str,
    location: Location,
    value: i64,
) -> DbResult<()> {
    let sql = match location {
        Location::Warehouse => {
            "UPDATE products \
             SET warehouse_stock = ?, updated_at = ?, version = version + 1 WHERE id = ?"
        }
        Location::Shop => {
            "UPDATE products \
             SET shop_stock = ?, updated_at = ?, version = version + 1 WHERE id = ?"
        }
    };

    let result = sqlx::query(sql)
        .bind(value)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Bumps the cumulative sold counter.
pub async fn increment_total_sold_tx(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET total_sold = total_sold + ?, updated_at = ? WHERE id = ?",
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Appends a batch row and recomputes `total_quantity`.
pub async fn add_batch_tx(conn: &mut SqliteConnection, batch: &Batch) -> DbResult<()> {
    stockbook_core::costing::validate_batch(batch.quantity, Money::from_cents(batch.unit_cost_cents))?;

    sqlx::query(
        "INSERT INTO batches ( \
            id, product_id, batch_number, supplier, quantity, unit_cost_cents, \
            purchase_date, created_at \
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&batch.id)
    .bind(&batch.product_id)
    .bind(&batch.batch_number)
    .bind(&batch.supplier)
    .bind(batch.quantity)
    .bind(batch.unit_cost_cents)
    .bind(batch.purchase_date)
    .bind(batch.created_at)
    .execute(&mut *conn)
    .await?;

    let result = sqlx::query(
        "UPDATE products SET total_quantity = total_quantity + ?, updated_at = ? WHERE id = ?",
    )
    .bind(batch.quantity)
    .bind(Utc::now())
    .bind(&batch.product_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &batch.product_id));
    }

    Ok(())
}

/// Lists batches on an existing connection/transaction.
pub async fn list_batches_tx(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<Batch>> {
    let batches = sqlx::query_as::<_, Batch>(
        "SELECT id, product_id, batch_number, supplier, quantity, unit_cost_cents, \
                purchase_date, created_at \
         FROM batches WHERE product_id = ? ORDER BY purchase_date, created_at",
    )
    .bind(product_id)
    .fetch_all(conn)
    .await?;

    Ok(batches)
}

/// Turns raw UNIQUE violations into typed duplicate errors.
fn classify_unique(err: DbError, product: &Product) -> DbError {
    if err.is_unique_violation_on("sku") {
        return CoreError::DuplicateSku(product.sku.clone()).into();
    }
    if err.is_unique_violation_on("barcode") {
        let barcode = product.barcode.clone().unwrap_or_default();
        return CoreError::DuplicateBarcode(barcode).into();
    }
    err
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builds a fresh product with zeroed counters.
///
/// ## Usage
/// ```rust,ignore
/// let product = new_product("RICE-5KG", "Rice 5kg", 1250);
/// db.products().insert(&product).await?;
/// ```
pub fn new_product(sku: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Product {
    let now = Utc::now();
    Product {
        id: generate_product_id(),
        sku: sku.into(),
        barcode: None,
        name: name.into(),
        description: None,
        category: None,
        selling_price_cents: price_cents,
        warehouse_stock: 0,
        shop_stock: 0,
        total_quantity: 0,
        total_sold: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
