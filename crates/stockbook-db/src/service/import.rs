//! # Bulk Import Service
//!
//! Imports a batch of products with their initial stock. One bad row
//! never blocks the rest: each row runs in its own transaction, and
//! failures are collected into a per-row report with 1-based row
//! numbers for the person fixing the source file.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  for row 1..=N:                                                     │
//! │    validate fields ── fail? ──► record (row, message), continue     │
//! │    generate sku/barcode if absent                                   │
//! │    BEGIN                                                            │
//! │      insert product                                                 │
//! │      insert batches, warehouse += Σ qty                             │
//! │      append 'purchase' ledger row (replay stays truthful)           │
//! │    COMMIT ── constraint error? ──► record, continue                 │
//! │  report { success, errors }                                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{product, transaction};
use stockbook_core::costing::validate_batch;
use stockbook_core::validation::{
    validate_barcode, validate_price_cents, validate_product_name, validate_sku,
};
use stockbook_core::{CoreError, Location, Money};

// =============================================================================
// Row / Report Types
// =============================================================================

/// Initial stock lot within an import row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatchRow {
    pub quantity: i64,
    pub unit_cost_cents: i64,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
}

/// One product row in an import payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub name: String,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub category: Option<String>,
    /// Generated from a UUID when absent.
    #[serde(default)]
    pub sku: Option<String>,
    /// Generated when absent.
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub batches: Vec<ImportBatchRow>,
}

/// A single row failure, 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

/// The outcome of a bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: usize,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    /// Whether every row imported.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Service
// =============================================================================

/// Service for bulk product import.
#[derive(Debug, Clone)]
pub struct ImportService {
    pool: SqlitePool,
}

impl ImportService {
    /// Creates a new ImportService.
    pub fn new(pool: SqlitePool) -> Self {
        ImportService { pool }
    }

    /// Imports products, continuing past per-row failures.
    #[instrument(skip(self, rows), fields(rows = rows.len(), user = %user_id))]
    pub async fn import(&self, rows: Vec<ImportRow>, user_id: &str) -> DbResult<ImportReport> {
        if user_id.trim().is_empty() {
            return Err(CoreError::Unauthorized("import requires a signed-in user".to_string()).into());
        }

        let mut report = ImportReport {
            success: 0,
            errors: Vec::new(),
        };
        // Duplicates inside the payload fail fast, before touching the db
        let mut seen_skus: HashSet<String> = HashSet::new();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            match self.import_row(row, &mut seen_skus, user_id).await {
                Ok(()) => report.success += 1,
                Err(err) => {
                    warn!(row = row_number, error = %err, "Import row failed");
                    report.errors.push(ImportRowError {
                        row: row_number,
                        message: err.to_string(),
                    });
                }
            }
        }

        info!(
            success = report.success,
            failed = report.errors.len(),
            "Import finished"
        );
        Ok(report)
    }

    async fn import_row(
        &self,
        row: ImportRow,
        seen_skus: &mut HashSet<String>,
        user_id: &str,
    ) -> DbResult<()> {
        validate_product_name(&row.name)?;
        validate_price_cents(row.selling_price_cents)?;

        let sku = match &row.sku {
            Some(sku) => {
                validate_sku(sku)?;
                sku.trim().to_string()
            }
            None => generate_sku(&row.name),
        };
        if seen_skus.contains(&sku) {
            return Err(CoreError::DuplicateSku(sku).into());
        }

        let barcode = match &row.barcode {
            Some(barcode) => {
                validate_barcode(barcode)?;
                barcode.trim().to_string()
            }
            None => generate_barcode(),
        };

        for lot in &row.batches {
            validate_batch(lot.quantity, Money::from_cents(lot.unit_cost_cents))?;
        }

        let now = Utc::now();
        let initial_stock: i64 = row.batches.iter().map(|b| b.quantity).sum();

        let mut item = product::new_product(sku.clone(), row.name.trim(), row.selling_price_cents);
        item.barcode = Some(barcode);
        item.category = row.category.clone();
        item.warehouse_stock = initial_stock;
        item.total_quantity = initial_stock;

        let mut tx = self.pool.begin().await?;

        product::insert_tx(&mut *tx, &item).await?;

        for lot in &row.batches {
            // new_product counters were pre-set; add_batch_tx would
            // double-count total_quantity, so insert the batch row alone
            sqlx::query(
                "INSERT INTO batches ( \
                    id, product_id, batch_number, supplier, quantity, unit_cost_cents, \
                    purchase_date, created_at \
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&item.id)
            .bind(&lot.batch_number)
            .bind(&lot.supplier)
            .bind(lot.quantity)
            .bind(lot.unit_cost_cents)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        if initial_stock > 0 {
            transaction::insert_tx(
                &mut *tx,
                &transaction::purchase_row(
                    &item.id,
                    initial_stock,
                    Location::Warehouse,
                    Some("import".to_string()),
                    user_id,
                ),
            )
            .await?;
        }

        tx.commit().await?;
        // A row only claims its SKU once it is actually in; a failed
        // row must not block a later valid row reusing the same SKU
        seen_skus.insert(sku);
        Ok(())
    }
}

/// Derives a SKU from the product name plus a random suffix.
fn generate_sku(name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_uppercase();
    let entropy = Uuid::new_v4().simple().to_string();
    let suffix = entropy[..6].to_uppercase();
    if prefix.is_empty() {
        format!("SKU-{}", suffix)
    } else {
        format!("{}-{}", prefix, suffix)
    }
}

/// Generates a 13-digit numeric barcode from UUID entropy.
fn generate_barcode() -> String {
    let digits: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(13)
        .collect();
    // Pad in the unlikely case the UUID had fewer than 13 digits
    format!("{:0<13}", digits)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn row(name: &str, sku: Option<&str>, quantity: i64) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            selling_price_cents: 1000,
            category: Some("grocery".to_string()),
            sku: sku.map(str::to_string),
            barcode: None,
            batches: if quantity > 0 {
                vec![ImportBatchRow {
                    quantity,
                    unit_cost_cents: 600,
                    supplier: None,
                    batch_number: None,
                }]
            } else {
                Vec::new()
            },
        }
    }

    #[tokio::test]
    async fn test_import_clean() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let report = db
            .import()
            .import(
                vec![row("Rice 5kg", Some("RICE-5KG"), 20), row("Green Tea", Some("TEA-1KG"), 0)],
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(report.success, 2);
        assert!(report.is_clean());

        let rice = db.products().get_by_sku("RICE-5KG").await.unwrap().unwrap();
        assert_eq!(rice.warehouse_stock, 20);
        assert_eq!(rice.total_quantity, 20);
        assert!(rice.barcode.is_some());

        // Imported stock reconciles against the ledger
        let history = db.transactions().history_for_product(&rice.id).await.unwrap();
        let replayed = stockbook_core::stock::replay(&history);
        assert_eq!(replayed.warehouse, 20);
    }

    #[tokio::test]
    async fn test_import_continues_past_bad_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let report = db
            .import()
            .import(
                vec![
                    row("Rice 5kg", Some("RICE-5KG"), 10),
                    row("Duplicate", Some("RICE-5KG"), 5), // row 2: dup sku
                    row("Green Tea", Some("TEA-1KG"), 3),
                ],
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(report.success, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 2);

        assert!(db.products().get_by_sku("TEA-1KG").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_row_does_not_claim_its_sku() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        // Row 1 carries the SKU but fails validation; row 2 reuses it
        let mut bad = row("Rice 5kg", Some("RICE-5KG"), 10);
        bad.barcode = Some("not-a-barcode".to_string());

        let report = db
            .import()
            .import(vec![bad, row("Rice 5kg", Some("RICE-5KG"), 10)], "user-1")
            .await
            .unwrap();

        assert_eq!(report.success, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);

        let rice = db.products().get_by_sku("RICE-5KG").await.unwrap().unwrap();
        assert_eq!(rice.warehouse_stock, 10);
    }

    #[tokio::test]
    async fn test_import_rejects_duplicate_against_store() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .insert(&product::new_product("RICE-5KG", "Existing", 900))
            .await
            .unwrap();

        let report = db
            .import()
            .import(vec![row("Rice 5kg", Some("RICE-5KG"), 10)], "user-1")
            .await
            .unwrap();

        assert_eq!(report.success, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);
    }

    #[tokio::test]
    async fn test_import_validation_failures_reported_per_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut bad_batch = row("Broken", Some("BAD-1"), 0);
        bad_batch.batches = vec![ImportBatchRow {
            quantity: -5,
            unit_cost_cents: 100,
            supplier: None,
            batch_number: None,
        }];

        let report = db
            .import()
            .import(
                vec![row("", Some("EMPTY-NAME"), 1), bad_batch, row("Fine", Some("OK-1"), 1)],
                "user-1",
            )
            .await
            .unwrap();

        assert_eq!(report.success, 1);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[1].row, 2);
    }

    #[tokio::test]
    async fn test_import_generates_sku_and_barcode() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let report = db
            .import()
            .import(vec![row("Basmati Rice", None, 5)], "user-1")
            .await
            .unwrap();
        assert_eq!(report.success, 1);

        let hits = db.products().search("Basmati", 10, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].sku.starts_with("BASMATIR-"));
        let barcode = hits[0].barcode.as_deref().unwrap();
        assert_eq!(barcode.len(), 13);
        assert!(barcode.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_barcode_is_13_digits() {
        for _ in 0..20 {
            let barcode = generate_barcode();
            assert_eq!(barcode.len(), 13);
            assert!(barcode.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
