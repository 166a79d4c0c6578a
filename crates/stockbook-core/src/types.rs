//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐  ┌──────────────────────┐  ┌───────────────┐     │
//! │  │   Product     │  │ InventoryTransaction │  │     Sale      │     │
//! │  │ ───────────── │  │ ──────────────────── │  │ ───────────── │     │
//! │  │ id (UUID)     │  │ id (UUID)            │  │ id (UUID)     │     │
//! │  │ sku / barcode │  │ type / quantity      │  │ lines         │     │
//! │  │ two counters  │  │ from / to location   │  │ payment state │     │
//! │  │ batches       │  │ status (transfers)   │  │ customer      │     │
//! │  └───────────────┘  └──────────────────────┘  └───────────────┘     │
//! │                                                                     │
//! │  Location {warehouse, shop}     TransferStatus {pending,            │
//! │  TransactionType {purchase,       completed, cancelled}             │
//! │    sale, transfer, adjustment}  PaymentStatus {paid, partial,       │
//! │                                   unpaid}                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, barcode, batch_number, invoice_number) -
//!   human-readable, potentially mutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Location
// =============================================================================

/// One of the two physical stock pools tracked per product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Back-of-house bulk storage; purchases land here.
    Warehouse,
    /// Front-of-house selling floor; checkouts usually consume here.
    Shop,
}

impl Location {
    /// The opposite location (transfer destination shorthand).
    #[inline]
    pub const fn other(&self) -> Location {
        match self {
            Location::Warehouse => Location::Shop,
            Location::Shop => Location::Warehouse,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Warehouse => write!(f, "warehouse"),
            Location::Shop => write!(f, "shop"),
        }
    }
}

// =============================================================================
// Transaction Type
// =============================================================================

/// The kind of stock-affecting event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Stock intake from a supplier; adds to `to_location`.
    Purchase,
    /// Checkout consumption; subtracts from `from_location`.
    Sale,
    /// Two-location movement; only applies once completed.
    Transfer,
    /// Manual correction; signed quantity applied to `to_location`.
    Adjustment,
}

// =============================================================================
// Transfer Status
// =============================================================================

/// Lifecycle status of a transfer transaction.
///
/// Non-transfer ledger rows are written as `Completed` and never move.
/// The only legal transitions are `Pending → Completed` and
/// `Pending → Cancelled`; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    /// Transfer recorded but stock not yet moved.
    Pending,
    /// Stock moved exactly once. Terminal.
    Completed,
    /// Abandoned with no stock effect. Terminal.
    Cancelled,
}

impl Default for TransferStatus {
    fn default() -> Self {
        TransferStatus::Pending
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Mobile wallet payment.
    Mobile,
}

/// Settlement state of a sale, derived from total vs amount paid.
///
/// Recomputed by [`crate::checkout::settle`] on every save - never set
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// amount_paid >= total.
    Paid,
    /// 0 < amount_paid < total.
    Partial,
    /// amount_paid == 0.
    Unpaid,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog with its two location stock counters.
///
/// ## Stock Model
/// `warehouse_stock` and `shop_stock` are the physical counters and are
/// mutated exclusively through recorded ledger transactions.
/// `total_quantity` is the sum of batch quantities (cost records) and
/// is NOT depleted by sales - see [`crate::costing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique across products.
    pub sku: String,

    /// Barcode - unique when present; generated on import if absent.
    pub barcode: Option<String>,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Category name.
    pub category: Option<String>,

    /// Selling price in cents.
    pub selling_price_cents: i64,

    /// Units physically in the warehouse.
    pub warehouse_stock: i64,

    /// Units physically in the shop.
    pub shop_stock: i64,

    /// Sum of batch quantities (cost records).
    pub total_quantity: i64,

    /// Cumulative units sold over the product's lifetime.
    pub total_sold: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency version; bumped by every stock mutation.
    pub version: i64,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A purchased lot of a product with its own quantity and unit cost.
///
/// Owned by exactly one product; created on purchase or import.
/// Under the average-cost policy, batches are never decremented by
/// sales or transfers - they exist to price cost of goods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub batch_number: Option<String>,
    pub supplier: Option<String>,
    /// Units purchased in this lot (> 0).
    pub quantity: i64,
    /// Cost per unit in cents (> 0).
    pub unit_cost_cents: i64,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the unit cost as Money.
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }
}

// =============================================================================
// Inventory Transaction
// =============================================================================

/// An append-only record of a stock-affecting event.
///
/// Once written, a row is immutable except for the status column of
/// transfer rows (pending → completed/cancelled). Replaying every
/// transaction for a product from zero must reproduce its stored
/// counters - see [`crate::stock::replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryTransaction {
    pub id: String,
    pub product_id: String,
    pub txn_type: TransactionType,
    /// Signed for adjustments, positive for everything else.
    pub quantity: i64,
    /// Source location (sales, transfers).
    pub from_location: Option<Location>,
    /// Destination location (purchases, transfers, adjustments).
    pub to_location: Option<Location>,
    /// Lifecycle status; meaningful for transfers only.
    pub status: TransferStatus,
    /// Free-form link to the originating document (sale id, invoice).
    pub reference: Option<String>,
    pub notes: Option<String>,
    /// Acting user, recorded for audit.
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed checkout with its settlement state.
///
/// The customer is a sub-document (name + mobile), not a separate
/// entity: customers are derived by grouping sales on those fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub customer_name: String,
    pub customer_mobile: String,
    /// Location stock was consumed from.
    pub location: Location,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub amount_paid_cents: i64,
    /// total - amount_paid, clamped at zero. Derived, never set directly.
    pub due_cents: i64,
    /// Derived from total vs amount_paid. Never set directly.
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn due(&self) -> Money {
        Money::from_cents(self.due_cents)
    }
}

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Average unit cost at time of sale (frozen).
    pub unit_cost_cents: i64,
    /// (unit_price - unit_cost) × quantity.
    pub profit_cents: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// A supplier purchase document; each line becomes a batch plus a
/// `purchase` ledger row against the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: String,
    pub invoice_number: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub notes: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseLine {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customer (derived)
// =============================================================================

/// Aggregate view of a customer, computed at query time by grouping
/// sales on (name, mobile). Never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerSummary {
    pub name: String,
    pub mobile: String,
    /// Sum of due amounts across sales not yet fully paid.
    pub total_due_cents: i64,
    /// Number of sales.
    pub total_purchases: i64,
    /// Sum of sale totals.
    pub total_spent_cents: i64,
    /// Most recent sale timestamp.
    pub last_purchase: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(8.25);
        assert_eq!(rate.bps(), 825);
    }

    #[test]
    fn test_location_other() {
        assert_eq!(Location::Warehouse.other(), Location::Shop);
        assert_eq!(Location::Shop.other(), Location::Warehouse);
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::Warehouse.to_string(), "warehouse");
        assert_eq!(Location::Shop.to_string(), "shop");
    }

    #[test]
    fn test_transfer_status_default() {
        assert_eq!(TransferStatus::default(), TransferStatus::Pending);
    }
}
