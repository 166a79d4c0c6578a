//! # Location Stock Tracking
//!
//! Pure arithmetic over the two per-product stock counters, plus the
//! ledger replay that backs reconciliation.
//!
//! ## Reconciliation Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   For every product:                                                │
//! │                                                                     │
//! │   replay(all ledger rows, from zero)  ==  stored counters           │
//! │                                                                     │
//! │   purchase    → to_location   += qty                                │
//! │   sale        → from_location −= qty                                │
//! │   transfer    → (completed only) from −= qty, to += qty             │
//! │   adjustment  → to_location   += qty   (qty is signed)              │
//! │                                                                     │
//! │   Disagreement = stock drift (CoreError::StockDrift)                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The db layer enforces the floor (stock never below zero) with
//! conditional updates; this module stays total so replay can describe
//! historical data that DID go negative.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{InventoryTransaction, Location, Product, TransactionType, TransferStatus};

// =============================================================================
// Stock Levels
// =============================================================================

/// The pair of location counters for one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    pub warehouse: i64,
    pub shop: i64,
}

impl StockLevels {
    /// Creates stock levels from explicit counters.
    pub const fn new(warehouse: i64, shop: i64) -> Self {
        StockLevels { warehouse, shop }
    }

    /// Returns the counter for a location.
    #[inline]
    pub const fn get(&self, location: Location) -> i64 {
        match location {
            Location::Warehouse => self.warehouse,
            Location::Shop => self.shop,
        }
    }

    /// Whether `quantity` units can be taken from `location`.
    #[inline]
    pub const fn can_fulfill(&self, location: Location, quantity: i64) -> bool {
        quantity <= self.get(location)
    }

    /// Applies a signed delta to a location counter.
    pub fn apply(&mut self, location: Location, delta: i64) {
        match location {
            Location::Warehouse => self.warehouse += delta,
            Location::Shop => self.shop += delta,
        }
    }

    /// Total units across both locations.
    #[inline]
    pub const fn total(&self) -> i64 {
        self.warehouse + self.shop
    }
}

impl Product {
    /// Returns the product's stored counters as stock levels.
    #[inline]
    pub fn stock_levels(&self) -> StockLevels {
        StockLevels::new(self.warehouse_stock, self.shop_stock)
    }

    /// Returns the stored counter for a location.
    #[inline]
    pub fn stock_at(&self, location: Location) -> i64 {
        self.stock_levels().get(location)
    }
}

// =============================================================================
// Ledger Replay
// =============================================================================

/// Replays a product's ledger against zero-initialized counters.
///
/// Pending and cancelled transfers have no effect; every other row
/// applies its quantity as the ledger rules above describe. Rows
/// missing the location their type requires are skipped - the services
/// never write such rows, but replay must stay total over raw data.
pub fn replay(transactions: &[InventoryTransaction]) -> StockLevels {
    let mut levels = StockLevels::default();

    for txn in transactions {
        match txn.txn_type {
            TransactionType::Purchase => {
                if let Some(to) = txn.to_location {
                    levels.apply(to, txn.quantity);
                }
            }
            TransactionType::Sale => {
                if let Some(from) = txn.from_location {
                    levels.apply(from, -txn.quantity);
                }
            }
            TransactionType::Transfer => {
                if txn.status == TransferStatus::Completed {
                    if let (Some(from), Some(to)) = (txn.from_location, txn.to_location) {
                        levels.apply(from, -txn.quantity);
                        levels.apply(to, txn.quantity);
                    }
                }
            }
            TransactionType::Adjustment => {
                if let Some(to) = txn.to_location {
                    levels.apply(to, txn.quantity);
                }
            }
        }
    }

    levels
}

/// Checks a product's stored counters against a ledger replay.
///
/// Returns the first disagreement as [`CoreError::StockDrift`], naming
/// the location and both values so a repair adjustment can be sized.
pub fn check_drift(product: &Product, transactions: &[InventoryTransaction]) -> CoreResult<()> {
    let replayed = replay(transactions);
    let stored = product.stock_levels();

    for location in [Location::Warehouse, Location::Shop] {
        if stored.get(location) != replayed.get(location) {
            return Err(CoreError::StockDrift {
                product: product.sku.clone(),
                location,
                stored: stored.get(location),
                replayed: replayed.get(location),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn txn(
        txn_type: TransactionType,
        quantity: i64,
        from: Option<Location>,
        to: Option<Location>,
        status: TransferStatus,
    ) -> InventoryTransaction {
        InventoryTransaction {
            id: "t".to_string(),
            product_id: "p".to_string(),
            txn_type,
            quantity,
            from_location: from,
            to_location: to,
            status,
            reference: None,
            notes: None,
            user_id: "u".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn product_with_stock(warehouse: i64, shop: i64) -> Product {
        Product {
            id: "p".to_string(),
            sku: "SKU-1".to_string(),
            barcode: None,
            name: "Test".to_string(),
            description: None,
            category: None,
            selling_price_cents: 1000,
            warehouse_stock: warehouse,
            shop_stock: shop,
            total_quantity: 0,
            total_sold: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_can_fulfill() {
        let levels = StockLevels::new(10, 3);
        assert!(levels.can_fulfill(Location::Warehouse, 10));
        assert!(!levels.can_fulfill(Location::Warehouse, 11));
        assert!(levels.can_fulfill(Location::Shop, 3));
        assert!(!levels.can_fulfill(Location::Shop, 4));
    }

    #[test]
    fn test_apply_delta() {
        let mut levels = StockLevels::default();
        levels.apply(Location::Warehouse, 20);
        levels.apply(Location::Shop, 5);
        levels.apply(Location::Warehouse, -8);
        assert_eq!(levels, StockLevels::new(12, 5));
        assert_eq!(levels.total(), 17);
    }

    #[test]
    fn test_replay_full_lifecycle() {
        use Location::*;
        use TransactionType::*;
        use TransferStatus::*;

        let ledger = vec![
            // Purchase 20 into the warehouse
            txn(Purchase, 20, None, Some(Warehouse), Completed),
            // Move 8 to the shop
            txn(Transfer, 8, Some(Warehouse), Some(Shop), Completed),
            // Sell 5 from the shop
            txn(Sale, 5, Some(Shop), None, Completed),
            // Write off 2 from the warehouse
            txn(Adjustment, -2, None, Some(Warehouse), Completed),
        ];

        assert_eq!(replay(&ledger), StockLevels::new(10, 3));
    }

    #[test]
    fn test_replay_ignores_pending_and_cancelled_transfers() {
        use Location::*;
        use TransactionType::*;

        let ledger = vec![
            txn(Purchase, 10, None, Some(Warehouse), TransferStatus::Completed),
            txn(Transfer, 4, Some(Warehouse), Some(Shop), TransferStatus::Pending),
            txn(Transfer, 4, Some(Warehouse), Some(Shop), TransferStatus::Cancelled),
        ];

        assert_eq!(replay(&ledger), StockLevels::new(10, 0));
    }

    #[test]
    fn test_check_drift_clean() {
        use Location::*;
        use TransactionType::*;

        let ledger = vec![
            txn(Purchase, 12, None, Some(Warehouse), TransferStatus::Completed),
            txn(Transfer, 5, Some(Warehouse), Some(Shop), TransferStatus::Completed),
        ];
        let product = product_with_stock(7, 5);

        assert!(check_drift(&product, &ledger).is_ok());
    }

    #[test]
    fn test_check_drift_detects_corruption() {
        use Location::*;
        use TransactionType::*;

        let ledger = vec![txn(
            Purchase,
            10,
            None,
            Some(Warehouse),
            TransferStatus::Completed,
        )];
        // Counter doubled by a historical race
        let product = product_with_stock(20, 0);

        let err = check_drift(&product, &ledger).unwrap_err();
        match err {
            CoreError::StockDrift {
                location,
                stored,
                replayed,
                ..
            } => {
                assert_eq!(location, Location::Warehouse);
                assert_eq!(stored, 20);
                assert_eq!(replayed, 10);
            }
            other => panic!("expected StockDrift, got {other:?}"),
        }
    }
}
