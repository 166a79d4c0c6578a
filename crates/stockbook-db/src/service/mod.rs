//! # Services
//!
//! Business operations, each executed as one SQL transaction composed
//! from the repositories' `*_tx` building blocks. The rule of thumb:
//! if an operation touches a stock counter, the matching ledger row is
//! written in the same transaction (reconciliation repair being the
//! one documented exception).

pub mod checkout;
pub mod import;
pub mod inventory;
pub mod purchasing;
pub mod reconcile;
pub mod transfer;

pub use checkout::{CheckoutItem, CheckoutReceipt, CheckoutRequest, CheckoutService, CustomerInfo};
pub use import::{ImportBatchRow, ImportReport, ImportRow, ImportRowError, ImportService};
pub use inventory::InventoryService;
pub use purchasing::{PurchaseLineRequest, PurchaseRequest, PurchasingService};
pub use reconcile::{DriftReport, ReconciliationService};
pub use transfer::TransferService;
