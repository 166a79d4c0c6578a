//! # Stockbook Database Layer
//!
//! SQLite persistence and transactional services for the Stockbook
//! inventory ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          stockbook-db                               │
//! │                                                                     │
//! │  ┌──────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │  pool        │──►│  repositories   │◄──│  services           │   │
//! │  │  DbConfig    │   │  products       │   │  checkout transfer  │   │
//! │  │  Database    │   │  transactions   │   │  purchasing import  │   │
//! │  │  migrations  │   │  sales ...      │   │  inventory reconcile│   │
//! │  └──────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                     │
//! │  business math lives in stockbook-core; this crate owns SQL,        │
//! │  transaction boundaries, and the conditional stock updates          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use stockbook_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockbook.db")).await?;
//! let receipt = db.checkout().checkout(request, "user-1").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CustomerRepository, ProductRepository, PurchaseRepository, SaleRepository,
    TransactionRepository,
};
pub use service::{
    CheckoutItem, CheckoutReceipt, CheckoutRequest, CheckoutService, CustomerInfo, DriftReport,
    ImportBatchRow, ImportReport, ImportRow, ImportRowError, ImportService, InventoryService,
    PurchaseLineRequest, PurchaseRequest, PurchasingService, ReconciliationService,
    TransferService,
};
