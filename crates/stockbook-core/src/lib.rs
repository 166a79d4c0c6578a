//! # stockbook-core: Pure Business Logic for Stockbook
//!
//! This crate is the **heart** of Stockbook's inventory ledger. It
//! contains all business logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Stockbook Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │            ★ stockbook-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │  ┌────────┐ ┌─────────┐ ┌───────┐ ┌──────────┐ ┌──────────┐   │  │
//! │  │  │ types  │ │ costing │ │ stock │ │ transfer │ │ checkout │   │  │
//! │  │  │Product │ │ avg cost│ │replay │ │  state   │ │ pricing  │   │  │
//! │  │  │ Ledger │ │ of goods│ │ drift │ │ machine  │ │ settle   │   │  │
//! │  │  └────────┘ └─────────┘ └───────┘ └──────────┘ └──────────┘   │  │
//! │  │                                                               │  │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │  │
//! │  └───────────────────────────────┬───────────────────────────────┘  │
//! │                                  │                                  │
//! │  ┌───────────────────────────────▼───────────────────────────────┐  │
//! │  │                stockbook-db (Database Layer)                  │  │
//! │  │        SQLite repositories, migrations, ledger services       │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Batch, InventoryTransaction, Sale, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`costing`] - Batch ledger: weighted average cost of goods
//! - [`stock`] - Location counters, ledger replay, drift detection
//! - [`transfer`] - Transfer status state machine
//! - [`checkout`] - Line pricing, totals, payment settlement
//! - [`validation`] - Field-level validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use stockbook_core::checkout::settle;
//! use stockbook_core::money::Money;
//! use stockbook_core::types::PaymentStatus;
//!
//! let (due, status) = settle(Money::from_cents(2500), Money::from_cents(1000));
//! assert_eq!(due.cents(), 1500);
//! assert_eq!(status, PaymentStatus::Partial);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod costing;
pub mod error;
pub mod money;
pub mod stock;
pub mod transfer;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use stockbook_core::Money` instead of
// `use stockbook_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use stock::StockLevels;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted on a single checkout/purchase line
///
/// Guards against fat-finger entry (10000 instead of 100); bulk intake
/// beyond this arrives as multiple batches.
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// Maximum lines in a single sale or purchase document
pub const MAX_SALE_LINES: usize = 100;

/// Default page size for paginated listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Hard cap for paginated listings (including the customer group-by)
pub const MAX_PAGE_SIZE: u32 = 100;
