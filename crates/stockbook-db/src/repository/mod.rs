//! # Repositories
//!
//! Row-level database access, one module per aggregate. Repositories do
//! not orchestrate business operations; that is the job of the service
//! layer, which composes the `*_tx` variants inside SQL transactions.

pub mod customer;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod transaction;

pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use purchase::PurchaseRepository;
pub use sale::SaleRepository;
pub use transaction::TransactionRepository;

use stockbook_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Clamps a caller-supplied page size.
///
/// Zero falls back to [`DEFAULT_PAGE_SIZE`]; anything above
/// [`MAX_PAGE_SIZE`] is capped. Every paginated listing goes through
/// this, so no caller can request an unbounded page.
pub(crate) fn page_limit(limit: u32) -> u32 {
    if limit == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        limit.min(MAX_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_clamps() {
        assert_eq!(page_limit(0), DEFAULT_PAGE_SIZE);
        assert_eq!(page_limit(25), 25);
        assert_eq!(page_limit(MAX_PAGE_SIZE), MAX_PAGE_SIZE);
        assert_eq!(page_limit(10_000), MAX_PAGE_SIZE);
    }
}
