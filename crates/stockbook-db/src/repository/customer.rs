//! # Customer Repository (derived aggregates)
//!
//! Customers are not stored anywhere. A customer is the group of sales
//! sharing a (name, mobile) pair, summarized at query time:
//!
//! ```text
//! SELECT customer_name, customer_mobile,
//!        SUM(due where not fully paid),  -- outstanding balance
//!        COUNT(*), SUM(total), MAX(created_at)
//! FROM sales GROUP BY customer_name, customer_mobile
//! ```
//!
//! Renaming a customer on one sale simply moves that sale into a
//! different group; there is no customer row to migrate.

use sqlx::SqlitePool;

use crate::error::DbResult;
use stockbook_core::CustomerSummary;

const SUMMARY_SELECT: &str = "SELECT \
        customer_name AS name, \
        customer_mobile AS mobile, \
        COALESCE(SUM(CASE WHEN payment_status != 'paid' THEN due_cents ELSE 0 END), 0) \
            AS total_due_cents, \
        COUNT(*) AS total_purchases, \
        COALESCE(SUM(total_cents), 0) AS total_spent_cents, \
        MAX(created_at) AS last_purchase \
     FROM sales";

/// Repository for derived customer aggregates.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists customer summaries, most recently seen first.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<CustomerSummary>> {
        let sql = format!(
            "{SUMMARY_SELECT} \
             GROUP BY customer_name, customer_mobile \
             ORDER BY last_purchase DESC \
             LIMIT ? OFFSET ?"
        );
        let customers = sqlx::query_as::<_, CustomerSummary>(&sql)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Gets one customer's summary, if they have any sales.
    pub async fn get(&self, name: &str, mobile: &str) -> DbResult<Option<CustomerSummary>> {
        let sql = format!(
            "{SUMMARY_SELECT} \
             WHERE customer_name = ? AND customer_mobile = ? \
             GROUP BY customer_name, customer_mobile"
        );
        let customer = sqlx::query_as::<_, CustomerSummary>(&sql)
            .bind(name)
            .bind(mobile)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Customers with an outstanding balance, largest due first.
    pub async fn list_with_dues(&self, limit: u32, offset: u32) -> DbResult<Vec<CustomerSummary>> {
        let sql = format!(
            "{SUMMARY_SELECT} \
             GROUP BY customer_name, customer_mobile \
             HAVING total_due_cents > 0 \
             ORDER BY total_due_cents DESC \
             LIMIT ? OFFSET ?"
        );
        let customers = sqlx::query_as::<_, CustomerSummary>(&sql)
            .bind(super::page_limit(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Counts distinct customer identities.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ( \
                SELECT 1 FROM sales GROUP BY customer_name, customer_mobile \
             )",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::sale::insert_sale_tx;
    use chrono::{Duration, Utc};
    use stockbook_core::checkout::settle;
    use stockbook_core::{Location, Money, PaymentMethod, Sale};
    use uuid::Uuid;

    fn sale_for(name: &str, mobile: &str, total: i64, paid: i64, age_mins: i64) -> Sale {
        let created = Utc::now() - Duration::minutes(age_mins);
        let (due, status) = settle(Money::from_cents(total), Money::from_cents(paid));
        Sale {
            id: Uuid::new_v4().to_string(),
            customer_name: name.to_string(),
            customer_mobile: mobile.to_string(),
            location: Location::Shop,
            subtotal_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: total,
            payment_method: PaymentMethod::Cash,
            amount_paid_cents: paid,
            due_cents: due.cents(),
            payment_status: status,
            notes: None,
            user_id: "user-1".to_string(),
            created_at: created,
            updated_at: created,
        }
    }

    async fn seed(db: &Database, sales: &[Sale]) {
        let mut conn = db.pool().acquire().await.unwrap();
        for sale in sales {
            insert_sale_tx(&mut *conn, sale).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_grouping_and_aggregates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(
            &db,
            &[
                sale_for("Ali", "03001111111", 5000, 5000, 60),
                sale_for("Ali", "03001111111", 3000, 1000, 10),
                sale_for("Sara", "03002222222", 2000, 2000, 30),
            ],
        )
        .await;

        let customers = db.customers().list(20, 0).await.unwrap();
        assert_eq!(customers.len(), 2);

        // Ali made the most recent purchase, so sorts first
        assert_eq!(customers[0].name, "Ali");
        assert_eq!(customers[0].total_purchases, 2);
        assert_eq!(customers[0].total_spent_cents, 8000);
        assert_eq!(customers[0].total_due_cents, 2000);

        assert_eq!(customers[1].name, "Sara");
        assert_eq!(customers[1].total_due_cents, 0);
    }

    #[tokio::test]
    async fn test_same_name_different_mobile_is_two_customers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(
            &db,
            &[
                sale_for("Ali", "03001111111", 1000, 1000, 5),
                sale_for("Ali", "03003333333", 2000, 2000, 5),
            ],
        )
        .await;

        assert_eq!(db.customers().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_dues_listing_excludes_settled() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(
            &db,
            &[
                sale_for("Ali", "03001111111", 5000, 0, 10),
                sale_for("Sara", "03002222222", 2000, 2000, 10),
            ],
        )
        .await;

        let indebted = db.customers().list_with_dues(20, 0).await.unwrap();
        assert_eq!(indebted.len(), 1);
        assert_eq!(indebted[0].name, "Ali");
        assert_eq!(indebted[0].total_due_cents, 5000);
    }

    #[tokio::test]
    async fn test_get_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let found = db.customers().get("Nobody", "000").await.unwrap();
        assert!(found.is_none());
    }
}
