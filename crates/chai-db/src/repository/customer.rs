//! # Customer Repository
//!
//! Database operations for registered customers and the visit punch-card.
//!
//! Creating a customer also creates their rewards account row in the same
//! transaction, so redemption always has a row to debit.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::{loyalty, Customer};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists all customers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, visits, free_item_eligible, created_at
            FROM customers
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, phone, visits, free_item_eligible, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Registers a customer and opens their rewards account atomically.
    ///
    /// Phone numbers are unique; a duplicate surfaces as
    /// [`DbError::UniqueViolation`].
    pub async fn insert(&self, name: &str, phone: &str) -> DbResult<Customer> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            visits: 0,
            free_item_eligible: false,
            created_at: now,
        };

        debug!(id = %customer.id, "Registering customer");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, visits, free_item_eligible, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.visits)
        .bind(customer.free_item_eligible)
        .bind(customer.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO customer_rewards (customer_id, points_balance, total_points_earned,
                                          total_points_redeemed, tier, updated_at)
            VALUES (?1, 0, 0, 0, 'Bronze', ?2)
            "#,
        )
        .bind(&customer.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(customer)
    }

    /// Updates a customer's name and phone.
    pub async fn update(&self, id: &str, name: &str, phone: &str) -> DbResult<Customer> {
        let result = sqlx::query("UPDATE customers SET name = ?2, phone = ?3 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .bind(phone)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Deletes a customer (rewards account and ledger cascade).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Redeems the free item: resets the punch-card to (0, false).
    ///
    /// The caller validates eligibility through core first; this is the
    /// storage effect only.
    pub async fn reset_punch_card(&self, id: &str) -> DbResult<Customer> {
        let result =
            sqlx::query("UPDATE customers SET visits = 0, free_item_eligible = 0 WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Admin maintenance: zeroes every punch-card.
    pub async fn reset_all_visits(&self) -> DbResult<u64> {
        let result = sqlx::query("UPDATE customers SET visits = 0, free_item_eligible = 0")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Records one visit inside an existing transaction.
///
/// Eligibility flips in the same UPDATE that reaches the threshold, per
/// the punch-card rules in chai-core.
pub(crate) async fn record_visit_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    customer_id: &str,
) -> DbResult<()> {
    let row: Option<(i64, bool)> =
        sqlx::query_as("SELECT visits, free_item_eligible FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_optional(&mut **tx)
            .await?;

    let (visits, eligible) = row.ok_or_else(|| DbError::not_found("Customer", customer_id))?;
    let (new_visits, new_eligible) = loyalty::record_visit(visits, eligible);

    sqlx::query("UPDATE customers SET visits = ?2, free_item_eligible = ?3 WHERE id = ?1")
        .bind(customer_id)
        .bind(new_visits)
        .bind(new_eligible)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_creates_rewards_account() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();

        let account = db
            .rewards()
            .get_account(&customer.id)
            .await
            .unwrap()
            .expect("rewards account should exist");
        assert_eq!(account.points_balance, 0);
        assert_eq!(account.tier, "Bronze");
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let db = test_db().await;
        let repo = db.customers();

        repo.insert("Ali", "0300-1234567").await.unwrap();
        let err = repo.insert("Sara", "0300-1234567").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_visit_recording_flips_eligibility_at_threshold() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();

        for _ in 0..9 {
            let mut tx = db.pool().begin().await.unwrap();
            record_visit_tx(&mut tx, &customer.id).await.unwrap();
            tx.commit().await.unwrap();
        }
        let after_nine = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(after_nine.visits, 9);
        assert!(!after_nine.free_item_eligible);

        let mut tx = db.pool().begin().await.unwrap();
        record_visit_tx(&mut tx, &customer.id).await.unwrap();
        tx.commit().await.unwrap();

        let after_ten = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(after_ten.visits, 10);
        assert!(after_ten.free_item_eligible);
    }

    #[tokio::test]
    async fn test_reset_punch_card() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();

        for _ in 0..10 {
            let mut tx = db.pool().begin().await.unwrap();
            record_visit_tx(&mut tx, &customer.id).await.unwrap();
            tx.commit().await.unwrap();
        }

        let reset = db.customers().reset_punch_card(&customer.id).await.unwrap();
        assert_eq!(reset.visits, 0);
        assert!(!reset.free_item_eligible);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();

        db.customers().delete(&customer.id).await.unwrap();
        assert!(db
            .rewards()
            .get_account(&customer.id)
            .await
            .unwrap()
            .is_none());
    }
}
