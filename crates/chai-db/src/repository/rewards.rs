//! # Rewards Repository
//!
//! Database operations for points accounts, the tier ladder, and the
//! points ledger.
//!
//! The `customer_rewards` row is a fast-read balance; the
//! `point_transactions` ledger is the history. Every balance change
//! writes both inside one transaction. Redemption debits through a
//! conditional UPDATE so two concurrent redemptions can never drive the
//! balance negative.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::{
    loyalty, PointTransaction, PointTransactionKind, RewardTier, RewardsAccount,
};

/// Repository for rewards database operations.
#[derive(Debug, Clone)]
pub struct RewardsRepository {
    pool: SqlitePool,
}

/// A customer joined with their rewards account, for the loyalty roster
/// view.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWithRewards {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub visits: i64,
    pub free_item_eligible: bool,
    pub points_balance: i64,
    pub total_points_earned: i64,
    pub total_points_redeemed: i64,
    pub tier: String,
}

impl RewardsRepository {
    /// Creates a new RewardsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RewardsRepository { pool }
    }

    /// Gets a customer's rewards account.
    pub async fn get_account(&self, customer_id: &str) -> DbResult<Option<RewardsAccount>> {
        let account = sqlx::query_as::<_, RewardsAccount>(
            r#"
            SELECT customer_id, points_balance, total_points_earned,
                   total_points_redeemed, tier, updated_at
            FROM customer_rewards
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists the tier ladder, lowest rung first.
    pub async fn list_tiers(&self) -> DbResult<Vec<RewardTier>> {
        let tiers = sqlx::query_as::<_, RewardTier>(
            r#"
            SELECT name, min_points, earn_rate_bps, redemption_rate_bps, discount_bps
            FROM reward_tiers
            ORDER BY min_points
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tiers)
    }

    /// Lists every customer with their rewards account attached.
    pub async fn list_customers_with_rewards(&self) -> DbResult<Vec<CustomerWithRewards>> {
        let rows = sqlx::query_as::<_, CustomerWithRewards>(
            r#"
            SELECT c.id, c.name, c.phone, c.visits, c.free_item_eligible,
                   r.points_balance, r.total_points_earned, r.total_points_redeemed,
                   r.tier
            FROM customers c
            JOIN customer_rewards r ON r.customer_id = c.id
            ORDER BY c.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists a customer's points ledger, newest first.
    pub async fn list_transactions(&self, customer_id: &str) -> DbResult<Vec<PointTransaction>> {
        let transactions = sqlx::query_as::<_, PointTransaction>(
            r#"
            SELECT id, customer_id, order_id, kind, points, description, created_at
            FROM point_transactions
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(transactions)
    }

    /// Redeems points: debits the balance, bumps the redeemed total, and
    /// appends a negative `redeemed` ledger row, atomically.
    ///
    /// Returns the account after the debit. A concurrent redemption that
    /// drains the balance first surfaces as
    /// [`chai_core::CoreError::InsufficientBalance`] via the pre-read, or
    /// [`DbError::Conflict`] when the race lands between read and write.
    pub async fn redeem_points(
        &self,
        customer_id: &str,
        points: i64,
        description: Option<&str>,
    ) -> DbResult<RewardsAccount> {
        debug!(customer = %customer_id, points, "Redeeming points");

        let mut tx = self.pool.begin().await?;

        let balance: Option<i64> =
            sqlx::query_scalar("SELECT points_balance FROM customer_rewards WHERE customer_id = ?1")
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        let balance = balance.ok_or_else(|| DbError::not_found("RewardsAccount", customer_id))?;

        // Pure validation (positive amount, sufficient balance)
        loyalty::redeem_points(balance, points).map_err(|e| DbError::conflict(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE customer_rewards
            SET points_balance = points_balance - ?2,
                total_points_redeemed = total_points_redeemed + ?2,
                updated_at = ?3
            WHERE customer_id = ?1
              AND points_balance >= ?2
            "#,
        )
        .bind(customer_id)
        .bind(points)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "points balance for customer '{}' changed during redemption",
                customer_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO point_transactions (id, customer_id, order_id, kind, points,
                                            description, created_at)
            VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(customer_id)
        .bind(PointTransactionKind::Redeemed)
        .bind(-points)
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_account(customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("RewardsAccount", customer_id))
    }

    /// Credits points (manual bonus or adjustment) and re-ranks the tier
    /// from the lifetime earned total.
    pub async fn add_points(
        &self,
        customer_id: &str,
        points: i64,
        kind: PointTransactionKind,
        order_id: Option<&str>,
        description: Option<&str>,
    ) -> DbResult<RewardsAccount> {
        debug!(customer = %customer_id, points, "Crediting points");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE customer_rewards
            SET points_balance = points_balance + ?2,
                total_points_earned = total_points_earned + ?2,
                updated_at = ?3
            WHERE customer_id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(points)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("RewardsAccount", customer_id));
        }

        sqlx::query(
            r#"
            INSERT INTO point_transactions (id, customer_id, order_id, kind, points,
                                            description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(customer_id)
        .bind(order_id)
        .bind(kind)
        .bind(points)
        .bind(description)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        // Tier follows lifetime earned, never the spendable balance
        let tiers = sqlx::query_as::<_, RewardTier>(
            "SELECT name, min_points, earn_rate_bps, redemption_rate_bps, discount_bps \
             FROM reward_tiers ORDER BY min_points",
        )
        .fetch_all(&mut *tx)
        .await?;
        let total_earned: i64 = sqlx::query_scalar(
            "SELECT total_points_earned FROM customer_rewards WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;
        if let Some(tier) = loyalty::tier_for_points(&tiers, total_earned) {
            sqlx::query("UPDATE customer_rewards SET tier = ?2 WHERE customer_id = ?1")
                .bind(customer_id)
                .bind(&tier.name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_account(customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("RewardsAccount", customer_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::seed;

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed::seed_reward_tiers(db.pool()).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_tier_ladder_seeded() {
        let db = test_db().await;
        let tiers = db.rewards().list_tiers().await.unwrap();
        assert_eq!(tiers.len(), 4);
        assert_eq!(tiers[0].name, "Bronze");
        assert_eq!(tiers[3].name, "Platinum");
    }

    #[tokio::test]
    async fn test_add_then_redeem_points() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();
        let repo = db.rewards();

        let account = repo
            .add_points(
                &customer.id,
                500,
                PointTransactionKind::Bonus,
                None,
                Some("welcome bonus"),
            )
            .await
            .unwrap();
        assert_eq!(account.points_balance, 500);
        assert_eq!(account.total_points_earned, 500);

        let account = repo
            .redeem_points(&customer.id, 200, Some("applied to order"))
            .await
            .unwrap();
        assert_eq!(account.points_balance, 300);
        assert_eq!(account.total_points_redeemed, 200);
        // Lifetime earned untouched by redemption
        assert_eq!(account.total_points_earned, 500);

        let ledger = repo.list_transactions(&customer.id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        let redeemed = ledger
            .iter()
            .find(|t| t.kind == PointTransactionKind::Redeemed)
            .unwrap();
        assert_eq!(redeemed.points, -200);
    }

    #[tokio::test]
    async fn test_redeem_more_than_balance_fails() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();
        let repo = db.rewards();

        repo.add_points(&customer.id, 100, PointTransactionKind::Bonus, None, None)
            .await
            .unwrap();

        assert!(repo.redeem_points(&customer.id, 101, None).await.is_err());

        // Balance and ledger unchanged
        let account = repo.get_account(&customer.id).await.unwrap().unwrap();
        assert_eq!(account.points_balance, 100);
        assert_eq!(repo.list_transactions(&customer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tier_promotion_on_earn() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1234567").await.unwrap();
        let repo = db.rewards();

        let account = repo
            .add_points(&customer.id, 1200, PointTransactionKind::Earned, None, None)
            .await
            .unwrap();
        assert_eq!(account.tier, "Silver");

        let account = repo
            .add_points(&customer.id, 4000, PointTransactionKind::Earned, None, None)
            .await
            .unwrap();
        assert_eq!(account.tier, "Gold");
    }

    #[tokio::test]
    async fn test_customers_with_rewards_join() {
        let db = test_db().await;
        db.customers().insert("Ali", "0300-1234567").await.unwrap();
        db.customers().insert("Sara", "0300-7654321").await.unwrap();

        let roster = db.rewards().list_customers_with_rewards().await.unwrap();
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().all(|c| c.tier == "Bronze"));
    }
}
