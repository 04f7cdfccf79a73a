//! # Refund Repository
//!
//! Database operations for per-line refunds.
//!
//! Quantity validation lives in chai-core; this repository records the
//! refund rows and answers the reporting queries. Orders are never
//! mutated by a refund.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::Refund;

/// Repository for refund database operations.
#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

/// Fields accepted when recording a refund.
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub order_id: String,
    pub item_name: String,
    pub item_price_cents: i64,
    pub original_quantity: i64,
    pub refund_quantity: i64,
    pub refund_amount_cents: i64,
    pub reason: Option<String>,
    pub refunded_by: String,
}

/// Aggregate refund numbers for a reporting window.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundStats {
    pub refund_count: i64,
    pub total_refunded_cents: i64,
    pub items_refunded: i64,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, order_id, item_name, item_price_cents, original_quantity,
           refund_quantity, refund_amount_cents, reason, refunded_by,
           status, created_at
    FROM refunds
"#;

impl RefundRepository {
    /// Creates a new RefundRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    /// Records a refund against an order.
    ///
    /// The order must exist (foreign key). The cumulative cap — prior
    /// refund quantities for this line plus the new one must not exceed
    /// the originally sold quantity — is enforced here by a guarded
    /// insert, so two refunds racing for the same line cannot both slip
    /// under it. A refund rejected by the guard is a [`DbError::Conflict`].
    pub async fn insert(&self, new: NewRefund) -> DbResult<Refund> {
        let refund = Refund {
            id: Uuid::new_v4().to_string(),
            order_id: new.order_id,
            item_name: new.item_name,
            item_price_cents: new.item_price_cents,
            original_quantity: new.original_quantity,
            refund_quantity: new.refund_quantity,
            refund_amount_cents: new.refund_amount_cents,
            reason: new.reason,
            refunded_by: new.refunded_by,
            status: "completed".to_string(),
            created_at: Utc::now(),
        };

        debug!(order = %refund.order_id, item = %refund.item_name, "Recording refund");

        // INSERT ... SELECT with the cap in the WHERE clause: the sum of
        // prior refunds is read and the row written in one statement.
        let result = sqlx::query(
            r#"
            INSERT INTO refunds (id, order_id, item_name, item_price_cents,
                                 original_quantity, refund_quantity, refund_amount_cents,
                                 reason, refunded_by, status, created_at)
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            WHERE (SELECT COALESCE(SUM(refund_quantity), 0)
                   FROM refunds
                   WHERE order_id = ?2 AND item_name = ?3) + ?6 <= ?5
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.order_id)
        .bind(&refund.item_name)
        .bind(refund.item_price_cents)
        .bind(refund.original_quantity)
        .bind(refund.refund_quantity)
        .bind(refund.refund_amount_cents)
        .bind(&refund.reason)
        .bind(&refund.refunded_by)
        .bind(&refund.status)
        .bind(refund.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            // The only FK on refunds is order_id
            sqlx::Error::Database(ref db) if db.message().contains("FOREIGN KEY") => {
                DbError::not_found("Order", &refund.order_id)
            }
            other => DbError::from(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(format!(
                "Refund of {} exceeds the remaining quantity for '{}' on order {}",
                refund.refund_quantity, refund.item_name, refund.order_id
            )));
        }

        Ok(refund)
    }

    /// Lists refunds, newest first, optionally filtered by order and/or
    /// a creation window.
    pub async fn list(
        &self,
        order_id: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<Vec<Refund>> {
        // Absent filters bind NULL, and NULL disables the clause
        let refunds = sqlx::query_as::<_, Refund>(&format!(
            r#"{}
            WHERE (?1 IS NULL OR order_id = ?1)
              AND (?2 IS NULL OR created_at >= ?2)
              AND (?3 IS NULL OR created_at <= ?3)
            ORDER BY created_at DESC
            "#,
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(refunds)
    }

    /// Lists all refunds recorded against one order.
    pub async fn list_by_order(&self, order_id: &str) -> DbResult<Vec<Refund>> {
        let refunds = sqlx::query_as::<_, Refund>(&format!(
            "{} WHERE order_id = ?1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(refunds)
    }

    /// Sum of refund amounts already recorded for one line of an order.
    ///
    /// Used to cap cumulative refunds at the line's original quantity.
    pub async fn refunded_quantity(&self, order_id: &str, item_name: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(refund_quantity) FROM refunds WHERE order_id = ?1 AND item_name = ?2",
        )
        .bind(order_id)
        .bind(item_name)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Aggregate refund stats since a point in time.
    pub async fn stats_since(&self, start: DateTime<Utc>) -> DbResult<RefundStats> {
        let row: (i64, Option<i64>, Option<i64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), SUM(refund_amount_cents), SUM(refund_quantity)
            FROM refunds
            WHERE created_at >= ?1
            "#,
        )
        .bind(start)
        .fetch_one(&self.pool)
        .await?;

        Ok(RefundStats {
            refund_count: row.0,
            total_refunded_cents: row.1.unwrap_or(0),
            items_refunded: row.2.unwrap_or(0),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::order::{generate_receipt_number, CheckoutArgs};
    use chai_core::{Order, OrderDiscountKind, OrderLine, OrderStatus, ServiceType};
    use std::collections::HashMap;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_order(db: &Database) -> String {
        let order = Order {
            id: Uuid::new_v4().to_string(),
            receipt_number: generate_receipt_number(),
            table_label: None,
            service_type: ServiceType::TakeOut,
            lines: vec![OrderLine {
                product_id: "p1".to_string(),
                name: "Chai".to_string(),
                unit_price_cents: 250,
                quantity: 4,
                image: None,
            }],
            line_discounts: HashMap::new(),
            subtotal_cents: 1000,
            discount_cents: 0,
            discount_kind: OrderDiscountKind::None,
            promo_code: None,
            final_total_cents: 1000,
            payment_method: Some("cash".to_string()),
            status: OrderStatus::Completed,
            customer_id: None,
            customer_name: None,
            notes: None,
            is_split_bill: false,
            parent_order_id: None,
            split_number: None,
            created_at: Utc::now(),
        };
        db.orders()
            .checkout(&order, CheckoutArgs::default())
            .await
            .unwrap();
        order.id
    }

    fn refund_of(order_id: &str, qty: i64) -> NewRefund {
        NewRefund {
            order_id: order_id.to_string(),
            item_name: "Chai".to_string(),
            item_price_cents: 250,
            original_quantity: 4,
            refund_quantity: qty,
            refund_amount_cents: 250 * qty,
            reason: Some("cold".to_string()),
            refunded_by: "cashier".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_by_order() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;

        let repo = db.refunds();
        repo.insert(refund_of(&order_id, 2)).await.unwrap();

        let refunds = repo.list_by_order(&order_id).await.unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].refund_amount_cents, 500);
        assert_eq!(refunds[0].status, "completed");

        // Order untouched
        let order = db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.final_total_cents, 1000);
    }

    #[tokio::test]
    async fn test_insert_for_missing_order_is_not_found() {
        let db = test_db().await;
        let err = db
            .refunds()
            .insert(refund_of("no-such-order", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_refunded_quantity_accumulates() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.refunds();

        repo.insert(refund_of(&order_id, 1)).await.unwrap();
        repo.insert(refund_of(&order_id, 2)).await.unwrap();

        assert_eq!(
            repo.refunded_quantity(&order_id, "Chai").await.unwrap(),
            3
        );
        assert_eq!(
            repo.refunded_quantity(&order_id, "Samosa").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_insert_rejects_over_refund() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.refunds();

        repo.insert(refund_of(&order_id, 3)).await.unwrap();

        // 3 of 4 already refunded; 2 more would overshoot
        let err = repo.insert(refund_of(&order_id, 2)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert_eq!(repo.refunded_quantity(&order_id, "Chai").await.unwrap(), 3);

        // The last remaining unit still goes through
        repo.insert(refund_of(&order_id, 1)).await.unwrap();
        assert_eq!(repo.refunded_quantity(&order_id, "Chai").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_stats_since() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let repo = db.refunds();

        repo.insert(refund_of(&order_id, 1)).await.unwrap();
        repo.insert(refund_of(&order_id, 2)).await.unwrap();

        let stats = repo
            .stats_since(Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stats.refund_count, 2);
        assert_eq!(stats.total_refunded_cents, 750);
        assert_eq!(stats.items_refunded, 3);

        let empty = repo
            .stats_since(Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(empty.refund_count, 0);
        assert_eq!(empty.total_refunded_cents, 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let order_id = seed_order(&db).await;
        let other_id = seed_order(&db).await;
        let repo = db.refunds();

        repo.insert(refund_of(&order_id, 1)).await.unwrap();
        repo.insert(refund_of(&other_id, 2)).await.unwrap();

        let all = repo.list(None, None, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let one = repo.list(Some(&order_id), None, None).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].order_id, order_id);
    }
}
