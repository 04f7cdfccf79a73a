//! # Promo Code Repository
//!
//! Database operations for order-level promo codes.
//!
//! Validation is pure (chai-core); this repository owns lookup and the
//! atomic usage consumption at checkout. Consumption is a single
//! conditional UPDATE guarded by the usage limit, so two concurrent
//! checkouts can never push `used_count` past `max_uses`.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::{DiscountKind, PromoCode};

/// Repository for promo code database operations.
#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

/// Fields accepted when creating a promo code.
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub min_order_amount_cents: i64,
    pub max_uses: i64,
    pub valid_from: Option<chrono::DateTime<Utc>>,
    pub valid_until: Option<chrono::DateTime<Utc>>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, kind, value, min_order_amount_cents, max_uses, used_count,
           valid_from, valid_until, is_active, created_at
    FROM promo_codes
"#;

impl PromoRepository {
    /// Creates a new PromoRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    /// Lists all promo codes, newest first.
    pub async fn list(&self) -> DbResult<Vec<PromoCode>> {
        let promos = sqlx::query_as::<_, PromoCode>(&format!(
            "{} ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(promos)
    }

    /// Finds a promo by its code string (case sensitive, as issued).
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<PromoCode>> {
        let promo = sqlx::query_as::<_, PromoCode>(&format!("{} WHERE code = ?1", SELECT_COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(promo)
    }

    /// Inserts a new promo code.
    pub async fn insert(&self, new: NewPromoCode) -> DbResult<PromoCode> {
        let promo = PromoCode {
            id: Uuid::new_v4().to_string(),
            code: new.code,
            kind: new.kind,
            value: new.value,
            min_order_amount_cents: new.min_order_amount_cents,
            max_uses: new.max_uses,
            used_count: 0,
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(code = %promo.code, "Creating promo code");

        sqlx::query(
            r#"
            INSERT INTO promo_codes (id, code, kind, value, min_order_amount_cents,
                                     max_uses, used_count, valid_from, valid_until,
                                     is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&promo.id)
        .bind(&promo.code)
        .bind(promo.kind)
        .bind(promo.value)
        .bind(promo.min_order_amount_cents)
        .bind(promo.max_uses)
        .bind(promo.used_count)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(promo.is_active)
        .bind(promo.created_at)
        .execute(&self.pool)
        .await?;

        Ok(promo)
    }

    /// Consumes one use of a promo code.
    ///
    /// Returns [`DbError::Conflict`] when the code is inactive or its
    /// usage limit has been reached — including the race where another
    /// checkout consumed the last use after this one validated.
    pub async fn consume_use(&self, code: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        consume_use_tx(&mut tx, code).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Conditional usage increment inside an existing transaction.
pub(crate) async fn consume_use_tx(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    code: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE promo_codes
        SET used_count = used_count + 1
        WHERE code = ?1
          AND is_active = 1
          AND (max_uses < 0 OR used_count < max_uses)
        "#,
    )
    .bind(code)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict(format!(
            "promo code '{}' is no longer usable",
            code
        )));
    }

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

    fn promo(code: &str, max_uses: i64) -> NewPromoCode {
        NewPromoCode {
            code: code.to_string(),
            kind: DiscountKind::Flat,
            value: 5000,
            min_order_amount_cents: 0,
            max_uses,
            valid_from: None,
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = test_db().await;
        let repo = db.promos();

        repo.insert(promo("CHAI25", 10)).await.unwrap();
        let found = repo.find_by_code("CHAI25").await.unwrap().unwrap();
        assert_eq!(found.used_count, 0);
        assert_eq!(found.max_uses, 10);

        assert!(repo.find_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.promos();

        repo.insert(promo("CHAI25", 10)).await.unwrap();
        let err = repo.insert(promo("CHAI25", 5)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_consume_use_stops_at_limit() {
        let db = test_db().await;
        let repo = db.promos();

        repo.insert(promo("LIMITED", 2)).await.unwrap();

        repo.consume_use("LIMITED").await.unwrap();
        repo.consume_use("LIMITED").await.unwrap();

        // Third use must fail, count stays pinned at the limit
        let err = repo.consume_use("LIMITED").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let found = repo.find_by_code("LIMITED").await.unwrap().unwrap();
        assert_eq!(found.used_count, 2);
    }

    #[tokio::test]
    async fn test_unlimited_promo_never_conflicts() {
        let db = test_db().await;
        let repo = db.promos();

        repo.insert(promo("FOREVER", -1)).await.unwrap();
        for _ in 0..5 {
            repo.consume_use("FOREVER").await.unwrap();
        }
        let found = repo.find_by_code("FOREVER").await.unwrap().unwrap();
        assert_eq!(found.used_count, 5);
    }
}
