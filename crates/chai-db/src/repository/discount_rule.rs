//! # Discount Rule Repository
//!
//! Database operations for automatic line discount rules.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::{DiscountRule, RuleKind};

/// Repository for discount rule database operations.
#[derive(Debug, Clone)]
pub struct DiscountRuleRepository {
    pool: SqlitePool,
}

/// Fields accepted when creating a discount rule.
#[derive(Debug, Clone)]
pub struct NewDiscountRule {
    pub name: String,
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub kind: RuleKind,
    pub value: i64,
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, product_id, category, kind, value, min_quantity, max_quantity,
           valid_from, valid_until, is_active, created_at
    FROM line_discount_rules
"#;

impl DiscountRuleRepository {
    /// Creates a new DiscountRuleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRuleRepository { pool }
    }

    /// Lists all rules, newest first.
    pub async fn list(&self) -> DbResult<Vec<DiscountRule>> {
        let rules = sqlx::query_as::<_, DiscountRule>(&format!(
            "{} ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    /// Lists only active rules, for pricing.
    pub async fn list_active(&self) -> DbResult<Vec<DiscountRule>> {
        let rules =
            sqlx::query_as::<_, DiscountRule>(&format!("{} WHERE is_active = 1", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        Ok(rules)
    }

    /// Inserts a new rule.
    pub async fn insert(&self, new: NewDiscountRule) -> DbResult<DiscountRule> {
        let rule = DiscountRule {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            product_id: new.product_id,
            category: new.category,
            kind: new.kind,
            value: new.value,
            min_quantity: new.min_quantity,
            max_quantity: new.max_quantity,
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(name = %rule.name, "Creating discount rule");

        sqlx::query(
            r#"
            INSERT INTO line_discount_rules (id, name, product_id, category, kind, value,
                                             min_quantity, max_quantity, valid_from,
                                             valid_until, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.name)
        .bind(&rule.product_id)
        .bind(&rule.category)
        .bind(rule.kind)
        .bind(rule.value)
        .bind(rule.min_quantity)
        .bind(rule.max_quantity)
        .bind(rule.valid_from)
        .bind(rule.valid_until)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(rule)
    }

    /// Deactivates a rule (kept for history, excluded from pricing).
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE line_discount_rules SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountRule", id));
        }

        Ok(())
    }
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

    fn tuesday_rule() -> NewDiscountRule {
        NewDiscountRule {
            name: "Tea Tuesday".to_string(),
            product_id: None,
            category: Some("Tea".to_string()),
            kind: RuleKind::Percentage,
            value: 1500,
            min_quantity: 1,
            max_quantity: -1,
            valid_from: None,
            valid_until: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = test_db().await;
        let repo = db.discount_rules();

        repo.insert(tuesday_rule()).await.unwrap();
        let rules = repo.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].kind, RuleKind::Percentage);
        assert_eq!(rules[0].value, 1500);
    }

    #[tokio::test]
    async fn test_deactivated_excluded_from_active() {
        let db = test_db().await;
        let repo = db.discount_rules();

        let rule = repo.insert(tuesday_rule()).await.unwrap();
        repo.deactivate(&rule.id).await.unwrap();

        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.list_active().await.unwrap().is_empty());
    }
}
