//! # Default Data Seeding
//!
//! Idempotent seed of the records a fresh shop needs on first boot:
//! the reward tier ladder, two starter promo codes, two line discount
//! rules, and the default staff accounts.
//!
//! Every statement is `INSERT OR IGNORE` keyed on a natural unique
//! column, so re-running the seed on every startup is safe and never
//! clobbers operator edits.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;

/// One rung of the default ladder: (name, min_points, earn bps,
/// redemption bps, discount bps).
const DEFAULT_TIERS: [(&str, i64, i64, i64, i64); 4] = [
    ("Bronze", 0, 10000, 100, 0),
    ("Silver", 1000, 12000, 150, 500),
    ("Gold", 5000, 15000, 200, 1000),
    ("Platinum", 15000, 20000, 250, 1500),
];

/// Seeds everything except users (those need hashes from the caller).
pub async fn seed_defaults(pool: &SqlitePool) -> DbResult<()> {
    seed_reward_tiers(pool).await?;
    seed_promo_codes(pool).await?;
    seed_discount_rules(pool).await?;
    info!("Default data seeded");
    Ok(())
}

/// Seeds the reward tier ladder.
pub async fn seed_reward_tiers(pool: &SqlitePool) -> DbResult<()> {
    for (name, min_points, earn, redemption, discount) in DEFAULT_TIERS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO reward_tiers
                (name, min_points, earn_rate_bps, redemption_rate_bps, discount_bps)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(name)
        .bind(min_points)
        .bind(earn)
        .bind(redemption)
        .bind(discount)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Seeds the starter promo codes.
pub async fn seed_promo_codes(pool: &SqlitePool) -> DbResult<()> {
    // (code, kind, value, min order cents, max uses)
    let promos: [(&str, &str, i64, i64, i64); 2] = [
        ("WELCOME10", "percentage", 1000, 10000, 50),
        ("SAVE50", "flat", 5000, 20000, 20),
    ];

    for (code, kind, value, min_order, max_uses) in promos {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO promo_codes
                (id, code, kind, value, min_order_amount_cents, max_uses, used_count,
                 valid_from, valid_until, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, NULL, 1, datetime('now'))
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(code)
        .bind(kind)
        .bind(value)
        .bind(min_order)
        .bind(max_uses)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Seeds the starter line discount rules.
///
/// Rules have no natural unique key, so idempotency is a name guard.
pub async fn seed_discount_rules(pool: &SqlitePool) -> DbResult<()> {
    // (name, category, kind, value, min qty)
    let rules: [(&str, &str, &str, i64, i64); 2] = [
        ("Tea Tuesday", "Tea", "percentage", 1500, 1),
        ("Bulk Coffee", "Coffee", "bulk", 2000, 3),
    ];

    for (name, category, kind, value, min_quantity) in rules {
        sqlx::query(
            r#"
            INSERT INTO line_discount_rules
                (id, name, product_id, category, kind, value, min_quantity, max_quantity,
                 valid_from, valid_until, is_active, created_at)
            SELECT ?1, ?2, NULL, ?3, ?4, ?5, ?6, -1, NULL, NULL, 1, datetime('now')
            WHERE NOT EXISTS (SELECT 1 FROM line_discount_rules WHERE name = ?2)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(category)
        .bind(kind)
        .bind(value)
        .bind(min_quantity)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Seeds a staff account with a caller-supplied hash, if the username is
/// free.
pub async fn seed_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
    role: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO users (id, username, password_hash, role, created_at)
        VALUES (?1, ?2, ?3, ?4, datetime('now'))
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .execute(pool)
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

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        seed_defaults(db.pool()).await.unwrap();
        seed_defaults(db.pool()).await.unwrap();

        assert_eq!(db.rewards().list_tiers().await.unwrap().len(), 4);
        assert_eq!(db.promos().list().await.unwrap().len(), 2);
        assert_eq!(db.discount_rules().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_seed_does_not_clobber_edits() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_defaults(db.pool()).await.unwrap();

        // Operator bumps a promo's usage, then the app restarts
        db.promos().consume_use("WELCOME10").await.unwrap();
        seed_defaults(db.pool()).await.unwrap();

        let promo = db.promos().find_by_code("WELCOME10").await.unwrap().unwrap();
        assert_eq!(promo.used_count, 1);
    }

    #[tokio::test]
    async fn test_seed_user_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        seed_user(db.pool(), "admin", "hash-one", "admin").await.unwrap();
        seed_user(db.pool(), "admin", "hash-two", "admin").await.unwrap();

        let user = db.users().find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "hash-one");
    }
}
