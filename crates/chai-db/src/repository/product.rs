//! # Product Repository
//!
//! Database operations for the menu catalog.
//!
//! Products are hard-deletable: order lines carry snapshots, so deleting
//! a product never corrupts history.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Fields accepted when creating or updating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the whole catalog, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, category, image, description,
                   created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, category, image, description,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product, returning it with a generated ID.
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            price_cents: new.price_cents,
            category: new.category,
            image: new.image,
            description: new.description,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, category, image, description,
                                  created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.category)
        .bind(&product.image)
        .bind(&product.description)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product.
    pub async fn update(&self, id: &str, new: NewProduct) -> DbResult<Product> {
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, price_cents = ?3, category = ?4, image = ?5,
                description = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&new.name)
        .bind(new.price_cents)
        .bind(&new.category)
        .bind(&new.image)
        .bind(&new.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Map of product id → category for the whole catalog.
    ///
    /// Used at pricing time to resolve category-scoped rules against
    /// line snapshots. Lines whose product was deleted simply don't
    /// match category rules.
    pub async fn category_map(&self) -> DbResult<HashMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, category FROM products")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
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

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn chai(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price_cents: price,
            category: "Tea".to_string(),
            image: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(chai("Doodh Patti", 250)).await.unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Doodh Patti");
        assert_eq!(fetched.price_cents, 250);
        assert_eq!(fetched.category, "Tea");
    }

    #[tokio::test]
    async fn test_update() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(chai("Kahwa", 200)).await.unwrap();
        let mut update = chai("Kashmiri Kahwa", 300);
        update.description = Some("Green tea with saffron".to_string());

        let updated = repo.update(&created.id, update).await.unwrap();
        assert_eq!(updated.name, "Kashmiri Kahwa");
        assert_eq!(updated.price_cents, 300);
        assert!(updated.description.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = test_db().await;
        let err = db
            .products()
            .update("no-such-id", chai("x", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.insert(chai("Chai", 100)).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
        assert!(repo.delete(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_category_map() {
        let db = test_db().await;
        let repo = db.products();

        let p1 = repo.insert(chai("Chai", 100)).await.unwrap();
        let mut coffee = chai("Espresso", 400);
        coffee.category = "Coffee".to_string();
        let p2 = repo.insert(coffee).await.unwrap();

        let map = repo.category_map().await.unwrap();
        assert_eq!(map.get(&p1.id).unwrap(), "Tea");
        assert_eq!(map.get(&p2.id).unwrap(), "Coffee");
    }
}
