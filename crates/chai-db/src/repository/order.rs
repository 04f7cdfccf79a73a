//! # Order Repository
//!
//! Database operations for completed orders, checkout, and split bills.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Transaction                               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    1. INSERT order (totals already composed by chai-core)               │
//! │    2. promo used?    → conditional UPDATE used_count, guarded by        │
//! │                        the usage limit; zero rows = Conflict            │
//! │    3. customer set?  → read punch-card, apply visit rule, UPDATE        │
//! │    4. dine-in table? → DELETE the pending draft                         │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls the whole sale back: no order without its            │
//! │  side effects, no side effects without the order.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line snapshots and the per-line discount map are stored as JSON TEXT
//! columns; [`OrderRow`] decodes them on the way out.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{customer, promo};
use chai_core::{
    LineDiscountMap, Order, OrderDiscountKind, OrderLine, OrderStatus, ServiceType,
};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

/// Checkout side effects that must commit with the order.
#[derive(Debug, Clone, Default)]
pub struct CheckoutArgs {
    /// Promo code to consume one use of.
    pub consume_promo: Option<String>,
    /// Customer to record a visit for.
    pub visit_customer: Option<String>,
    /// Dine-in table whose pending draft this checkout settles.
    pub clear_table: Option<String>,
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Raw row with JSON columns still encoded.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    receipt_number: String,
    table_label: Option<String>,
    service_type: ServiceType,
    items: String,
    line_discounts: String,
    subtotal_cents: i64,
    discount_cents: i64,
    discount_kind: OrderDiscountKind,
    promo_code: Option<String>,
    final_total_cents: i64,
    payment_method: Option<String>,
    status: OrderStatus,
    customer_id: Option<String>,
    customer_name: Option<String>,
    notes: Option<String>,
    is_split_bill: bool,
    parent_order_id: Option<String>,
    split_number: Option<i64>,
    created_at: chrono::DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DbResult<Order> {
        let lines: Vec<OrderLine> = serde_json::from_str(&self.items)?;
        let line_discounts: LineDiscountMap = serde_json::from_str(&self.line_discounts)?;

        Ok(Order {
            id: self.id,
            receipt_number: self.receipt_number,
            table_label: self.table_label,
            service_type: self.service_type,
            lines,
            line_discounts,
            subtotal_cents: self.subtotal_cents,
            discount_cents: self.discount_cents,
            discount_kind: self.discount_kind,
            promo_code: self.promo_code,
            final_total_cents: self.final_total_cents,
            payment_method: self.payment_method,
            status: self.status,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            notes: self.notes,
            is_split_bill: self.is_split_bill,
            parent_order_id: self.parent_order_id,
            split_number: self.split_number,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, receipt_number, table_label, service_type, items, line_discounts,
           subtotal_cents, discount_cents, discount_kind, promo_code,
           final_total_cents, payment_method, status, customer_id, customer_name,
           notes, is_split_bill, parent_order_id, split_number, created_at
    FROM orders
"#;

/// Generates a human-readable receipt number.
///
/// Uniqueness comes from the UUID suffix; the date prefix is for staff
/// reading receipts aloud.
pub fn generate_receipt_number() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("CH-{}-{}", date, &suffix[..6].to_uppercase())
}

// =============================================================================
// Repository
// =============================================================================

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// Lists all orders, newest first.
    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{} ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{} WHERE customer_id = ?1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Completes a checkout: persists the order and its side effects in
    /// one transaction. See the module docs for the exact sequence.
    pub async fn checkout(&self, order: &Order, args: CheckoutArgs) -> DbResult<()> {
        debug!(id = %order.id, receipt = %order.receipt_number, "Checking out order");

        let mut tx = self.pool.begin().await?;

        insert_order_tx(&mut tx, order).await?;

        if let Some(code) = &args.consume_promo {
            promo::consume_use_tx(&mut tx, code).await?;
        }

        if let Some(customer_id) = &args.visit_customer {
            customer::record_visit_tx(&mut tx, customer_id).await?;
        }

        if let Some(table_id) = &args.clear_table {
            sqlx::query("DELETE FROM pending_table_orders WHERE table_id = ?1")
                .bind(table_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Splits a parent order into child orders, atomically.
    ///
    /// The caller has already validated the partition through chai-core
    /// and composed the children (own IDs, split numbers, totals). The
    /// parent is flagged but its total is untouched.
    pub async fn create_splits(&self, parent_id: &str, children: &[Order]) -> DbResult<()> {
        debug!(parent = %parent_id, groups = children.len(), "Creating split bills");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE orders SET is_split_bill = 1 WHERE id = ?1")
            .bind(parent_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", parent_id));
        }

        for child in children {
            insert_order_tx(&mut tx, child).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Lists the children of a split parent, in split order.
    pub async fn list_children(&self, parent_id: &str) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{} WHERE parent_order_id = ?1 ORDER BY split_number",
            SELECT_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Lists all split parents, newest first.
    pub async fn list_split_parents(&self) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{} WHERE is_split_bill = 1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Replaces the mutable fields of an order (edit + recompute flow).
    ///
    /// Totals arrive recomputed by chai-core; this never trusts
    /// client-supplied totals.
    pub async fn update(&self, order: &Order) -> DbResult<()> {
        let items = serde_json::to_string(&order.lines)?;
        let line_discounts = serde_json::to_string(&order.line_discounts)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET table_label = ?2, service_type = ?3, items = ?4, line_discounts = ?5,
                subtotal_cents = ?6, discount_cents = ?7, discount_kind = ?8,
                promo_code = ?9, final_total_cents = ?10, payment_method = ?11,
                status = ?12, customer_id = ?13, customer_name = ?14, notes = ?15
            WHERE id = ?1
            "#,
        )
        .bind(&order.id)
        .bind(&order.table_label)
        .bind(order.service_type)
        .bind(&items)
        .bind(&line_discounts)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.discount_kind)
        .bind(&order.promo_code)
        .bind(order.final_total_cents)
        .bind(&order.payment_method)
        .bind(order.status)
        .bind(&order.customer_id)
        .bind(&order.customer_name)
        .bind(&order.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", &order.id));
        }

        Ok(())
    }

    /// Deletes one order (its refunds cascade).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        Ok(())
    }

    /// Admin bulk reset: deletes all orders, refunds and pending drafts.
    pub async fn reset_history(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM refunds").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM orders").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM pending_table_orders")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Inserts a fully composed order inside an existing transaction.
async fn insert_order_tx(tx: &mut sqlx::Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
    let items = serde_json::to_string(&order.lines)?;
    let line_discounts = serde_json::to_string(&order.line_discounts)?;

    sqlx::query(
        r#"
        INSERT INTO orders (id, receipt_number, table_label, service_type, items,
                            line_discounts, subtotal_cents, discount_cents, discount_kind,
                            promo_code, final_total_cents, payment_method, status,
                            customer_id, customer_name, notes, is_split_bill,
                            parent_order_id, split_number, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
        "#,
    )
    .bind(&order.id)
    .bind(&order.receipt_number)
    .bind(&order.table_label)
    .bind(order.service_type)
    .bind(&items)
    .bind(&line_discounts)
    .bind(order.subtotal_cents)
    .bind(order.discount_cents)
    .bind(order.discount_kind)
    .bind(&order.promo_code)
    .bind(order.final_total_cents)
    .bind(&order.payment_method)
    .bind(order.status)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.notes)
    .bind(order.is_split_bill)
    .bind(&order.parent_order_id)
    .bind(order.split_number)
    .bind(order.created_at)
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
    use crate::repository::promo::NewPromoCode;
    use chai_core::DiscountKind;
    use std::collections::HashMap;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn line(name: &str, price: i64, qty: i64) -> OrderLine {
        OrderLine {
            product_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            unit_price_cents: price,
            quantity: qty,
            image: None,
        }
    }

    fn order(lines: Vec<OrderLine>) -> Order {
        let subtotal: i64 = lines
            .iter()
            .map(|l| l.unit_price_cents * l.quantity)
            .sum();
        Order {
            id: Uuid::new_v4().to_string(),
            receipt_number: generate_receipt_number(),
            table_label: None,
            service_type: ServiceType::TakeOut,
            lines,
            line_discounts: HashMap::new(),
            subtotal_cents: subtotal,
            discount_cents: 0,
            discount_kind: OrderDiscountKind::None,
            promo_code: None,
            final_total_cents: subtotal,
            payment_method: Some("cash".to_string()),
            status: OrderStatus::Completed,
            customer_id: None,
            customer_name: None,
            notes: None,
            is_split_bill: false,
            parent_order_id: None,
            split_number: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_checkout_and_roundtrip() {
        let db = test_db().await;
        let repo = db.orders();

        let o = order(vec![line("Chai", 250, 2), line("Samosa", 150, 1)]);
        repo.checkout(&o, CheckoutArgs::default()).await.unwrap();

        let fetched = repo.get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(fetched.lines.len(), 2);
        assert_eq!(fetched.final_total_cents, 650);
        assert_eq!(fetched.lines[0].name, "Chai");
    }

    #[tokio::test]
    async fn test_checkout_consumes_promo_atomically() {
        let db = test_db().await;

        db.promos()
            .insert(NewPromoCode {
                code: "ONEUSE".to_string(),
                kind: DiscountKind::Flat,
                value: 50,
                min_order_amount_cents: 0,
                max_uses: 1,
                valid_from: None,
                valid_until: None,
            })
            .await
            .unwrap();

        let repo = db.orders();
        let first = order(vec![line("Chai", 250, 1)]);
        repo.checkout(
            &first,
            CheckoutArgs {
                consume_promo: Some("ONEUSE".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Second checkout with the exhausted code fails AND leaves no order
        let second = order(vec![line("Chai", 250, 1)]);
        let err = repo
            .checkout(
                &second,
                CheckoutArgs {
                    consume_promo: Some("ONEUSE".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        assert!(repo.get_by_id(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checkout_records_visit() {
        let db = test_db().await;
        let customer = db.customers().insert("Ali", "0300-1112223").await.unwrap();

        let mut o = order(vec![line("Chai", 250, 1)]);
        o.customer_id = Some(customer.id.clone());
        db.orders()
            .checkout(
                &o,
                CheckoutArgs {
                    visit_customer: Some(customer.id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = db.customers().get_by_id(&customer.id).await.unwrap().unwrap();
        assert_eq!(after.visits, 1);
    }

    #[tokio::test]
    async fn test_split_children_and_parent_flag() {
        let db = test_db().await;
        let repo = db.orders();

        let parent = order(vec![line("Chai", 250, 2)]);
        repo.checkout(&parent, CheckoutArgs::default()).await.unwrap();

        let mut child1 = order(vec![line("Chai", 250, 1)]);
        child1.parent_order_id = Some(parent.id.clone());
        child1.split_number = Some(1);
        let mut child2 = order(vec![line("Chai", 250, 1)]);
        child2.parent_order_id = Some(parent.id.clone());
        child2.split_number = Some(2);

        repo.create_splits(&parent.id, &[child1, child2]).await.unwrap();

        let flagged = repo.get_by_id(&parent.id).await.unwrap().unwrap();
        assert!(flagged.is_split_bill);
        // Parent total untouched
        assert_eq!(flagged.final_total_cents, 500);

        let children = repo.list_children(&parent.id).await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].split_number, Some(1));

        let parents = repo.list_split_parents().await.unwrap();
        assert_eq!(parents.len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_lines_and_totals() {
        let db = test_db().await;
        let repo = db.orders();

        let mut o = order(vec![line("Chai", 250, 1)]);
        repo.checkout(&o, CheckoutArgs::default()).await.unwrap();

        o.lines = vec![line("Chai", 250, 3)];
        o.subtotal_cents = 750;
        o.final_total_cents = 750;
        repo.update(&o).await.unwrap();

        let fetched = repo.get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(fetched.final_total_cents, 750);
        assert_eq!(fetched.lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_reset_history() {
        let db = test_db().await;
        let repo = db.orders();

        let o = order(vec![line("Chai", 250, 1)]);
        repo.checkout(&o, CheckoutArgs::default()).await.unwrap();

        repo.reset_history().await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }
}
