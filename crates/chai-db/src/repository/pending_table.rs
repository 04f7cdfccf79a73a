//! # Pending Table Repository
//!
//! Database operations for open dine-in table drafts.
//!
//! A table holds at most one draft; saving again replaces it in place
//! via an upsert keyed on `table_id`, so two terminals updating the same
//! table never produce duplicate rows.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use chai_core::{LineDiscountMap, OrderLine, OrderStatus, PendingTableOrder};

/// Repository for pending table order database operations.
#[derive(Debug, Clone)]
pub struct PendingTableRepository {
    pool: SqlitePool,
}

/// Fields accepted when saving a table draft.
#[derive(Debug, Clone)]
pub struct SaveTableDraft {
    pub table_id: String,
    pub table_name: String,
    pub lines: Vec<OrderLine>,
    pub line_discounts: LineDiscountMap,
    pub total_cents: i64,
}

/// Raw row with JSON columns still encoded.
#[derive(Debug, sqlx::FromRow)]
struct PendingRow {
    id: String,
    table_id: String,
    table_name: String,
    items: String,
    line_discounts: String,
    total_cents: i64,
    status: OrderStatus,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl PendingRow {
    fn into_pending(self) -> DbResult<PendingTableOrder> {
        let lines: Vec<OrderLine> = serde_json::from_str(&self.items)?;
        let line_discounts: LineDiscountMap = serde_json::from_str(&self.line_discounts)?;

        Ok(PendingTableOrder {
            id: self.id,
            table_id: self.table_id,
            table_name: self.table_name,
            lines,
            line_discounts,
            total_cents: self.total_cents,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, table_id, table_name, items, line_discounts, total_cents,
           status, created_at, updated_at
    FROM pending_table_orders
"#;

impl PendingTableRepository {
    /// Creates a new PendingTableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PendingTableRepository { pool }
    }

    /// Lists all open drafts, most recently touched first.
    pub async fn list(&self) -> DbResult<Vec<PendingTableOrder>> {
        let rows = sqlx::query_as::<_, PendingRow>(&format!(
            "{} ORDER BY updated_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PendingRow::into_pending).collect()
    }

    /// Gets the draft for one table, if any.
    pub async fn get_by_table(&self, table_id: &str) -> DbResult<Option<PendingTableOrder>> {
        let row =
            sqlx::query_as::<_, PendingRow>(&format!("{} WHERE table_id = ?1", SELECT_COLUMNS))
                .bind(table_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(PendingRow::into_pending).transpose()
    }

    /// Saves a draft for a table, replacing any existing one.
    ///
    /// The upsert keeps the original row id and `created_at`; only the
    /// cart contents and `updated_at` move.
    pub async fn save(&self, draft: SaveTableDraft) -> DbResult<PendingTableOrder> {
        let now = Utc::now();
        let items = serde_json::to_string(&draft.lines)?;
        let line_discounts = serde_json::to_string(&draft.line_discounts)?;

        debug!(table = %draft.table_id, lines = draft.lines.len(), "Saving table draft");

        sqlx::query(
            r#"
            INSERT INTO pending_table_orders (id, table_id, table_name, items,
                                              line_discounts, total_cents, status,
                                              created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)
            ON CONFLICT(table_id) DO UPDATE SET
                table_name = excluded.table_name,
                items = excluded.items,
                line_discounts = excluded.line_discounts,
                total_cents = excluded.total_cents,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&draft.table_id)
        .bind(&draft.table_name)
        .bind(&items)
        .bind(&line_discounts)
        .bind(draft.total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_table(&draft.table_id)
            .await?
            .ok_or_else(|| DbError::not_found("PendingTableOrder", &draft.table_id))
    }

    /// Clears the draft for one table (checkout done or cancelled).
    pub async fn delete_by_table(&self, table_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM pending_table_orders WHERE table_id = ?1")
            .bind(table_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PendingTableOrder", table_id));
        }

        Ok(())
    }

    /// Clears every draft (end of day).
    pub async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM pending_table_orders")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
