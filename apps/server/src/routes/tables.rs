//! Pending table order routes (dine-in drafts).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::cart::{self, CartLineRequest};
use crate::error::ApiResult;
use crate::state::AppState;
use chai_core::pricing::{self, OrderDiscount};
use chai_core::{validation, LineDiscountMap, PendingTableOrder};
use chai_db::SaveTableDraft;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDraftRequest {
    pub table_id: String,
    pub table_name: String,
    pub lines: Vec<CartLineRequest>,
    #[serde(default)]
    pub line_discounts: LineDiscountMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearAllResponse {
    pub cleared_count: u64,
}

/// `GET /pending-table-orders`
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<PendingTableOrder>>> {
    Ok(Json(state.db.pending_tables().list().await?))
}

/// `POST /pending-table-orders`
///
/// Saves (or replaces) the draft for a table. The stored total reflects
/// line-level discounts; order-level discounts apply at checkout.
pub async fn save(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<SaveDraftRequest>,
) -> ApiResult<Json<PendingTableOrder>> {
    validation::validate_name("tableName", &req.table_name)?;

    let lines = cart::resolve_lines(&state, &req.lines).await?;
    let rules = state.db.discount_rules().list_active().await?;
    let totals = pricing::order_totals(
        &lines,
        &req.line_discounts,
        &rules,
        &OrderDiscount::None,
        Utc::now(),
    );

    let saved = state
        .db
        .pending_tables()
        .save(SaveTableDraft {
            table_id: req.table_id,
            table_name: req.table_name,
            lines: lines.into_iter().map(|(line, _)| line).collect(),
            line_discounts: req.line_discounts,
            total_cents: totals.final_total_cents,
        })
        .await?;

    Ok(Json(saved))
}

/// `DELETE /pending-table-orders/{table_id}`
pub async fn clear(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(table_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.pending_tables().delete_by_table(&table_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /pending-table-orders`
pub async fn clear_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ClearAllResponse>> {
    user.require_admin()?;
    let cleared_count = state.db.pending_tables().delete_all().await?;
    Ok(Json(ClearAllResponse { cleared_count }))
}
