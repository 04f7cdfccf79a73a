//! Order routes: checkout, edits, splits, and history maintenance.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::cart::{self, CartLineRequest, OrderDiscountRequest};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use chai_core::pricing;
use chai_core::{
    order as order_rules, CoreError, LineDiscountMap, Order, OrderDiscountKind, OrderLine,
    OrderStatus, Refund, ServiceType,
};
use chai_db::repository::order::generate_receipt_number;
use chai_db::CheckoutArgs;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub lines: Vec<CartLineRequest>,
    /// Manual per-line discounts, keyed by product id.
    #[serde(default)]
    pub line_discounts: LineDiscountMap,
    pub discount: Option<OrderDiscountRequest>,
    pub service_type: ServiceType,
    pub table_id: Option<String>,
    pub table_label: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// One line of a split group, identified the way split reconciliation
/// identifies lines: by snapshot name and unit price.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitLineRequest {
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub groups: Vec<Vec<SplitLineRequest>>,
}

/// `GET /orders`
pub async fn list(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list().await?))
}

/// `POST /orders` — checkout.
///
/// Composes the order from catalog prices, applies the discount layers
/// through chai-core, then persists the order plus its side effects
/// (promo use, customer visit, pending-table cleanup) in one
/// transaction.
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let now = Utc::now();

    let lines = cart::resolve_lines(&state, &req.lines).await?;
    let rules = state.db.discount_rules().list_active().await?;
    let (order_discount, discount_kind, promo_code) = cart::resolve_order_discount(
        &state,
        req.discount.as_ref(),
        &lines,
        &req.line_discounts,
        &rules,
        now,
    )
    .await?;

    let totals = pricing::order_totals(&lines, &req.line_discounts, &rules, &order_discount, now);

    let customer_name = match &req.customer_id {
        Some(id) => Some(
            state
                .db
                .customers()
                .get_by_id(id)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?
                .name,
        ),
        None => None,
    };

    let clear_table = match req.service_type {
        ServiceType::DineIn => req.table_id.clone(),
        ServiceType::TakeOut => None,
    };

    let order = Order {
        id: Uuid::new_v4().to_string(),
        receipt_number: generate_receipt_number(),
        table_label: req.table_label,
        service_type: req.service_type,
        lines: lines.into_iter().map(|(line, _)| line).collect(),
        line_discounts: req.line_discounts,
        subtotal_cents: totals.subtotal_cents,
        discount_cents: totals.order_discount_cents,
        discount_kind,
        promo_code: promo_code.clone(),
        final_total_cents: totals.final_total_cents,
        payment_method: req.payment_method,
        status: OrderStatus::Completed,
        customer_id: req.customer_id.clone(),
        customer_name,
        notes: req.notes,
        is_split_bill: false,
        parent_order_id: None,
        split_number: None,
        created_at: now,
    };

    let args = CheckoutArgs {
        consume_promo: promo_code,
        visit_customer: req.customer_id,
        clear_table,
    };
    state.db.orders().checkout(&order, args).await?;

    tracing::info!(
        receipt = %order.receipt_number,
        total = order.final_total_cents,
        cashier = %user.username,
        "Order completed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// `PUT /orders/{id}` — edit an order and recompute its totals.
///
/// Identity fields (receipt, split linkage, created_at) are preserved;
/// everything priced goes back through the pricing engine.
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<Order>> {
    let existing = state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(id.clone()))?;

    let now = Utc::now();
    let lines = cart::resolve_lines(&state, &req.lines).await?;
    let rules = state.db.discount_rules().list_active().await?;
    let (order_discount, discount_kind, promo_code) = cart::resolve_order_discount(
        &state,
        req.discount.as_ref(),
        &lines,
        &req.line_discounts,
        &rules,
        now,
    )
    .await?;

    let totals = pricing::order_totals(&lines, &req.line_discounts, &rules, &order_discount, now);

    let customer_name = match &req.customer_id {
        Some(cid) => Some(
            state
                .db
                .customers()
                .get_by_id(cid)
                .await?
                .ok_or_else(|| CoreError::CustomerNotFound(cid.clone()))?
                .name,
        ),
        None => None,
    };

    let updated = Order {
        table_label: req.table_label,
        service_type: req.service_type,
        lines: lines.into_iter().map(|(line, _)| line).collect(),
        line_discounts: req.line_discounts,
        subtotal_cents: totals.subtotal_cents,
        discount_cents: totals.order_discount_cents,
        discount_kind,
        promo_code,
        final_total_cents: totals.final_total_cents,
        payment_method: req.payment_method,
        customer_id: req.customer_id,
        customer_name,
        notes: req.notes,
        ..existing
    };

    state.db.orders().update(&updated).await?;
    Ok(Json(updated))
}

/// `DELETE /orders/{id}`
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.orders().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /orders` (admin) — wipe order history, refunds, and drafts.
pub async fn reset_history(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.orders().reset_history().await?;
    tracing::warn!(admin = %user.username, "Order history reset");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /orders/{id}/split`
///
/// Validates that the groups exactly partition the parent's lines, then
/// persists one completed child per group. The parent keeps its total
/// and gains the split flag.
pub async fn split(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<SplitRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Order>>)> {
    let parent = state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(id.clone()))?;

    let groups: Vec<Vec<OrderLine>> = req
        .groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|line| to_order_line(line, &parent.lines))
                .collect()
        })
        .collect();

    order_rules::validate_split(&parent.lines, &groups)?;

    let now = Utc::now();
    let children: Vec<Order> = groups
        .into_iter()
        .enumerate()
        .map(|(i, group_lines)| {
            let total = order_rules::group_total(&group_lines).cents();
            Order {
                id: Uuid::new_v4().to_string(),
                receipt_number: generate_receipt_number(),
                table_label: parent.table_label.clone(),
                service_type: parent.service_type,
                lines: group_lines,
                line_discounts: LineDiscountMap::new(),
                subtotal_cents: total,
                discount_cents: 0,
                discount_kind: OrderDiscountKind::None,
                promo_code: None,
                final_total_cents: total,
                payment_method: parent.payment_method.clone(),
                status: OrderStatus::Completed,
                customer_id: None,
                customer_name: None,
                notes: None,
                is_split_bill: false,
                parent_order_id: Some(parent.id.clone()),
                split_number: Some((i + 1) as i64),
                created_at: now,
            }
        })
        .collect();

    state.db.orders().create_splits(&parent.id, &children).await?;

    tracing::info!(parent = %parent.id, groups = children.len(), "Order split");
    Ok((StatusCode::CREATED, Json(children)))
}

/// `GET /orders/{id}/splits`
pub async fn list_splits(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_children(&id).await?))
}

/// `GET /split-bills`
pub async fn list_split_bills(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_split_parents().await?))
}

/// `GET /orders/{id}/refunds`
pub async fn list_refunds(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Refund>>> {
    state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Order not found: {}", id)))?;

    Ok(Json(state.db.refunds().list_by_order(&id).await?))
}

/// Rebuilds an OrderLine from a split-group line, recovering the product
/// id and image from the matching parent snapshot. Lines that don't
/// match any parent snapshot still flow into reconciliation, which
/// rejects them with the precise mismatch.
fn to_order_line(line: &SplitLineRequest, parent_lines: &[OrderLine]) -> OrderLine {
    let snapshot = parent_lines
        .iter()
        .find(|p| p.name == line.name && p.unit_price_cents == line.unit_price_cents);

    OrderLine {
        product_id: snapshot.map(|p| p.product_id.clone()).unwrap_or_default(),
        name: line.name.clone(),
        unit_price_cents: line.unit_price_cents,
        quantity: line.quantity,
        image: snapshot.and_then(|p| p.image.clone()),
    }
}
