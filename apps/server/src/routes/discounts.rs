//! Line discount rule routes, plus the cart quote endpoint the register
//! uses to preview discounts before checkout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::cart::{self, CartLineRequest};
use crate::error::ApiResult;
use crate::state::AppState;
use chai_core::pricing::{self, OrderDiscount};
use chai_core::{validation, DiscountRule, LineDiscountMap, RuleKind};
use chai_db::repository::discount_rule::NewDiscountRule;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    pub name: String,
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub kind: RuleKind,
    pub value: i64,
    #[serde(default = "one")]
    pub min_quantity: i64,
    /// -1 means unbounded.
    #[serde(default = "unbounded")]
    pub max_quantity: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

fn one() -> i64 {
    1
}

fn unbounded() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub lines: Vec<CartLineRequest>,
    #[serde(default)]
    pub line_discounts: LineDiscountMap,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub subtotal_cents: i64,
    pub line_discount_cents: i64,
    pub final_total_cents: i64,
}

/// `GET /line-item-discounts`
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<DiscountRule>>> {
    Ok(Json(state.db.discount_rules().list().await?))
}

/// `POST /line-item-discounts` (admin)
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RuleRequest>,
) -> ApiResult<(StatusCode, Json<DiscountRule>)> {
    user.require_admin()?;

    validation::validate_name("name", &req.name)?;
    match req.kind {
        RuleKind::Percentage | RuleKind::Bulk => validation::validate_bps("value", req.value)?,
        RuleKind::Flat => validation::validate_price_cents(req.value)?,
        RuleKind::BuyXGetY => validation::validate_quantity(req.value)?,
    }

    let created = state
        .db
        .discount_rules()
        .insert(NewDiscountRule {
            name: req.name,
            product_id: req.product_id,
            category: req.category,
            kind: req.kind,
            value: req.value,
            min_quantity: req.min_quantity,
            max_quantity: req.max_quantity,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /line-item-discounts/calculate`
///
/// Quotes the line-level discount layer for a cart: active rules plus
/// any manual per-line discounts, before an order-level discount.
pub async fn calculate(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CalculateRequest>,
) -> ApiResult<Json<CalculateResponse>> {
    let lines = cart::resolve_lines(&state, &req.lines).await?;
    let rules = state.db.discount_rules().list_active().await?;

    let totals = pricing::order_totals(
        &lines,
        &req.line_discounts,
        &rules,
        &OrderDiscount::None,
        Utc::now(),
    );

    Ok(Json(CalculateResponse {
        subtotal_cents: totals.subtotal_cents,
        line_discount_cents: totals.line_discount_cents,
        final_total_cents: totals.final_total_cents,
    }))
}
