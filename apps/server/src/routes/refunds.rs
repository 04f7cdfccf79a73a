//! Refund routes (admin).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;
use chai_core::{order as order_rules, CoreError, Refund};
use chai_db::repository::refund::NewRefund;
use chai_db::RefundStats;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub order_id: String,
    pub item_name: String,
    pub refund_quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub order_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
}

/// `POST /refunds` (admin)
///
/// Refunds part or all of one line at its snapshot price. Cumulative
/// refunds for a line are capped at its originally sold quantity, and
/// the order's totals are never touched.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RefundRequest>,
) -> ApiResult<(StatusCode, Json<Refund>)> {
    user.require_admin()?;

    let order = state
        .db
        .orders()
        .get_by_id(&req.order_id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(req.order_id.clone()))?;

    let line = order
        .lines
        .iter()
        .find(|l| l.name == req.item_name)
        .ok_or_else(|| {
            ApiError::not_found(format!("Item '{}' is not on this order", req.item_name))
        })?;

    let amount =
        order_rules::validate_refund(line.unit_price_cents, line.quantity, req.refund_quantity)?;

    // Pre-check for a precise message; the insert re-enforces the cap
    // atomically, so a concurrent refund cannot slip past this read.
    let already = state
        .db
        .refunds()
        .refunded_quantity(&req.order_id, &req.item_name)
        .await?;
    if already + req.refund_quantity > line.quantity {
        return Err(ApiError::bad_request(
            ErrorCode::InvalidRefund,
            format!(
                "{} of {} already refunded; only {} remaining",
                already,
                line.quantity,
                line.quantity - already
            ),
        ));
    }

    let refund = state
        .db
        .refunds()
        .insert(NewRefund {
            order_id: req.order_id,
            item_name: req.item_name,
            item_price_cents: line.unit_price_cents,
            original_quantity: line.quantity,
            refund_quantity: req.refund_quantity,
            refund_amount_cents: amount.cents(),
            reason: req.reason,
            refunded_by: user.username.clone(),
        })
        .await?;

    tracing::info!(
        order = %refund.order_id,
        amount = refund.refund_amount_cents,
        by = %user.username,
        "Refund recorded"
    );
    Ok((StatusCode::CREATED, Json(refund)))
}

/// `GET /refunds` (admin) — optional order and date filters.
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Refund>>> {
    user.require_admin()?;

    let refunds = state
        .db
        .refunds()
        .list(query.order_id.as_deref(), query.from, query.to)
        .await?;

    Ok(Json(refunds))
}

/// `GET /refunds/stats?period=today|week|month|year` (admin)
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<RefundStats>> {
    user.require_admin()?;

    let start = period_start(query.period.as_deref().unwrap_or("today"))?;
    Ok(Json(state.db.refunds().stats_since(start).await?))
}

/// Start instant of a reporting period, in UTC.
fn period_start(period: &str) -> ApiResult<DateTime<Utc>> {
    let now = Utc::now();
    let midnight = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now);

    match period {
        "today" => Ok(midnight),
        "week" => Ok(midnight - Duration::days(7)),
        "month" => Ok(midnight - Duration::days(30)),
        "year" => Ok(midnight - Duration::days(365)),
        other => Err(ApiError::bad_request(
            ErrorCode::ValidationFailed,
            format!("Unknown period '{}'; expected today|week|month|year", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_start_orders() {
        let today = period_start("today").unwrap();
        let week = period_start("week").unwrap();
        let year = period_start("year").unwrap();
        assert!(week < today);
        assert!(year < week);
        assert!(period_start("fortnight").is_err());
    }
}
