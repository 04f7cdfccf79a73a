//! Promo code routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use chai_core::pricing::{validate_promo, PromoQuote};
use chai_core::{validation, CoreError, DiscountKind, PromoCode, PromoError};
use chai_db::repository::promo::NewPromoCode;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromoRequest {
    pub code: String,
    pub subtotal_cents: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoRequest {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    #[serde(default)]
    pub min_order_amount_cents: i64,
    /// -1 means unlimited.
    #[serde(default = "unlimited")]
    pub max_uses: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

fn unlimited() -> i64 {
    -1
}

/// `POST /promo/validate`
///
/// Pure quote: validating never consumes a use. Consumption happens
/// inside the checkout transaction.
pub async fn validate(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<ValidatePromoRequest>,
) -> ApiResult<Json<PromoQuote>> {
    let promo = state
        .db
        .promos()
        .find_by_code(req.code.trim())
        .await?
        .ok_or(CoreError::Promo(PromoError::NotFound))?;

    let quote =
        validate_promo(&promo, req.subtotal_cents, Utc::now()).map_err(CoreError::Promo)?;

    Ok(Json(quote))
}

/// `GET /promo` (admin)
pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<PromoCode>>> {
    user.require_admin()?;
    Ok(Json(state.db.promos().list().await?))
}

/// `POST /promo` (admin)
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PromoRequest>,
) -> ApiResult<(StatusCode, Json<PromoCode>)> {
    user.require_admin()?;

    validation::validate_promo_code(&req.code)?;
    validation::validate_price_cents(req.min_order_amount_cents)?;
    match req.kind {
        DiscountKind::Percentage => validation::validate_bps("value", req.value)?,
        DiscountKind::Flat => validation::validate_price_cents(req.value)?,
    }

    let created = state
        .db
        .promos()
        .insert(NewPromoCode {
            code: req.code.trim().to_string(),
            kind: req.kind,
            value: req.value,
            min_order_amount_cents: req.min_order_amount_cents,
            max_uses: req.max_uses,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}
