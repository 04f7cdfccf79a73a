//! Rewards routes: tier ladder, points accounts, and redemption.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use chai_core::pricing::redemption_value;
use chai_core::{loyalty, CoreError, PointTransaction, RewardTier, RewardsAccount};
use chai_db::CustomerWithRewards;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPointsRequest {
    pub points: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPointsResponse {
    pub account: RewardsAccount,
    pub redeemed_points: i64,
    /// Monetary value of the redemption at the customer's tier rate.
    pub value_cents: i64,
}

/// `GET /reward-tiers`
pub async fn list_tiers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<RewardTier>>> {
    Ok(Json(state.db.rewards().list_tiers().await?))
}

/// `GET /customers-with-rewards`
pub async fn list_customers_with_rewards(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<CustomerWithRewards>>> {
    Ok(Json(state.db.rewards().list_customers_with_rewards().await?))
}

/// `GET /customers/{id}/rewards`
pub async fn get_account(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<RewardsAccount>> {
    let account = state
        .db
        .rewards()
        .get_account(&id)
        .await?
        .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?;

    Ok(Json(account))
}

/// `GET /customers/{id}/transactions`
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<PointTransaction>>> {
    state
        .db
        .rewards()
        .get_account(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;

    Ok(Json(state.db.rewards().list_transactions(&id).await?))
}

/// `POST /customers/{id}/redeem-points`
///
/// Debits the balance and reports the monetary value at the customer's
/// current tier rate.
pub async fn redeem_points(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RedeemPointsRequest>,
) -> ApiResult<Json<RedeemPointsResponse>> {
    let current = state
        .db
        .rewards()
        .get_account(&id)
        .await?
        .ok_or_else(|| CoreError::CustomerNotFound(id.clone()))?;

    // Surface the precise domain error before touching storage
    loyalty::redeem_points(current.points_balance, req.points)?;

    let account = state
        .db
        .rewards()
        .redeem_points(&id, req.points, req.description.as_deref())
        .await?;

    let rate = state
        .db
        .rewards()
        .list_tiers()
        .await?
        .into_iter()
        .find(|t| t.name == account.tier)
        .map(|t| t.redemption_rate_bps)
        .unwrap_or(0);

    tracing::info!(customer = %id, points = req.points, "Points redeemed");
    Ok(Json(RedeemPointsResponse {
        account,
        redeemed_points: req.points,
        value_cents: redemption_value(req.points, rate).cents(),
    }))
}
