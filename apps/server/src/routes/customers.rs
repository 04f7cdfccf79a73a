//! Customer routes: registration, punch-card redemption, order history.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use chai_core::{loyalty, validation, Customer, Order};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetVisitsResponse {
    pub reset_count: u64,
}

fn validate(req: &CustomerRequest) -> ApiResult<()> {
    validation::validate_name("name", &req.name)?;
    validation::validate_phone(&req.phone)?;
    Ok(())
}

/// `GET /customers`
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list().await?))
}

/// `POST /customers`
pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(req): Json<CustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    validate(&req)?;
    let created = state.db.customers().insert(&req.name, &req.phone).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /customers/{id}`
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<CustomerRequest>,
) -> ApiResult<Json<Customer>> {
    validate(&req)?;
    let updated = state
        .db
        .customers()
        .update(&id, &req.name, &req.phone)
        .await?;
    Ok(Json(updated))
}

/// `DELETE /customers/{id}` (admin)
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.customers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /customers/{id}/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Order>>> {
    state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;

    Ok(Json(state.db.orders().list_by_customer(&id).await?))
}

/// `POST /customers/{id}/redeem-free-item`
///
/// Validates eligibility through the punch-card rules, then resets the
/// card to (0, false).
pub async fn redeem_free_item(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Customer not found: {}", id)))?;

    loyalty::redeem_free_item(customer.free_item_eligible)?;

    let reset = state.db.customers().reset_punch_card(&id).await?;
    tracing::info!(customer = %id, "Free item redeemed");
    Ok(Json(reset))
}

/// `POST /customers/reset-visits` (admin)
pub async fn reset_visits(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ResetVisitsResponse>> {
    user.require_admin()?;
    let reset_count = state.db.customers().reset_all_visits().await?;
    tracing::info!(reset_count, "All punch-cards reset");
    Ok(Json(ResetVisitsResponse { reset_count }))
}
