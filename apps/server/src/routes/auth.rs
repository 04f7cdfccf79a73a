//! Auth routes: login, registration (admin), and identity lookup.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use chai_core::{validation, Role, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// `POST /auth/login`
///
/// The same rejection covers unknown usernames and wrong passwords;
/// callers cannot probe which usernames exist.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .db
        .users()
        .find_by_username(&req.username)
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let token = state.jwt.generate_token(&user.username, user.role)?;

    tracing::info!(username = %user.username, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// `POST /auth/register` (admin)
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    user.require_admin()?;

    validation::validate_name("username", &req.username)?;
    if req.password.len() < 6 {
        return Err(ApiError::bad_request(
            crate::error::ErrorCode::ValidationFailed,
            "password must be at least 6 characters",
        ));
    }

    let hash = hash_password(&req.password)?;
    let created = state
        .db
        .users()
        .insert(&req.username, &hash, req.role)
        .await?;

    Ok(Json(created))
}

/// `GET /auth/me`
pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    let found = state
        .db
        .users()
        .find_by_username(&user.username)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(Json(found))
}
