//! Product catalog routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use chai_core::{validation, Product};
use chai_db::repository::product::NewProduct;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl ProductRequest {
    fn validated(self) -> ApiResult<NewProduct> {
        validation::validate_name("name", &self.name)?;
        validation::validate_name("category", &self.category)?;
        validation::validate_price_cents(self.price_cents)?;

        Ok(NewProduct {
            name: self.name,
            price_cents: self.price_cents,
            category: self.category,
            image: self.image,
            description: self.description,
        })
    }
}

/// `GET /products`
pub async fn list(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.db.products().list().await?))
}

/// `POST /products` (admin)
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    user.require_admin()?;
    let created = state.db.products().insert(req.validated()?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /products/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> ApiResult<Json<Product>> {
    user.require_admin()?;
    let updated = state.db.products().update(&id, req.validated()?).await?;
    Ok(Json(updated))
}

/// `DELETE /products/{id}` (admin)
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require_admin()?;
    state.db.products().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
