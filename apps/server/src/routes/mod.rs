//! # Route Layer
//!
//! One module per resource; this module wires them into the router.
//!
//! Every handler takes [`crate::auth::AuthUser`] except `/health` and
//! `/auth/login`; admin-only handlers additionally call
//! `require_admin()`.

use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub mod auth;
pub mod customers;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod promos;
pub mod refunds;
pub mod rewards;
pub mod tables;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::remove),
        )
        // Customers + punch-card
        .route("/customers", get(customers::list).post(customers::create))
        .route("/customers/reset-visits", post(customers::reset_visits))
        .route(
            "/customers/{id}",
            put(customers::update).delete(customers::remove),
        )
        .route("/customers/{id}/orders", get(customers::list_orders))
        .route(
            "/customers/{id}/redeem-free-item",
            post(customers::redeem_free_item),
        )
        // Pending table orders
        .route(
            "/pending-table-orders",
            get(tables::list).post(tables::save).delete(tables::clear_all),
        )
        .route("/pending-table-orders/{table_id}", delete(tables::clear))
        // Orders + splits
        .route(
            "/orders",
            get(orders::list)
                .post(orders::checkout)
                .delete(orders::reset_history),
        )
        .route("/orders/{id}", put(orders::update).delete(orders::remove))
        .route("/orders/{id}/split", post(orders::split))
        .route("/orders/{id}/splits", get(orders::list_splits))
        .route("/orders/{id}/refunds", get(orders::list_refunds))
        .route("/split-bills", get(orders::list_split_bills))
        // Promo codes
        .route("/promo", get(promos::list).post(promos::create))
        .route("/promo/validate", post(promos::validate))
        // Line discount rules
        .route(
            "/line-item-discounts",
            get(discounts::list).post(discounts::create),
        )
        .route("/line-item-discounts/calculate", post(discounts::calculate))
        // Refunds
        .route("/refunds", get(refunds::list).post(refunds::create))
        .route("/refunds/stats", get(refunds::stats))
        // Rewards
        .route("/reward-tiers", get(rewards::list_tiers))
        .route(
            "/customers-with-rewards",
            get(rewards::list_customers_with_rewards),
        )
        .route("/customers/{id}/rewards", get(rewards::get_account))
        .route(
            "/customers/{id}/transactions",
            get(rewards::list_transactions),
        )
        .route("/customers/{id}/redeem-points", post(rewards::redeem_points))
        // Layers
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe: checks the database connection.
async fn health(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    if state.db.health_check().await {
        Ok(Json(json!({ "status": "ok" })))
    } else {
        Err(ApiError::internal("Database unreachable"))
    }
}
