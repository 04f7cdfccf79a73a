//! # Chai POS Server
//!
//! REST API for the Chai POS system.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Chai POS Server                                 │
//! │                                                                         │
//! │  Register UI ───► REST (4000) ───► routes ───► chai-core + chai-db     │
//! │                                                       │                 │
//! │                                                       ▼                 │
//! │                                                SQLite (WAL)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod auth;
mod cart;
mod config;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::auth::{hash_password, JwtManager};
use crate::config::ServerConfig;
use crate::state::AppState;
use chai_db::{seed, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Chai POS server...");

    // Load configuration
    let config = ServerConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    // Connect to database (runs embedded migrations)
    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Connected to SQLite");

    // Seed default data: tiers, starter promos/rules, staff accounts.
    // All idempotent, safe on every boot.
    seed::seed_defaults(db.pool()).await?;
    if db.users().count().await? == 0 {
        let admin_hash = hash_password("admin123").map_err(|e| e.message)?;
        let cashier_hash = hash_password("cashier123").map_err(|e| e.message)?;
        seed::seed_user(db.pool(), "admin", &admin_hash, "admin").await?;
        seed::seed_user(db.pool(), "cashier", &cashier_hash, "cashier").await?;
        tracing::warn!("Default staff accounts created; change their passwords");
    }

    // Build shared state and router
    let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_lifetime_secs);
    let state = AppState::new(db, jwt);
    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!(%addr, "Starting REST server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
