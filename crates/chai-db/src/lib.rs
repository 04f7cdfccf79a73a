//! # chai-db: Database Layer for Chai POS
//!
//! This crate provides database access for the Chai POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Chai POS Data Flow                               │
//! │                                                                         │
//! │  axum handler (POST /orders)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      chai-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (order.rs...) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ PromoRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (./chai_pos.db)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (one per entity)
//! - [`seed`] - Idempotent default data (tiers, promos, rules, users)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chai_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("./chai_pos.db");
//! let db = Database::new(config).await?;
//!
//! let products = db.products().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::discount_rule::DiscountRuleRepository;
pub use repository::order::{CheckoutArgs, OrderRepository};
pub use repository::pending_table::{PendingTableRepository, SaveTableDraft};
pub use repository::product::ProductRepository;
pub use repository::promo::PromoRepository;
pub use repository::refund::{RefundRepository, RefundStats};
pub use repository::rewards::{CustomerWithRewards, RewardsRepository};
pub use repository::user::UserRepository;
