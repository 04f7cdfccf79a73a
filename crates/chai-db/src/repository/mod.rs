//! # Repository Module
//!
//! One repository per entity, each a thin struct over a cloned
//! `SqlitePool`. Repositories own the SQL; callers own the business
//! rules. Multi-statement flows (checkout, splits, point redemption)
//! run inside a single transaction in the repository that anchors them.

pub mod customer;
pub mod discount_rule;
pub mod order;
pub mod pending_table;
pub mod product;
pub mod promo;
pub mod refund;
pub mod rewards;
pub mod user;
