//! # Domain Types
//!
//! Core domain types for Chai POS.
//!
//! ## Conventions
//! - All IDs are UUID v4 strings
//! - All monetary fields are integer paisa with a `_cents` suffix
//! - All percentage fields are basis points with a `_bps` suffix
//! - Order lines are frozen snapshots of product data: editing or deleting
//!   a product never rewrites history
//! - Enums derive `sqlx::Type` behind the `sqlx` feature so chai-db can
//!   store them as TEXT without this crate depending on a database at all

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

/// Staff role for the auth shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }
}

/// How an order is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    TakeOut,
    DineIn,
}

/// Order lifecycle status.
///
/// Pending orders are dine-in drafts parked against a table; completed
/// orders have an immutable receipt total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Completed,
}

/// Shape of a manual discount or promo code value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Value is basis points (1500 = 15%)
    Percentage,
    /// Value is paisa off
    Flat,
}

/// Shape of an automatic line discount rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Value is basis points off the line total
    Percentage,
    /// Value is paisa off the line total
    Flat,
    /// Percentage (value in bps) that activates at min_quantity
    Bulk,
    /// "Buy X get Y free": min_quantity = X, value = Y free units
    BuyXGetY,
}

/// Kind of the order-level discount stored on a completed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderDiscountKind {
    None,
    Percentage,
    Flat,
    Promo,
}

/// Point ledger entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PointTransactionKind {
    Earned,
    Redeemed,
    Expired,
    Bonus,
}

// =============================================================================
// Catalog
// =============================================================================

/// A menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Lines and Discounts
// =============================================================================

/// A single line on an order: a product snapshot plus a quantity.
///
/// ## Snapshot Pattern
/// Name and unit price are copied from the product at the time the line
/// is added. Receipts stay correct even if the product is later edited
/// or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderLine {
    /// Pre-discount line extension: unit price × quantity.
    #[inline]
    pub fn extension(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// A manual, cashier-applied discount on one line.
///
/// At most one per line, keyed by product id on the order. A manual
/// discount overrides automatic rules for its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDiscount {
    pub kind: DiscountKind,
    /// Basis points for percentage, paisa for flat.
    pub value: i64,
}

/// Per-line manual discounts for an order, keyed by product id.
pub type LineDiscountMap = HashMap<String, LineDiscount>;

/// An automatic discount rule matched against lines at pricing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DiscountRule {
    pub id: String,
    pub name: String,
    /// Scope: match a specific product, a category, or both.
    pub product_id: Option<String>,
    pub category: Option<String>,
    pub kind: RuleKind,
    /// bps for percentage/bulk, paisa for flat, free units for buy_x_get_y.
    pub value: i64,
    pub min_quantity: i64,
    /// -1 = unbounded.
    pub max_quantity: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An order-level promo code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: String,
    pub code: String,
    pub kind: DiscountKind,
    /// bps for percentage, paisa for flat.
    pub value: i64,
    pub min_order_amount_cents: i64,
    /// -1 = unlimited.
    pub max_uses: i64,
    pub used_count: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Orders
// =============================================================================

/// A completed (or split-child) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub receipt_number: String,
    pub table_label: Option<String>,
    pub service_type: ServiceType,
    pub lines: Vec<OrderLine>,
    pub line_discounts: LineDiscountMap,
    pub subtotal_cents: i64,
    /// Order-level discount amount (promo or manual), already clamped.
    pub discount_cents: i64,
    pub discount_kind: OrderDiscountKind,
    pub promo_code: Option<String>,
    pub final_total_cents: i64,
    pub payment_method: Option<String>,
    pub status: OrderStatus,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    pub is_split_bill: bool,
    pub parent_order_id: Option<String>,
    pub split_number: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn final_total(&self) -> Money {
        Money::from_cents(self.final_total_cents)
    }
}

/// A dine-in draft parked against a table.
///
/// One per table (unique table_id), upserted on every save and removed
/// on checkout or explicit clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTableOrder {
    pub id: String,
    pub table_id: String,
    pub table_name: String,
    pub lines: Vec<OrderLine>,
    pub line_discounts: LineDiscountMap,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customers and Loyalty
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub visits: i64,
    pub free_item_eligible: bool,
    pub created_at: DateTime<Utc>,
}

/// Fast-read points balance for one customer.
///
/// The [`PointTransaction`] ledger is the authoritative history; this row
/// is a redundant copy kept in sync inside the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RewardsAccount {
    pub customer_id: String,
    pub points_balance: i64,
    pub total_points_earned: i64,
    pub total_points_redeemed: i64,
    pub tier: String,
    pub updated_at: DateTime<Utc>,
}

/// A rung on the static reward tier ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RewardTier {
    pub name: String,
    pub min_points: i64,
    /// Points earned per rupee spent, in bps (12000 = 1.2 points/rupee).
    pub earn_rate_bps: i64,
    /// Rupee value per point, in bps of a rupee (100 = Rs 0.01/point).
    pub redemption_rate_bps: i64,
    /// Tier-wide discount entitlement, in bps.
    pub discount_bps: i64,
}

/// Append-only points ledger entry. Points are signed: redemptions are
/// recorded as negative rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PointTransaction {
    pub id: String,
    pub customer_id: String,
    pub order_id: Option<String>,
    pub kind: PointTransactionKind,
    pub points: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Refunds
// =============================================================================

/// A per-line refund against a completed order.
///
/// Refunds never mutate the order's final total; net revenue is a
/// reporting-layer calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub item_name: String,
    pub item_price_cents: i64,
    pub original_quantity: i64,
    pub refund_quantity: i64,
    pub refund_amount_cents: i64,
    pub reason: Option<String>,
    pub refunded_by: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Users
// =============================================================================

/// A staff account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2id hash; never serialized to clients.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_extension() {
        let line = OrderLine {
            product_id: "p1".to_string(),
            name: "Doodh Patti".to_string(),
            unit_price_cents: 250,
            quantity: 4,
            image: None,
        };
        assert_eq!(line.extension().cents(), 1000);
    }

    #[test]
    fn test_enum_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&ServiceType::DineIn).unwrap(),
            "\"dine_in\""
        );
        assert_eq!(
            serde_json::to_string(&RuleKind::BuyXGetY).unwrap(),
            "\"buy_x_get_y\""
        );
        assert_eq!(
            serde_json::to_string(&OrderDiscountKind::None).unwrap(),
            "\"none\""
        );
    }

    #[test]
    fn test_user_hash_never_serialized() {
        let user = User {
            id: "u1".to_string(),
            username: "admin".to_string(),
            password_hash: "secret-hash".to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
