//! # Pricing Module
//!
//! All discount and total math: automatic line rules, manual line
//! discounts, promo codes, and order total composition.
//!
//! ## Discount Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Order Total Composition                             │
//! │                                                                         │
//! │  subtotal = Σ unit_price × quantity                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LAYER 1: per-line discounts                                           │
//! │  ├── manual LineDiscount on a line OVERRIDES automatic rules           │
//! │  └── otherwise: best single qualifying rule (no stacking)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LAYER 2: order-level discount (one of)                                │
//! │  ├── promo code (percentage or flat)                                   │
//! │  └── manual order discount (percentage or flat)                        │
//! │       computed against the line-discounted amount, clamped to it       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  final_total = max(0, subtotal − line_discounts − order_discount)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: same lines + rules + clock instant always
//! produce the same totals. The clock is a parameter, never read here.

use chrono::{DateTime, Utc};

use crate::error::PromoError;
use crate::money::Money;
use crate::types::{
    DiscountKind, DiscountRule, LineDiscount, LineDiscountMap, OrderLine, PromoCode, RuleKind,
};

// =============================================================================
// Automatic Rules
// =============================================================================

/// Checks whether a rule applies to a line at a given instant.
///
/// A rule applies when:
/// - it is active
/// - its scope matches (product id and/or category; a rule with both set
///   requires both to match)
/// - the line quantity is within [min_quantity, max_quantity]
///   (max_quantity = -1 means unbounded)
/// - `now` falls inside the validity window, when one is set
pub fn rule_applies(line: &OrderLine, category: &str, rule: &DiscountRule, now: DateTime<Utc>) -> bool {
    if !rule.is_active {
        return false;
    }

    // Scope: both constraints must hold when both are set
    if let Some(pid) = &rule.product_id {
        if pid != &line.product_id {
            return false;
        }
    }
    if let Some(cat) = &rule.category {
        if cat != category {
            return false;
        }
    }
    if rule.product_id.is_none() && rule.category.is_none() {
        // A rule scoped to nothing matches nothing
        return false;
    }

    if line.quantity < rule.min_quantity {
        return false;
    }
    if rule.max_quantity >= 0 && line.quantity > rule.max_quantity {
        return false;
    }

    if let Some(from) = rule.valid_from {
        if now < from {
            return false;
        }
    }
    if let Some(until) = rule.valid_until {
        if now > until {
            return false;
        }
    }

    true
}

/// Discount (in paisa) a single rule grants on a line.
///
/// Returns zero when the rule does not apply.
///
/// ## Per-kind math
/// - percentage: `round(line_total × bps / 10000)`
/// - flat: `min(value, line_total)` — a flat discount never exceeds the line
/// - bulk: percentage, activated by the quantity gate
/// - buy_x_get_y: `floor(qty / (X + Y)) × unit_price` — one free unit per
///   full group of (X + Y), where X = min_quantity and Y = value
pub fn rule_discount(line: &OrderLine, category: &str, rule: &DiscountRule, now: DateTime<Utc>) -> Money {
    if !rule_applies(line, category, rule, now) {
        return Money::zero();
    }

    let line_total = line.extension();

    match rule.kind {
        RuleKind::Percentage | RuleKind::Bulk => line_total.percentage(rule.value),
        RuleKind::Flat => Money::from_cents(rule.value).min(line_total),
        RuleKind::BuyXGetY => {
            let group = rule.min_quantity + rule.value;
            if group <= 0 {
                return Money::zero();
            }
            let free_units = line.quantity / group;
            Money::from_cents(line.unit_price_cents).multiply_quantity(free_units)
        }
    }
}

/// The single largest qualifying rule discount for a line.
///
/// Automatic rules never stack: the customer gets the best one.
pub fn best_rule_discount(
    line: &OrderLine,
    category: &str,
    rules: &[DiscountRule],
    now: DateTime<Utc>,
) -> Money {
    rules
        .iter()
        .map(|rule| rule_discount(line, category, rule, now))
        .max()
        .unwrap_or_else(Money::zero)
}

// =============================================================================
// Manual Line Discounts
// =============================================================================

/// Effective unit price after a manual discount.
///
/// - percentage: `round(price × (10000 − bps) / 10000)`
/// - flat: `max(0, price − value)`
pub fn effective_unit_price(unit_price_cents: i64, manual: &LineDiscount) -> Money {
    let unit = Money::from_cents(unit_price_cents);
    match manual.kind {
        DiscountKind::Percentage => unit.percentage(10000 - manual.value),
        DiscountKind::Flat => unit.saturating_sub(Money::from_cents(manual.value)),
    }
}

/// Total discount for one line.
///
/// A manual discount on the line overrides every automatic rule;
/// automatic rules only apply to undiscounted lines.
pub fn line_discount(
    line: &OrderLine,
    category: &str,
    manual: Option<&LineDiscount>,
    rules: &[DiscountRule],
    now: DateTime<Utc>,
) -> Money {
    match manual {
        Some(m) => {
            let discounted = effective_unit_price(line.unit_price_cents, m)
                .multiply_quantity(line.quantity);
            line.extension().saturating_sub(discounted)
        }
        None => best_rule_discount(line, category, rules, now),
    }
}

// =============================================================================
// Promo Codes
// =============================================================================

/// Successful promo validation result.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoQuote {
    pub code: String,
    pub discount_cents: i64,
    pub final_total_cents: i64,
}

/// Validates a promo code against an order amount.
///
/// Pure and idempotent: validating twice returns the same quote and
/// consumes nothing. Usage is consumed exactly once, at checkout, by the
/// storage layer.
///
/// ## Check Order
/// 1. active (inactive reads as not-found)
/// 2. usage limit (`max_uses = -1` is unlimited)
/// 3. minimum order amount — inclusive boundary, rejects only when
///    `subtotal < min`
/// 4. validity window
pub fn validate_promo(
    promo: &PromoCode,
    subtotal_cents: i64,
    now: DateTime<Utc>,
) -> Result<PromoQuote, PromoError> {
    if !promo.is_active {
        return Err(PromoError::NotFound);
    }

    if promo.max_uses >= 0 && promo.used_count >= promo.max_uses {
        return Err(PromoError::UsageExceeded);
    }

    if subtotal_cents < promo.min_order_amount_cents {
        return Err(PromoError::MinimumNotMet {
            min_cents: promo.min_order_amount_cents,
        });
    }

    if let Some(from) = promo.valid_from {
        if now < from {
            return Err(PromoError::NotYetValid);
        }
    }
    if let Some(until) = promo.valid_until {
        if now > until {
            return Err(PromoError::Expired);
        }
    }

    let subtotal = Money::from_cents(subtotal_cents);
    let discount = match promo.kind {
        DiscountKind::Percentage => subtotal.percentage(promo.value),
        DiscountKind::Flat => Money::from_cents(promo.value).min(subtotal),
    };

    Ok(PromoQuote {
        code: promo.code.clone(),
        discount_cents: discount.cents(),
        final_total_cents: subtotal.saturating_sub(discount).cents(),
    })
}

// =============================================================================
// Order Totals
// =============================================================================

/// Order-level discount requested at checkout.
///
/// Promo codes and manual order discounts are mutually exclusive; both
/// compose with per-line discounts.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDiscount {
    None,
    /// Manual percentage in bps.
    Percentage(i64),
    /// Manual flat amount in paisa.
    Flat(i64),
    /// A validated promo code.
    Promo { kind: DiscountKind, value: i64, code: String },
}

/// The composed totals for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal_cents: i64,
    pub line_discount_cents: i64,
    pub order_discount_cents: i64,
    pub final_total_cents: i64,
}

/// Composes the full total for a set of lines.
///
/// Per-line layer first, then the order-level layer against the
/// line-discounted amount. Both layers clamp: the final total can never
/// go negative.
pub fn order_totals(
    lines: &[(OrderLine, String)],
    manual_discounts: &LineDiscountMap,
    rules: &[DiscountRule],
    order_discount: &OrderDiscount,
    now: DateTime<Utc>,
) -> OrderTotals {
    let mut subtotal = Money::zero();
    let mut line_discounts = Money::zero();

    for (line, category) in lines {
        subtotal += line.extension();
        line_discounts += line_discount(
            line,
            category,
            manual_discounts.get(&line.product_id),
            rules,
            now,
        );
    }

    let after_lines = subtotal.saturating_sub(line_discounts);

    let order_level = match order_discount {
        OrderDiscount::None => Money::zero(),
        OrderDiscount::Percentage(bps) => after_lines.percentage(*bps),
        OrderDiscount::Flat(cents) => Money::from_cents(*cents).min(after_lines),
        OrderDiscount::Promo { kind, value, .. } => match kind {
            DiscountKind::Percentage => after_lines.percentage(*value),
            DiscountKind::Flat => Money::from_cents(*value).min(after_lines),
        },
    };

    OrderTotals {
        subtotal_cents: subtotal.cents(),
        line_discount_cents: line_discounts.cents(),
        order_discount_cents: order_level.cents(),
        final_total_cents: after_lines.saturating_sub(order_level).cents(),
    }
}

// =============================================================================
// Point Redemption Value
// =============================================================================

/// Monetary value of redeemed points.
///
/// `redemption_rate_bps` is the rupee value of one point expressed in bps
/// of a rupee (100 bps = Rs 0.01/point), so the paisa value is
/// `points × bps / 100`, rounded half up.
pub fn redemption_value(points: i64, redemption_rate_bps: i64) -> Money {
    let cents = (points as i128 * redemption_rate_bps as i128 + 50) / 100;
    Money::from_cents(cents as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn line(product_id: &str, unit_price_cents: i64, quantity: i64) -> OrderLine {
        OrderLine {
            product_id: product_id.to_string(),
            name: format!("item-{}", product_id),
            unit_price_cents,
            quantity,
            image: None,
        }
    }

    fn rule(kind: RuleKind, value: i64, min_quantity: i64) -> DiscountRule {
        DiscountRule {
            id: "r1".to_string(),
            name: "test rule".to_string(),
            product_id: None,
            category: Some("Coffee".to_string()),
            kind,
            value,
            min_quantity,
            max_quantity: -1,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn promo(kind: DiscountKind, value: i64, min_cents: i64) -> PromoCode {
        PromoCode {
            id: "pc1".to_string(),
            code: "WELCOME10".to_string(),
            kind,
            value,
            min_order_amount_cents: min_cents,
            max_uses: 100,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_manual_percentage_effective_unit_price() {
        // Unit 10000, 20% off → effective 8000, extension 24000 for qty 3
        let manual = LineDiscount {
            kind: DiscountKind::Percentage,
            value: 2000,
        };
        let effective = effective_unit_price(10000, &manual);
        assert_eq!(effective.cents(), 8000);
        assert_eq!(effective.multiply_quantity(3).cents(), 24000);
    }

    #[test]
    fn test_manual_flat_clamps_at_zero() {
        let manual = LineDiscount {
            kind: DiscountKind::Flat,
            value: 500,
        };
        assert_eq!(effective_unit_price(300, &manual).cents(), 0);
    }

    #[test]
    fn test_bulk_rule_quantity_gate() {
        // bulk 20% min 3: qty 2 → nothing, qty 3 → 20% of 3 × unit
        let bulk = rule(RuleKind::Bulk, 2000, 3);
        let now = Utc::now();

        let two = line("p1", 1000, 2);
        assert_eq!(rule_discount(&two, "Coffee", &bulk, now).cents(), 0);

        let three = line("p1", 1000, 3);
        assert_eq!(rule_discount(&three, "Coffee", &bulk, now).cents(), 600);
    }

    #[test]
    fn test_buy_x_get_y_free_units() {
        // buy 2 get 1 free, qty 7 → floor(7/3) = 2 free units
        let bogo = rule(RuleKind::BuyXGetY, 1, 2);
        let seven = line("p1", 500, 7);
        let discount = rule_discount(&seven, "Coffee", &bogo, Utc::now());
        assert_eq!(discount.cents(), 1000);
    }

    #[test]
    fn test_buy_x_get_y_wider_group() {
        // buy 2 get 2 free: group of 4, one free unit per full group
        let b2g2 = rule(RuleKind::BuyXGetY, 2, 2);
        let now = Utc::now();

        let eight = line("p1", 500, 8);
        let discount = rule_discount(&eight, "Coffee", &b2g2, now);
        assert_eq!(discount.cents(), 1000); // floor(8/4) = 2 free units

        // A partial group earns nothing extra
        let seven = line("p1", 500, 7);
        let discount = rule_discount(&seven, "Coffee", &b2g2, now);
        assert_eq!(discount.cents(), 500);
    }

    #[test]
    fn test_rule_category_scope() {
        let r = rule(RuleKind::Percentage, 1500, 1);
        let l = line("p1", 1000, 1);
        let now = Utc::now();
        assert!(rule_applies(&l, "Coffee", &r, now));
        assert!(!rule_applies(&l, "Tea", &r, now));
    }

    #[test]
    fn test_rule_validity_window() {
        let mut r = rule(RuleKind::Percentage, 1500, 1);
        r.valid_from = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        r.valid_until = Some(Utc.with_ymd_and_hms(2025, 6, 30, 23, 59, 59).unwrap());
        let l = line("p1", 1000, 1);

        let before = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let inside = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();

        assert!(!rule_applies(&l, "Coffee", &r, before));
        assert!(rule_applies(&l, "Coffee", &r, inside));
        assert!(!rule_applies(&l, "Coffee", &r, after));
    }

    #[test]
    fn test_best_rule_no_stacking() {
        let small = rule(RuleKind::Percentage, 1000, 1);
        let mut big = rule(RuleKind::Percentage, 2500, 1);
        big.id = "r2".to_string();
        let l = line("p1", 1000, 2);

        let best = best_rule_discount(&l, "Coffee", &[small, big], Utc::now());
        // 25% of 2000, not 35%
        assert_eq!(best.cents(), 500);
    }

    #[test]
    fn test_manual_overrides_automatic() {
        // A 5% manual discount beats a 25% rule because manual wins outright
        let auto = rule(RuleKind::Percentage, 2500, 1);
        let l = line("p1", 1000, 2);
        let manual = LineDiscount {
            kind: DiscountKind::Percentage,
            value: 500,
        };
        let d = line_discount(&l, "Coffee", Some(&manual), &[auto], Utc::now());
        assert_eq!(d.cents(), 100);
    }

    #[test]
    fn test_validate_promo_is_pure() {
        let p = promo(DiscountKind::Percentage, 1000, 10000);
        let now = Utc::now();
        let first = validate_promo(&p, 20000, now).unwrap();
        let second = validate_promo(&p, 20000, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.discount_cents, 2000);
        assert_eq!(first.final_total_cents, 18000);
    }

    #[test]
    fn test_promo_minimum_boundary_inclusive() {
        let p = promo(DiscountKind::Flat, 5000, 10000);
        let now = Utc::now();

        // subtotal == minimum passes
        assert!(validate_promo(&p, 10000, now).is_ok());
        // one paisa below fails
        assert_eq!(
            validate_promo(&p, 9999, now),
            Err(PromoError::MinimumNotMet { min_cents: 10000 })
        );
    }

    #[test]
    fn test_promo_usage_limit() {
        let mut p = promo(DiscountKind::Flat, 500, 0);
        p.max_uses = 3;
        p.used_count = 3;
        assert_eq!(
            validate_promo(&p, 10000, Utc::now()),
            Err(PromoError::UsageExceeded)
        );

        // -1 means unlimited
        p.max_uses = -1;
        p.used_count = 99999;
        assert!(validate_promo(&p, 10000, Utc::now()).is_ok());
    }

    #[test]
    fn test_promo_inactive_reads_as_not_found() {
        let mut p = promo(DiscountKind::Flat, 500, 0);
        p.is_active = false;
        assert_eq!(
            validate_promo(&p, 10000, Utc::now()),
            Err(PromoError::NotFound)
        );
    }

    #[test]
    fn test_promo_window() {
        let mut p = promo(DiscountKind::Flat, 500, 0);
        p.valid_from = Some(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        p.valid_until = Some(Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap());

        let before = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();

        assert_eq!(validate_promo(&p, 1000, before), Err(PromoError::NotYetValid));
        assert_eq!(validate_promo(&p, 1000, after), Err(PromoError::Expired));
    }

    #[test]
    fn test_order_totals_never_negative() {
        // Flat promo far larger than the discounted amount
        let lines = vec![(line("p1", 300, 1), "Tea".to_string())];
        let manual: LineDiscountMap = HashMap::new();
        let totals = order_totals(
            &lines,
            &manual,
            &[],
            &OrderDiscount::Flat(100000),
            Utc::now(),
        );
        assert_eq!(totals.final_total_cents, 0);
        // The stored discount is the clamped amount actually granted
        assert_eq!(totals.order_discount_cents, 300);
    }

    #[test]
    fn test_order_totals_layers_compose() {
        // Two lines; manual 20% on p1, 10% order-level on the remainder
        let lines = vec![
            (line("p1", 10000, 3), "Tea".to_string()),
            (line("p2", 5000, 1), "Coffee".to_string()),
        ];
        let mut manual: LineDiscountMap = HashMap::new();
        manual.insert(
            "p1".to_string(),
            LineDiscount {
                kind: DiscountKind::Percentage,
                value: 2000,
            },
        );

        let totals = order_totals(
            &lines,
            &manual,
            &[],
            &OrderDiscount::Percentage(1000),
            Utc::now(),
        );

        assert_eq!(totals.subtotal_cents, 35000);
        assert_eq!(totals.line_discount_cents, 6000);
        // 10% of (35000 − 6000) = 2900
        assert_eq!(totals.order_discount_cents, 2900);
        assert_eq!(totals.final_total_cents, 26100);
    }

    #[test]
    fn test_redemption_value() {
        // 200 points at 100 bps (Rs 0.01/point) = 200 paisa
        assert_eq!(redemption_value(200, 100).cents(), 200);
        // Gold: 200 bps → Rs 0.02/point
        assert_eq!(redemption_value(500, 200).cents(), 1000);
    }
}
