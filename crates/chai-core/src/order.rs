//! # Order Lifecycle Module
//!
//! Pure order-level rules: split-bill reconciliation and refund
//! validation. Persistence of the resulting orders lives in chai-db.
//!
//! ## Split Bills
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Parent order: 2× Chai @250, 1× Samosa @150                            │
//! │       │                                                                 │
//! │       ▼ split into groups                                               │
//! │  Group 1: 1× Chai, 1× Samosa        Group 2: 1× Chai                   │
//! │                                                                         │
//! │  Reconciliation: multiset of (name, unit_price) → Σ quantity over      │
//! │  ALL groups must exactly equal the parent's. Identity is the snapshot  │
//! │  pair, not the product id: two lines of the same product at different  │
//! │  prices are different items.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::OrderLine;

// =============================================================================
// Split Reconciliation
// =============================================================================

/// Quantity multiset keyed by (name, unit price).
fn item_counts(lines: &[OrderLine]) -> HashMap<(String, i64), i64> {
    let mut counts: HashMap<(String, i64), i64> = HashMap::new();
    for line in lines {
        *counts
            .entry((line.name.clone(), line.unit_price_cents))
            .or_insert(0) += line.quantity;
    }
    counts
}

/// Validates that split groups exactly reconstruct the parent order.
///
/// ## Rules
/// - At least 2 groups
/// - Summed over all groups, every (name, unit_price) quantity must equal
///   the parent's; nothing dropped, nothing invented
///
/// On success the caller persists one completed child order per group and
/// flags the parent; the parent's own total is untouched.
pub fn validate_split(parent_lines: &[OrderLine], groups: &[Vec<OrderLine>]) -> CoreResult<()> {
    if groups.len() < 2 {
        return Err(CoreError::NotEnoughSplitGroups { got: groups.len() });
    }

    let expected = item_counts(parent_lines);
    let mut found: HashMap<(String, i64), i64> = HashMap::new();
    for group in groups {
        for ((name, price), qty) in item_counts(group) {
            *found.entry((name, price)).or_insert(0) += qty;
        }
    }

    for (key, expected_qty) in &expected {
        let found_qty = found.get(key).copied().unwrap_or(0);
        if found_qty != *expected_qty {
            return Err(CoreError::SplitMismatch {
                detail: format!(
                    "'{}' has quantity {} across groups, original has {}",
                    key.0, found_qty, expected_qty
                ),
            });
        }
    }
    for (key, found_qty) in &found {
        if !expected.contains_key(key) {
            return Err(CoreError::SplitMismatch {
                detail: format!("'{}' (qty {}) is not on the original order", key.0, found_qty),
            });
        }
    }

    Ok(())
}

/// Total of one split group: the sum of its line extensions.
pub fn group_total(lines: &[OrderLine]) -> Money {
    lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.extension())
}

// =============================================================================
// Refund Validation
// =============================================================================

/// Validates a refund quantity against the originally sold quantity and
/// returns the refund amount.
///
/// `1 ≤ refund_quantity ≤ original_quantity`; the amount is always
/// `unit_price × refund_quantity` of the snapshot price, never a share of
/// the discounted order total.
pub fn validate_refund(
    unit_price_cents: i64,
    original_quantity: i64,
    refund_quantity: i64,
) -> CoreResult<Money> {
    if refund_quantity < 1 || refund_quantity > original_quantity {
        return Err(CoreError::InvalidRefundQuantity {
            requested: refund_quantity,
            original: original_quantity,
        });
    }

    Ok(Money::from_cents(unit_price_cents).multiply_quantity(refund_quantity))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, price: i64, qty: i64) -> OrderLine {
        OrderLine {
            product_id: format!("id-{}", name),
            name: name.to_string(),
            unit_price_cents: price,
            quantity: qty,
            image: None,
        }
    }

    #[test]
    fn test_split_exact_partition_accepted() {
        let parent = vec![line("Chai", 250, 2), line("Samosa", 150, 1)];
        let groups = vec![
            vec![line("Chai", 250, 1), line("Samosa", 150, 1)],
            vec![line("Chai", 250, 1)],
        ];
        assert!(validate_split(&parent, &groups).is_ok());
    }

    #[test]
    fn test_split_dropped_item_rejected() {
        let parent = vec![line("Chai", 250, 2), line("Samosa", 150, 1)];
        let groups = vec![vec![line("Chai", 250, 1)], vec![line("Chai", 250, 1)]];
        let err = validate_split(&parent, &groups).unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { .. }));
    }

    #[test]
    fn test_split_invented_item_rejected() {
        let parent = vec![line("Chai", 250, 1)];
        let groups = vec![vec![line("Chai", 250, 1)], vec![line("Kebab", 900, 1)]];
        let err = validate_split(&parent, &groups).unwrap_err();
        assert!(matches!(err, CoreError::SplitMismatch { .. }));
    }

    #[test]
    fn test_split_needs_two_groups() {
        let parent = vec![line("Chai", 250, 1)];
        let groups = vec![vec![line("Chai", 250, 1)]];
        assert!(matches!(
            validate_split(&parent, &groups),
            Err(CoreError::NotEnoughSplitGroups { got: 1 })
        ));
    }

    #[test]
    fn test_split_same_name_different_price_are_distinct() {
        // Price is part of line identity
        let parent = vec![line("Chai", 250, 1), line("Chai", 300, 1)];
        let groups = vec![vec![line("Chai", 250, 1)], vec![line("Chai", 250, 1)]];
        assert!(validate_split(&parent, &groups).is_err());

        let ok_groups = vec![vec![line("Chai", 250, 1)], vec![line("Chai", 300, 1)]];
        assert!(validate_split(&parent, &ok_groups).is_ok());
    }

    #[test]
    fn test_group_total() {
        let group = vec![line("Chai", 250, 2), line("Samosa", 150, 1)];
        assert_eq!(group_total(&group).cents(), 650);
    }

    #[test]
    fn test_refund_quantity_bounds() {
        // More than sold: rejected
        assert!(validate_refund(500, 3, 4).is_err());
        assert!(validate_refund(500, 3, 0).is_err());

        // Exactly the sold quantity: full amount
        assert_eq!(validate_refund(500, 3, 3).unwrap().cents(), 1500);
        // Partial
        assert_eq!(validate_refund(500, 3, 2).unwrap().cents(), 1000);
    }
}
