//! # Loyalty Module
//!
//! Two independent loyalty mechanisms, both pure here:
//!
//! 1. **Visit punch-card**: every completed order with a customer attached
//!    counts one visit; at [`crate::FREE_ITEM_VISIT_THRESHOLD`] visits the
//!    customer becomes eligible for a free item. Redemption resets the
//!    card to zero.
//! 2. **Points**: a tiered account with an append-only ledger. Redemption
//!    converts points to a monetary value via the tier's redemption rate.
//!
//! The earn side of the points ledger (crediting points on checkout) is
//! intentionally not wired to any operation: tiers carry an earn rate and
//! the ledger accepts `earned`/`bonus` rows, but the rate at which a
//! purchase earns points is still an open product decision.

use crate::error::{CoreError, CoreResult};
use crate::types::RewardTier;
use crate::FREE_ITEM_VISIT_THRESHOLD;

// =============================================================================
// Visit Punch-Card
// =============================================================================

/// Records one visit.
///
/// Returns the new `(visits, free_item_eligible)` pair. Eligibility flips
/// in the same update that reaches the threshold and stays set until
/// redeemed.
pub fn record_visit(visits: i64, eligible: bool) -> (i64, bool) {
    let new_visits = visits + 1;
    (new_visits, eligible || new_visits >= FREE_ITEM_VISIT_THRESHOLD)
}

/// Redeems the free item, resetting the punch-card.
///
/// Returns the reset `(visits, free_item_eligible)` pair, or
/// [`CoreError::NotEligible`] when the customer has not earned it.
pub fn redeem_free_item(eligible: bool) -> CoreResult<(i64, bool)> {
    if !eligible {
        return Err(CoreError::NotEligible);
    }
    Ok((0, false))
}

// =============================================================================
// Points and Tiers
// =============================================================================

/// Finds the tier for a cumulative earned-points total: the highest rung
/// whose `min_points` the total has reached.
///
/// `tiers` must be the ladder in ascending `min_points` order, as seeded.
pub fn tier_for_points(tiers: &[RewardTier], total_earned: i64) -> Option<&RewardTier> {
    tiers
        .iter()
        .filter(|t| total_earned >= t.min_points)
        .max_by_key(|t| t.min_points)
}

/// Validates a point redemption against the current balance.
///
/// Returns the new balance; the caller appends the negative ledger row
/// and computes the monetary value via
/// [`crate::pricing::redemption_value`].
pub fn redeem_points(balance: i64, points: i64) -> CoreResult<i64> {
    if points <= 0 {
        return Err(CoreError::Validation(
            crate::error::ValidationError::MustBePositive {
                field: "points".to_string(),
            },
        ));
    }
    if points > balance {
        return Err(CoreError::InsufficientBalance {
            balance,
            requested: points,
        });
    }
    Ok(balance - points)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<RewardTier> {
        vec![
            RewardTier {
                name: "Bronze".to_string(),
                min_points: 0,
                earn_rate_bps: 10000,
                redemption_rate_bps: 100,
                discount_bps: 0,
            },
            RewardTier {
                name: "Silver".to_string(),
                min_points: 1000,
                earn_rate_bps: 12000,
                redemption_rate_bps: 150,
                discount_bps: 500,
            },
            RewardTier {
                name: "Gold".to_string(),
                min_points: 5000,
                earn_rate_bps: 15000,
                redemption_rate_bps: 200,
                discount_bps: 1000,
            },
            RewardTier {
                name: "Platinum".to_string(),
                min_points: 15000,
                earn_rate_bps: 20000,
                redemption_rate_bps: 250,
                discount_bps: 1500,
            },
        ]
    }

    #[test]
    fn test_visit_threshold_flips_in_same_update() {
        // Ninth → tenth visit grants eligibility atomically
        let (visits, eligible) = record_visit(9, false);
        assert_eq!(visits, 10);
        assert!(eligible);
    }

    #[test]
    fn test_visits_below_threshold_not_eligible() {
        let (visits, eligible) = record_visit(3, false);
        assert_eq!(visits, 4);
        assert!(!eligible);
    }

    #[test]
    fn test_eligibility_sticks_past_threshold() {
        let (visits, eligible) = record_visit(10, true);
        assert_eq!(visits, 11);
        assert!(eligible);
    }

    #[test]
    fn test_redeem_free_item_resets() {
        assert_eq!(redeem_free_item(true).unwrap(), (0, false));
        assert!(matches!(redeem_free_item(false), Err(CoreError::NotEligible)));
    }

    #[test]
    fn test_tier_for_points() {
        let tiers = ladder();
        assert_eq!(tier_for_points(&tiers, 0).unwrap().name, "Bronze");
        assert_eq!(tier_for_points(&tiers, 999).unwrap().name, "Bronze");
        assert_eq!(tier_for_points(&tiers, 1000).unwrap().name, "Silver");
        assert_eq!(tier_for_points(&tiers, 7500).unwrap().name, "Gold");
        assert_eq!(tier_for_points(&tiers, 20000).unwrap().name, "Platinum");
    }

    #[test]
    fn test_redeem_points_balance_check() {
        assert_eq!(redeem_points(500, 200).unwrap(), 300);
        assert!(matches!(
            redeem_points(100, 200),
            Err(CoreError::InsufficientBalance {
                balance: 100,
                requested: 200
            })
        ));
        assert!(redeem_points(100, 0).is_err());
    }
}
