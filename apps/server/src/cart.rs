//! Cart resolution shared by checkout, order edits, table drafts, and
//! the discount quote endpoint.
//!
//! Clients send product ids and quantities only; prices and names are
//! always snapshotted from the catalog here. Totals are never trusted
//! from the wire.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::AppState;
use chai_core::pricing::{self, OrderDiscount};
use chai_core::{
    validation, CoreError, DiscountRule, LineDiscountMap, OrderDiscountKind, OrderLine,
};

/// One cart line as sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Order-level discount as sent by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDiscountRequest {
    pub kind: OrderDiscountKind,
    pub value: Option<i64>,
    pub promo_code: Option<String>,
}

/// Resolves cart lines into catalog-priced snapshots with categories.
pub async fn resolve_lines(
    state: &AppState,
    requests: &[CartLineRequest],
) -> ApiResult<Vec<(OrderLine, String)>> {
    validation::validate_order_size(requests.len())?;

    let mut lines = Vec::with_capacity(requests.len());
    for req in requests {
        validation::validate_quantity(req.quantity)?;

        let product = state
            .db
            .products()
            .get_by_id(&req.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(req.product_id.clone()))?;

        lines.push((
            OrderLine {
                product_id: product.id,
                name: product.name,
                unit_price_cents: product.price_cents,
                quantity: req.quantity,
                image: product.image,
            },
            product.category,
        ));
    }

    Ok(lines)
}

/// Resolves the requested order-level discount against the cart.
///
/// For promo codes this validates the code against the line-discounted
/// amount (the same base the discount is later computed on) and returns
/// the code so checkout can consume a use atomically.
pub async fn resolve_order_discount(
    state: &AppState,
    request: Option<&OrderDiscountRequest>,
    lines: &[(OrderLine, String)],
    manual_discounts: &LineDiscountMap,
    rules: &[DiscountRule],
    now: DateTime<Utc>,
) -> ApiResult<(OrderDiscount, OrderDiscountKind, Option<String>)> {
    let Some(request) = request else {
        return Ok((OrderDiscount::None, OrderDiscountKind::None, None));
    };

    match request.kind {
        OrderDiscountKind::None => Ok((OrderDiscount::None, OrderDiscountKind::None, None)),

        OrderDiscountKind::Percentage => {
            let bps = required_value(request)?;
            validation::validate_bps("discount", bps)?;
            Ok((
                OrderDiscount::Percentage(bps),
                OrderDiscountKind::Percentage,
                None,
            ))
        }

        OrderDiscountKind::Flat => {
            let cents = required_value(request)?;
            validation::validate_price_cents(cents)?;
            Ok((OrderDiscount::Flat(cents), OrderDiscountKind::Flat, None))
        }

        OrderDiscountKind::Promo => {
            let code = request.promo_code.as_deref().ok_or_else(|| {
                ApiError::bad_request(ErrorCode::ValidationFailed, "promoCode is required")
            })?;

            let promo = state
                .db
                .promos()
                .find_by_code(code)
                .await?
                .ok_or(CoreError::Promo(chai_core::PromoError::NotFound))?;

            let base = pricing::order_totals(
                lines,
                manual_discounts,
                rules,
                &OrderDiscount::None,
                now,
            )
            .final_total_cents;
            pricing::validate_promo(&promo, base, now).map_err(CoreError::Promo)?;

            Ok((
                OrderDiscount::Promo {
                    kind: promo.kind,
                    value: promo.value,
                    code: promo.code.clone(),
                },
                OrderDiscountKind::Promo,
                Some(promo.code),
            ))
        }
    }
}

fn required_value(request: &OrderDiscountRequest) -> ApiResult<i64> {
    request.value.ok_or_else(|| {
        ApiError::bad_request(ErrorCode::ValidationFailed, "discount value is required")
    })
}
