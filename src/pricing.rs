//! Discount and checkout total computation.
//!
//! Pure functions over resolved cart rows and an optional coupon; nothing
//! here touches storage. Amounts that overflow a [`Decimal`] are reported
//! as validation errors.

use rust_decimal::Decimal;

use crate::error::{Result, StorefrontError};
use crate::models::{CartDisplayItem, Coupon, CouponType};

/// Message for a cart whose amounts do not fit a [`Decimal`].
const MSG_TOO_LARGE: &str = "Order amount is too large.";

/// Discount a coupon grants on `subtotal`.
///
/// Percentage coupons take `subtotal × value / 100` exactly; fixed coupons
/// never take more than the subtotal.
#[inline]
#[must_use]
pub fn coupon_discount(coupon: &Coupon, subtotal: Decimal) -> Decimal {
    match coupon.kind {
        CouponType::Percentage => {
            let rate = coupon.discount_value / Decimal::ONE_HUNDRED;
            subtotal.saturating_mul(rate).min(subtotal)
        }
        CouponType::Fixed => coupon.discount_value.min(subtotal),
    }
}

/// Sum of `price × quantity` over resolved cart rows.
///
/// # Errors
///
/// Returns [`StorefrontError::Validation`] if a line total or the sum
/// overflows.
#[inline]
pub fn subtotal(items: &[CartDisplayItem]) -> Result<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |sum, item| {
        item.line_total()
            .and_then(|line| sum.checked_add(line))
            .ok_or_else(|| StorefrontError::validation(MSG_TOO_LARGE))
    })
}

/// `subtotal − discount`, never below zero.
#[inline]
#[must_use]
pub fn total(subtotal: Decimal, discount: Decimal) -> Decimal {
    subtotal.saturating_sub(discount).max(Decimal::ZERO)
}

/// A coupon accepted for the current checkout, with the discount it was
/// worth when applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    /// Uppercase code shown to the buyer.
    pub code: String,
    /// Discount computed against the subtotal at apply time.
    pub discount_amount: Decimal,
    /// The coupon as stored.
    pub coupon: Coupon,
}

impl AppliedCoupon {
    /// Applies `coupon` to `subtotal`.
    #[inline]
    #[must_use]
    pub fn new(coupon: Coupon, subtotal: Decimal) -> Self {
        Self {
            code: coupon.code.clone(),
            discount_amount: coupon_discount(&coupon, subtotal),
            coupon,
        }
    }
}

/// Figures shown on the order summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    /// Pre-discount sum of all lines.
    pub subtotal: Decimal,
    /// Coupon discount against the current subtotal.
    pub discount: Decimal,
    /// Amount to pay.
    pub total: Decimal,
}

impl CheckoutSummary {
    /// Computes the summary for `items`, recomputing the discount of
    /// `coupon` (if any) against their subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] if the subtotal overflows.
    #[inline]
    pub fn compute(items: &[CartDisplayItem], coupon: Option<&Coupon>) -> Result<Self> {
        let subtotal = subtotal(items)?;
        let discount = coupon.map_or(Decimal::ZERO, |applied| coupon_discount(applied, subtotal));
        Ok(Self {
            subtotal,
            discount,
            total: total(subtotal, discount),
        })
    }
}
