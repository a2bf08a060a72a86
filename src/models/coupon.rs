//! Seller coupon models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CouponId, CouponType};
use crate::error::{Result, StorefrontError};

/// Shortest accepted coupon code.
const MIN_CODE_LEN: usize = 3;
/// Longest accepted coupon code.
const MAX_CODE_LEN: usize = 50;

/// A discount code managed by the seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Unique identifier.
    pub id: CouponId,
    /// Uppercase code the buyer types in.
    pub code: String,
    /// How `discount_value` is applied.
    #[serde(rename = "type")]
    pub kind: CouponType,
    /// Percentage (1-100) or flat amount, depending on `kind`.
    pub discount_value: Decimal,
    /// Minimum pre-discount subtotal for the coupon to apply.
    pub min_purchase_amount: Option<Decimal>,
    /// Whether the seller has the coupon switched on.
    pub is_active: bool,
    /// Start of the validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window.
    pub valid_until: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Returns `true` if `code` matches this coupon, ignoring case.
    #[inline]
    #[must_use]
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Returns the seller-editable fields of this coupon as a draft.
    #[inline]
    #[must_use]
    pub fn to_draft(&self) -> CouponDraft {
        CouponDraft {
            code: self.code.clone(),
            kind: self.kind,
            discount_value: self.discount_value,
            min_purchase_amount: self.min_purchase_amount,
            is_active: self.is_active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }

    /// Applies a patch in place. The caller is responsible for validating
    /// the result and for code uniqueness.
    pub(crate) fn apply_patch(&mut self, patch: CouponPatch) {
        if let Some(code) = patch.code {
            self.code = normalize_code(&code);
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(value) = patch.discount_value {
            self.discount_value = value;
        }
        if let Some(min) = patch.min_purchase_amount {
            self.min_purchase_amount = min.filter(|amount| !amount.is_zero());
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        if let Some(from) = patch.valid_from {
            self.valid_from = from;
        }
        if let Some(until) = patch.valid_until {
            self.valid_until = until;
        }
    }
}

/// Seller-supplied fields for a new coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDraft {
    /// Code as typed; normalized to uppercase when stored.
    pub code: String,
    /// How `discount_value` is applied.
    #[serde(rename = "type")]
    pub kind: CouponType,
    /// Percentage (1-100) or flat amount.
    pub discount_value: Decimal,
    /// Minimum subtotal; zero is treated as "no minimum".
    pub min_purchase_amount: Option<Decimal>,
    /// Whether the coupon starts switched on.
    pub is_active: bool,
    /// Start of the validity window.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window.
    pub valid_until: Option<DateTime<Utc>>,
}

impl CouponDraft {
    /// Creates an active draft with no minimum and no validity window.
    #[inline]
    #[must_use]
    pub fn new<T: Into<String>>(code: T, kind: CouponType, discount_value: Decimal) -> Self {
        Self {
            code: code.into(),
            kind,
            discount_value,
            min_purchase_amount: None,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    /// Sets the minimum purchase amount.
    #[inline]
    #[must_use]
    pub const fn min_purchase(mut self, amount: Decimal) -> Self {
        self.min_purchase_amount = Some(amount);
        self
    }

    /// Sets the validity window; either end may be open.
    #[inline]
    #[must_use]
    pub const fn valid_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    /// Checks the draft against the coupon form rules.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] describing the first rule
    /// that fails.
    pub fn validate(&self) -> Result<()> {
        validate_code(&self.code)?;
        if self.discount_value <= Decimal::ZERO {
            return Err(StorefrontError::validation("Discount value must be positive."));
        }
        if self.kind == CouponType::Percentage && self.discount_value > Decimal::ONE_HUNDRED {
            return Err(StorefrontError::validation(
                "Percentage discount must be between 1 and 100.",
            ));
        }
        if self
            .min_purchase_amount
            .is_some_and(|amount| amount < Decimal::ZERO)
        {
            return Err(StorefrontError::validation("Minimum purchase amount cannot be negative."));
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until)
            && until < from
        {
            return Err(StorefrontError::validation(
                "Valid 'until' date cannot be before 'from' date.",
            ));
        }
        Ok(())
    }

    /// Builds a stored coupon from this draft with a normalized code.
    #[must_use]
    pub(crate) fn into_coupon(self, id: CouponId) -> Coupon {
        Coupon {
            id,
            code: normalize_code(&self.code),
            kind: self.kind,
            discount_value: self.discount_value,
            min_purchase_amount: self.min_purchase_amount.filter(|amount| !amount.is_zero()),
            is_active: self.is_active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }
}

/// Partial update for an existing coupon. `None` leaves a field alone;
/// for the optional fields, `Some(None)` clears them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CouponPatch {
    /// New code.
    pub code: Option<String>,
    /// New discount kind.
    pub kind: Option<CouponType>,
    /// New discount value.
    pub discount_value: Option<Decimal>,
    /// New minimum purchase amount.
    pub min_purchase_amount: Option<Option<Decimal>>,
    /// New active flag.
    pub is_active: Option<bool>,
    /// New window start.
    pub valid_from: Option<Option<DateTime<Utc>>>,
    /// New window end.
    pub valid_until: Option<Option<DateTime<Utc>>>,
}

/// Uppercases and trims a coupon code.
#[inline]
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Codes: 3-50 characters of letters, digits, underscores and hyphens.
fn validate_code(code: &str) -> Result<()> {
    let trimmed = code.trim();
    let len = trimmed.chars().count();
    if len < MIN_CODE_LEN {
        return Err(StorefrontError::validation("Coupon code must be at least 3 characters."));
    }
    if len > MAX_CODE_LEN {
        return Err(StorefrontError::validation("Coupon code cannot exceed 50 characters."));
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(StorefrontError::validation(
            "Coupon code can only contain letters, numbers, underscores, and hyphens.",
        ));
    }
    Ok(())
}
