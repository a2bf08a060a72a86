//! Seller coupon store and the buyer-facing coupon validator.
//!
//! The store is an explicit object over an injected [`Storage`] backend.
//! It hydrates once on [`CouponStore::load`], seeding a small set of demo
//! coupons when nothing is stored, and writes the whole list back after
//! every change.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, StorefrontEvent};
use crate::models::{Coupon, CouponDraft, CouponId, CouponPatch, CouponType};
use crate::storage::{self, Storage};

/// Currency symbol used in validator messages unless overridden.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";

/// Validator message for an unknown code.
const MSG_INVALID: &str = "Invalid coupon code.";
/// Validator message for a switched-off coupon.
const MSG_INACTIVE: &str = "This coupon is currently inactive.";
/// Validator message for a coupon whose window has not opened.
const MSG_NOT_YET_ACTIVE: &str = "This coupon is not yet active.";
/// Validator message for a coupon whose window has closed.
const MSG_EXPIRED: &str = "This coupon has expired.";
/// Validator message for an applicable coupon.
const MSG_APPLIED: &str = "Coupon applied successfully!";

/// Outcome of [`CouponStore::validate_coupon`].
///
/// Unknown or inapplicable codes are not errors; they come back with
/// `is_valid == false` and a message meant for the buyer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponValidation {
    /// Whether the coupon can be applied.
    pub is_valid: bool,
    /// Buyer-facing explanation.
    pub message: String,
    /// The matched coupon, present only when valid.
    pub coupon: Option<Coupon>,
}

impl CouponValidation {
    /// A failed validation with the given message.
    fn rejected<T: Into<String>>(message: T) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
            coupon: None,
        }
    }
}

/// Demo coupons written on first use: two live ones, one expired
/// yesterday and one opening in two days.
#[inline]
#[must_use]
pub fn default_coupons(now: DateTime<Utc>) -> Vec<Coupon> {
    vec![
        Coupon {
            id: CouponId::from("c1"),
            code: "SAVE10".to_owned(),
            kind: CouponType::Percentage,
            discount_value: Decimal::from(10_i32),
            min_purchase_amount: Some(Decimal::from(50_i32)),
            is_active: true,
            valid_from: None,
            valid_until: None,
        },
        Coupon {
            id: CouponId::from("c2"),
            code: "FIXED5".to_owned(),
            kind: CouponType::Fixed,
            discount_value: Decimal::from(5_i32),
            min_purchase_amount: Some(Decimal::from(20_i32)),
            is_active: true,
            valid_from: None,
            valid_until: None,
        },
        Coupon {
            id: CouponId::from("c3"),
            code: "EXPIRED".to_owned(),
            kind: CouponType::Percentage,
            discount_value: Decimal::from(15_i32),
            min_purchase_amount: None,
            is_active: true,
            valid_from: None,
            valid_until: Some(now - TimeDelta::days(1)),
        },
        Coupon {
            id: CouponId::from("c4"),
            code: "FUTURE".to_owned(),
            kind: CouponType::Fixed,
            discount_value: Decimal::from(10_i32),
            min_purchase_amount: None,
            is_active: true,
            valid_from: Some(now + TimeDelta::days(2)),
            valid_until: None,
        },
    ]
}

/// Seller-managed coupons, shared read-only with buyers.
#[derive(Debug)]
pub struct CouponStore<S> {
    /// Backend the coupon list is persisted to.
    storage: S,
    /// Bus notified after every write.
    bus: Arc<EventBus>,
    /// Storage key of the coupon list.
    key: String,
    /// Symbol prefixed to amounts in validator messages.
    currency_symbol: String,
    /// Coupons in creation order.
    coupons: Vec<Coupon>,
}

impl<S: Storage> CouponStore<S> {
    /// Hydrates the store from `key`.
    ///
    /// When nothing is stored, or the stored list cannot be parsed, the
    /// [`default_coupons`] are written and used instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn load<T: Into<String>>(storage: S, bus: Arc<EventBus>, key: T) -> Result<Self> {
        let mut store = Self {
            storage,
            bus,
            key: key.into(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
            coupons: Vec::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Overrides the currency symbol used in validator messages.
    #[inline]
    #[must_use]
    pub fn with_currency_symbol<T: Into<String>>(mut self, symbol: T) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Re-reads the list from storage, seeding defaults if it is missing
    /// or corrupt.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails.
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        match storage::load_json::<Vec<Coupon>, _>(&self.storage, &self.key) {
            Ok(Some(coupons)) => {
                self.coupons = coupons;
                Ok(())
            }
            Ok(None) => {
                tracing::info!("no stored coupons, seeding defaults");
                self.commit(default_coupons(Utc::now()))
            }
            Err(StorefrontError::Serialization(err)) => {
                tracing::error!(
                    error = %err,
                    "failed to parse stored coupons, resetting to defaults"
                );
                self.commit(default_coupons(Utc::now()))
            }
            Err(err) => Err(err),
        }
    }

    /// All coupons in creation order.
    #[inline]
    #[must_use]
    pub fn fetch_all(&self) -> &[Coupon] {
        &self.coupons
    }

    /// Looks a coupon up by code, ignoring case.
    #[inline]
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Coupon> {
        self.coupons.iter().find(|coupon| coupon.matches_code(code))
    }

    /// Looks a coupon up by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &CouponId) -> Option<&Coupon> {
        self.coupons.iter().find(|coupon| coupon.id == *id)
    }

    /// Validates and stores a new coupon with an uppercase code and a fresh
    /// id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] for an invalid draft,
    /// [`StorefrontError::DuplicateCouponCode`] if the code is taken, or a
    /// storage error.
    #[tracing::instrument(skip_all, fields(code = %draft.code))]
    #[inline]
    pub fn add_coupon(&mut self, draft: CouponDraft) -> Result<Coupon> {
        draft.validate()?;
        if self.find_by_code(&draft.code).is_some() {
            return Err(StorefrontError::DuplicateCouponCode(draft.code));
        }
        let coupon = draft.into_coupon(CouponId::generate());
        let mut coupons = self.coupons.clone();
        coupons.push(coupon.clone());
        self.commit(coupons)?;
        Ok(coupon)
    }

    /// Applies a partial update. Returns `Ok(None)` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] if the updated coupon is
    /// invalid, [`StorefrontError::DuplicateCouponCode`] if the new code
    /// belongs to another coupon, or a storage error.
    #[tracing::instrument(skip_all, fields(id = %id))]
    #[inline]
    pub fn update_coupon(&mut self, id: &CouponId, patch: CouponPatch) -> Result<Option<Coupon>> {
        let Some(current) = self.get(id) else {
            return Ok(None);
        };
        if let Some(code) = patch.code.as_deref() {
            let taken = self
                .coupons
                .iter()
                .any(|other| other.id != *id && other.matches_code(code));
            if taken {
                return Err(StorefrontError::DuplicateCouponCode(code.to_owned()));
            }
        }
        let mut updated = current.clone();
        updated.apply_patch(patch);
        updated.to_draft().validate()?;
        let coupons = self
            .coupons
            .iter()
            .map(|coupon| {
                if coupon.id == *id {
                    updated.clone()
                } else {
                    coupon.clone()
                }
            })
            .collect();
        self.commit(coupons)?;
        Ok(Some(updated))
    }

    /// Deletes a coupon. Returns `false` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all, fields(id = %id))]
    #[inline]
    pub fn remove_coupon(&mut self, id: &CouponId) -> Result<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let coupons = self
            .coupons
            .iter()
            .filter(|coupon| coupon.id != *id)
            .cloned()
            .collect();
        self.commit(coupons)?;
        Ok(true)
    }

    /// Checks whether `code` can be applied to a cart worth `subtotal` at
    /// time `now`. The first failing rule decides the message: unknown
    /// code, inactive, not yet valid, expired, then minimum purchase.
    #[inline]
    #[must_use]
    pub fn validate_coupon(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> CouponValidation {
        let Some(coupon) = self.find_by_code(code) else {
            return CouponValidation::rejected(MSG_INVALID);
        };
        if !coupon.is_active {
            return CouponValidation::rejected(MSG_INACTIVE);
        }
        if coupon.valid_from.is_some_and(|from| now < from) {
            return CouponValidation::rejected(MSG_NOT_YET_ACTIVE);
        }
        if coupon.valid_until.is_some_and(|until| now > until) {
            return CouponValidation::rejected(MSG_EXPIRED);
        }
        if let Some(min) = coupon.min_purchase_amount
            && min > Decimal::ZERO
            && subtotal < min
        {
            return CouponValidation::rejected(format!(
                "Minimum purchase of {}{min:.2} required for this coupon.",
                self.currency_symbol
            ));
        }
        CouponValidation {
            is_valid: true,
            message: MSG_APPLIED.to_owned(),
            coupon: Some(coupon.clone()),
        }
    }

    /// Storage key the list is persisted under.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persists `coupons`, then commits them and notifies subscribers.
    fn commit(&mut self, coupons: Vec<Coupon>) -> Result<()> {
        storage::save_json(&self.storage, &self.key, &coupons)?;
        self.coupons = coupons;
        tracing::debug!(coupons = self.coupons.len(), "coupons saved");
        self.bus.publish(&StorefrontEvent::CouponsChanged);
        Ok(())
    }
}
