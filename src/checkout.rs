//! Checkout session: coupon application, order summary and payment.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::cart::Cart;
use crate::coupon::{CouponStore, CouponValidation};
use crate::error::{Result, StorefrontError};
use crate::models::{Address, CartDisplayItem, TransactionId};
use crate::payment::{PaymentGateway, PaymentInfo};
use crate::pricing::{self, AppliedCoupon, CheckoutSummary};
use crate::storage::Storage;

/// Days between placing an order and its estimated delivery.
const DELIVERY_DAYS: i64 = 5;

/// Message shown when the coupon field is blank.
const MSG_BLANK_CODE: &str = "Please enter a coupon code.";

/// Fallback message for a decline without gateway detail.
const MSG_DECLINED: &str = "Payment failed. Please try again.";

/// Confirmation of a paid order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    /// Gateway transaction id.
    pub transaction_id: Option<TransactionId>,
    /// Amounts that were charged.
    pub summary: CheckoutSummary,
    /// Code of the coupon that was applied, if any.
    pub coupon_code: Option<String>,
    /// Rows that were paid for.
    pub items: Vec<CartDisplayItem>,
    /// Shipping address.
    pub address: Address,
    /// When the payment went through.
    pub placed_at: DateTime<Utc>,
    /// Estimated delivery time.
    pub estimated_delivery: DateTime<Utc>,
}

/// One buyer's checkout in progress.
///
/// Holds at most one applied coupon. The coupon is dropped when it is
/// removed, when a later code fails validation, when the cart empties, or
/// when the order is paid.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    /// Currently applied coupon.
    applied: Option<AppliedCoupon>,
}

impl Checkout {
    /// Starts a checkout with no coupon.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { applied: None }
    }

    /// Validates `code` against the cart subtotal and applies it on
    /// success. A failed validation also drops any previously applied
    /// coupon.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] if `code` is blank. An
    /// unknown or inapplicable code is not an error; see
    /// [`CouponValidation::is_valid`].
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn apply_coupon<S: Storage>(
        &mut self,
        store: &CouponStore<S>,
        code: &str,
        items: &[CartDisplayItem],
        now: DateTime<Utc>,
    ) -> Result<CouponValidation> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(StorefrontError::validation(MSG_BLANK_CODE));
        }
        let subtotal = pricing::subtotal(items)?;
        let validation = store.validate_coupon(trimmed, subtotal, now);
        self.applied = validation
            .coupon
            .clone()
            .map(|coupon| AppliedCoupon::new(coupon, subtotal));
        match self.applied.as_ref() {
            Some(applied) => tracing::info!(
                code = %applied.code,
                discount = %applied.discount_amount,
                "coupon applied"
            ),
            None => tracing::info!(reason = %validation.message, "coupon rejected"),
        }
        Ok(validation)
    }

    /// Drops the applied coupon, returning it.
    #[inline]
    pub const fn remove_coupon(&mut self) -> Option<AppliedCoupon> {
        self.applied.take()
    }

    /// The applied coupon, if any.
    #[inline]
    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&AppliedCoupon> {
        self.applied.as_ref()
    }

    /// Subtotal, discount and total for `items`. The discount is
    /// recomputed from the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] if the amounts overflow.
    #[inline]
    pub fn summary(&self, items: &[CartDisplayItem]) -> Result<CheckoutSummary> {
        CheckoutSummary::compute(items, self.applied.as_ref().map(|applied| &applied.coupon))
    }

    /// Drops the applied coupon if the cart has become empty. Returns
    /// `true` if a coupon was dropped.
    #[inline]
    pub fn sync_with_cart<S: Storage>(&mut self, cart: &Cart<S>) -> bool {
        if cart.has_items() {
            return false;
        }
        self.applied.take().is_some()
    }

    /// Pays for `items` and ships them to `address`.
    ///
    /// On success the cart is cleared and the coupon dropped. On decline
    /// nothing changes, so the buyer can retry.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::EmptyCart`] with nothing to pay for,
    /// [`StorefrontError::Validation`] for a zero total,
    /// [`StorefrontError::PaymentDeclined`] when the gateway refuses, or
    /// the gateway's own error.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub async fn place_order<G: PaymentGateway, S: Storage>(
        &mut self,
        gateway: &G,
        cart: &mut Cart<S>,
        items: &[CartDisplayItem],
        address: &Address,
        info: PaymentInfo,
    ) -> Result<OrderReceipt> {
        if !cart.has_items() || items.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        let summary = self.summary(items)?;
        if summary.total <= Decimal::ZERO {
            return Err(StorefrontError::validation("Order total must be greater than zero."));
        }
        let coupon_code = self.applied.as_ref().map(|applied| applied.code.clone());
        let payment = match coupon_code.as_deref() {
            Some(code) => info.with_coupon(code),
            None => info,
        };

        let result = gateway.process_payment(summary.total, &payment).await?;
        if !result.success {
            let reason = result.message.unwrap_or_else(|| MSG_DECLINED.to_owned());
            tracing::warn!(%reason, "payment declined");
            return Err(StorefrontError::PaymentDeclined(reason));
        }

        self.applied = None;
        if let Err(err) = cart.clear_cart() {
            tracing::error!(error = %err, "payment succeeded but the cart could not be cleared");
        }
        let placed_at = Utc::now();
        tracing::info!(
            transaction = ?result.transaction_id,
            total = %summary.total,
            "order placed"
        );
        Ok(OrderReceipt {
            transaction_id: result.transaction_id,
            summary,
            coupon_code,
            items: items.to_vec(),
            address: address.clone(),
            placed_at,
            estimated_delivery: placed_at + TimeDelta::days(DELIVERY_DAYS),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::EventBus;
    use crate::models::{AddressDraft, AddressId, Product, ProductId};
    use crate::payment::MockPaymentGateway;
    use crate::storage::InMemoryStorage;

    struct Fixture {
        store: CouponStore<Arc<InMemoryStorage>>,
        cart: Cart<Arc<InMemoryStorage>>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(InMemoryStorage::new());
        let bus = Arc::new(EventBus::new());
        Fixture {
            store: CouponStore::load(Arc::clone(&storage), Arc::clone(&bus), "coupons").unwrap(),
            cart: Cart::load(storage, bus, "cart").unwrap(),
        }
    }

    fn items(price: i64, quantity: u32) -> Vec<CartDisplayItem> {
        vec![CartDisplayItem {
            product: Product::new("p1", "Shirt", Decimal::from(price)),
            quantity,
        }]
    }

    fn address() -> Address {
        AddressDraft {
            full_name: "Asha Rao".to_owned(),
            street_address: "12 MG Road".to_owned(),
            apartment_suite: None,
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            zip_code: "411001".to_owned(),
            country: "India".to_owned(),
            phone_number: "+91 9876543210".to_owned(),
            is_default: None,
        }
        .into_address(AddressId::from("a1"), true)
    }

    #[test]
    fn blank_code_is_rejected() {
        let fx = fixture();
        let mut checkout = Checkout::new();
        let err = checkout
            .apply_coupon(&fx.store, "   ", &items(100, 2), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "validation error: Please enter a coupon code.");
    }

    #[test]
    fn fixed5_scenario() {
        let fx = fixture();
        let mut checkout = Checkout::new();
        let rows = items(100, 2);
        let validation = checkout
            .apply_coupon(&fx.store, "fixed5", &rows, Utc::now())
            .unwrap();
        assert!(validation.is_valid);
        let applied = checkout.applied_coupon().unwrap();
        assert_eq!(applied.code, "FIXED5");
        assert_eq!(applied.discount_amount, Decimal::from(5));

        let summary = checkout.summary(&rows).unwrap();
        assert_eq!(summary.subtotal, Decimal::from(200));
        assert_eq!(summary.discount, Decimal::from(5));
        assert_eq!(summary.total, Decimal::from(195));
    }

    #[test]
    fn below_minimum_keeps_total() {
        let fx = fixture();
        let mut checkout = Checkout::new();
        let rows = items(20, 2);
        let validation = checkout
            .apply_coupon(&fx.store, "SAVE10", &rows, Utc::now())
            .unwrap();
        assert!(!validation.is_valid);
        assert!(validation.message.starts_with("Minimum purchase of"));
        assert!(checkout.applied_coupon().is_none());
        assert_eq!(checkout.summary(&rows).unwrap().total, Decimal::from(40));
    }

    #[test]
    fn failed_code_drops_previous_coupon() {
        let fx = fixture();
        let mut checkout = Checkout::new();
        let rows = items(100, 1);
        let _ok = checkout
            .apply_coupon(&fx.store, "SAVE10", &rows, Utc::now())
            .unwrap();
        assert!(checkout.applied_coupon().is_some());
        let _bad = checkout
            .apply_coupon(&fx.store, "BOGUS", &rows, Utc::now())
            .unwrap();
        assert!(checkout.applied_coupon().is_none());
    }

    #[test]
    fn summary_recomputes_discount_for_new_subtotal() {
        let fx = fixture();
        let mut checkout = Checkout::new();
        let _ok = checkout
            .apply_coupon(&fx.store, "SAVE10", &items(100, 1), Utc::now())
            .unwrap();
        let summary = checkout.summary(&items(100, 3)).unwrap();
        assert_eq!(summary.discount, Decimal::from(30));
        assert_eq!(summary.total, Decimal::from(270));
    }

    #[test]
    fn empty_cart_clears_coupon() {
        let mut fx = fixture();
        let mut checkout = Checkout::new();
        fx.cart.add_to_cart(&ProductId::from("p1"), 1).unwrap();
        let _ok = checkout
            .apply_coupon(&fx.store, "SAVE10", &items(100, 1), Utc::now())
            .unwrap();
        assert!(!checkout.sync_with_cart(&fx.cart));
        fx.cart.clear_cart().unwrap();
        assert!(checkout.sync_with_cart(&fx.cart));
        assert!(checkout.applied_coupon().is_none());
        assert!(checkout.remove_coupon().is_none());
    }

    #[tokio::test]
    async fn successful_order_clears_cart_and_coupon() {
        let mut fx = fixture();
        let mut checkout = Checkout::new();
        fx.cart.add_to_cart(&ProductId::from("p1"), 2).unwrap();
        let rows = items(100, 2);
        let _ok = checkout
            .apply_coupon(&fx.store, "FIXED5", &rows, Utc::now())
            .unwrap();

        let receipt = checkout
            .place_order(
                &MockPaymentGateway::new(),
                &mut fx.cart,
                &rows,
                &address(),
                PaymentInfo::phonepe(),
            )
            .await
            .unwrap();
        assert_eq!(receipt.summary.total, Decimal::from(195));
        assert_eq!(receipt.coupon_code.as_deref(), Some("FIXED5"));
        assert!(receipt.estimated_delivery > receipt.placed_at);
        assert!(!fx.cart.has_items());
        assert!(checkout.applied_coupon().is_none());
    }

    #[tokio::test]
    async fn declined_payment_changes_nothing() {
        let mut fx = fixture();
        let mut checkout = Checkout::new();
        fx.cart.add_to_cart(&ProductId::from("p1"), 2).unwrap();
        let rows = items(100, 2);
        let _ok = checkout
            .apply_coupon(&fx.store, "FIXED5", &rows, Utc::now())
            .unwrap();

        let err = checkout
            .place_order(
                &MockPaymentGateway::declining("Card expired"),
                &mut fx.cart,
                &rows,
                &address(),
                PaymentInfo::phonepe(),
            )
            .await
            .unwrap_err();
        assert!(matches!(&err, StorefrontError::PaymentDeclined(msg) if msg == "Card expired"));
        assert_eq!(fx.cart.item_count(), 2);
        assert_eq!(checkout.applied_coupon().unwrap().code, "FIXED5");
    }

    #[tokio::test]
    async fn empty_cart_cannot_be_ordered() {
        let mut fx = fixture();
        let mut checkout = Checkout::new();
        let err = checkout
            .place_order(
                &MockPaymentGateway::new(),
                &mut fx.cart,
                &items(100, 1),
                &address(),
                PaymentInfo::phonepe(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::EmptyCart));
    }

    #[tokio::test]
    async fn overflowing_order_is_rejected_before_payment() {
        let mut fx = fixture();
        let mut checkout = Checkout::new();
        fx.cart.add_to_cart(&ProductId::from("p1"), u32::MAX).unwrap();
        let rows = vec![CartDisplayItem {
            product: Product::new("p1", "Shirt", Decimal::MAX),
            quantity: u32::MAX,
        }];

        let err = checkout
            .apply_coupon(&fx.store, "SAVE10", &rows, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));

        let err = checkout
            .place_order(
                &MockPaymentGateway::new(),
                &mut fx.cart,
                &rows,
                &address(),
                PaymentInfo::phonepe(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "validation error: Order amount is too large.");
        assert_eq!(fx.cart.item_quantity(&ProductId::from("p1")), u32::MAX);
    }
}
