//! Data models for storefront entities.
//!
//! This module contains strongly-typed representations of products, cart
//! and wishlist lines, shipping addresses and seller coupons, plus newtype
//! ID wrappers and enumeration types for constrained values.

mod address;
mod cart_line;
mod coupon;
mod enums;
mod ids;
mod product;
mod wishlist_line;

pub use address::{Address, AddressDraft};
pub use cart_line::CartLine;
pub use coupon::{Coupon, CouponDraft, CouponPatch, normalize_code};
pub use enums::{CouponType, PaymentMethod, ProductSort};
pub use ids::{AddressId, CouponId, ProductId, TransactionId};
pub use product::{Product, Review};
pub use wishlist_line::WishlistLine;

/// Display row for a cart line resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CartDisplayItem {
    /// Resolved product details.
    pub product: Product,
    /// Quantity from the cart line.
    pub quantity: u32,
}

impl CartDisplayItem {
    /// Returns `price × quantity`, or `None` if it does not fit a
    /// [`Decimal`](rust_decimal::Decimal).
    #[inline]
    #[must_use]
    pub fn line_total(&self) -> Option<rust_decimal::Decimal> {
        self.product
            .price
            .checked_mul(rust_decimal::Decimal::from(self.quantity))
    }
}

/// Display row for a wishlist line resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistDisplayItem {
    /// Resolved product details.
    pub product: Product,
    /// When the product was wishlisted.
    pub added_at: chrono::DateTime<chrono::Utc>,
}
