//! Storage key naming.

/// User segment used when nobody is signed in.
pub const GUEST_USER: &str = "guest";

/// Default key prefix, shared with the web storefront's local storage.
pub const DEFAULT_KEY_PREFIX: &str = "nxtbazaar";

/// Builds the per-purpose, per-user keys under which state is stored.
///
/// Cart, wishlist, addresses and the selected checkout address are scoped
/// to a user; coupons and home content are shared by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Prefix for every key.
    prefix: String,
    /// User segment (e-mail or [`GUEST_USER`]).
    user: String,
}

impl Default for StorageKeys {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, None)
    }
}

impl StorageKeys {
    /// Creates keys for the given prefix and user; `None` means a guest
    /// session.
    #[inline]
    #[must_use]
    pub fn new(prefix: &str, user: Option<&str>) -> Self {
        let segment = user
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map_or_else(|| GUEST_USER.to_owned(), str::to_lowercase);
        Self {
            prefix: prefix.to_owned(),
            user: segment,
        }
    }

    /// Returns the user segment.
    #[inline]
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns `true` for an anonymous session.
    #[inline]
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.user == GUEST_USER
    }

    /// Key of the user's cart lines.
    #[inline]
    #[must_use]
    pub fn cart(&self) -> String {
        format!("{}-cart-{}", self.prefix, self.user)
    }

    /// Key of the user's wishlist lines.
    #[inline]
    #[must_use]
    pub fn wishlist(&self) -> String {
        format!("{}-wishlist-{}", self.prefix, self.user)
    }

    /// Key of the user's saved addresses.
    #[inline]
    #[must_use]
    pub fn addresses(&self) -> String {
        format!("{}-addresses-{}", self.prefix, self.user)
    }

    /// Key of the address chosen for the current checkout.
    #[inline]
    #[must_use]
    pub fn selected_checkout_address(&self) -> String {
        format!("{}-selected-checkout-address-{}", self.prefix, self.user)
    }

    /// Key of the seller's coupon list.
    #[inline]
    #[must_use]
    pub fn coupons(&self) -> String {
        format!("{}-coupons", self.prefix)
    }

    /// Key of the home page banner image URL.
    #[inline]
    #[must_use]
    pub fn home_image_url(&self) -> String {
        format!("{}-home-image-url", self.prefix)
    }
}
