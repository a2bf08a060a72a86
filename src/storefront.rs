//! Session facade tying every aggregate to one storage backend.
//!
//! A [`Storefront`] owns the cart, wishlist, address book, coupon store,
//! home content and checkout of a single user session. They all share the
//! same [`Storage`] backend and [`EventBus`], so a subscriber sees every
//! change regardless of which aggregate made it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::address_book::AddressBook;
use crate::cart::Cart;
use crate::catalog::ProductCatalog;
use crate::checkout::{Checkout, OrderReceipt};
use crate::config::StorefrontConfig;
use crate::coupon::{CouponStore, CouponValidation, DEFAULT_CURRENCY_SYMBOL};
use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, StorefrontEvent};
use crate::home_content::HomeContent;
use crate::models::{CartDisplayItem, WishlistDisplayItem};
use crate::payment::{PaymentGateway, PaymentInfo};
use crate::resolve::{LineResolver, Resolved};
use crate::storage::{DEFAULT_KEY_PREFIX, Storage, StorageKeys};
use crate::wishlist::Wishlist;

/// Builder for a [`Storefront`].
#[derive(Debug)]
pub struct StorefrontBuilder<S> {
    /// Storage backend.
    storage: Option<Arc<S>>,
    /// Event bus to share with other components.
    bus: Option<Arc<EventBus>>,
    /// Signed-in user.
    user: Option<String>,
    /// Storage key prefix.
    key_prefix: String,
    /// Currency symbol for validator messages.
    currency_symbol: String,
}

impl<S: Storage> StorefrontBuilder<S> {
    /// Sets the storage backend.
    #[inline]
    #[must_use]
    pub fn storage(mut self, storage: S) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Sets a storage backend that is also used elsewhere.
    #[inline]
    #[must_use]
    pub fn shared_storage(mut self, storage: Arc<S>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses an existing event bus instead of a fresh one.
    #[inline]
    #[must_use]
    pub fn bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Scopes per-user state to `email`.
    #[inline]
    #[must_use]
    pub fn user<T: Into<String>>(mut self, email: T) -> Self {
        self.user = Some(email.into());
        self
    }

    /// Overrides the storage key prefix.
    #[inline]
    #[must_use]
    pub fn key_prefix<T: Into<String>>(mut self, prefix: T) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Overrides the currency symbol used in messages.
    #[inline]
    #[must_use]
    pub fn currency_symbol<T: Into<String>>(mut self, symbol: T) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Applies user, key prefix and currency symbol from `config`.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: &StorefrontConfig) -> Self {
        self.user.clone_from(&config.user);
        self.key_prefix.clone_from(&config.key_prefix);
        self.currency_symbol.clone_from(&config.currency_symbol);
        self
    }

    /// Loads every aggregate from storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Configuration`] if no storage was set,
    /// or a storage error if hydrating fails.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn build(self) -> Result<Storefront<S>> {
        let storage = self.storage.ok_or_else(|| {
            StorefrontError::Configuration("storage backend is required".to_owned())
        })?;
        let bus = self.bus.unwrap_or_default();
        let keys = StorageKeys::new(&self.key_prefix, self.user.as_deref());
        tracing::debug!(user = keys.user(), "opening storefront session");

        let cart = Cart::load(Arc::clone(&storage), Arc::clone(&bus), keys.cart())?;
        let wishlist = Wishlist::load(Arc::clone(&storage), Arc::clone(&bus), keys.wishlist())?;
        let addresses = AddressBook::load(
            Arc::clone(&storage),
            Arc::clone(&bus),
            keys.addresses(),
            keys.selected_checkout_address(),
        )?;
        let coupons = CouponStore::load(Arc::clone(&storage), Arc::clone(&bus), keys.coupons())?
            .with_currency_symbol(self.currency_symbol);
        let home =
            HomeContent::load(Arc::clone(&storage), Arc::clone(&bus), keys.home_image_url())?;

        Ok(Storefront {
            storage,
            bus,
            keys,
            cart,
            wishlist,
            addresses,
            coupons,
            home,
            checkout: Checkout::new(),
            cart_resolver: LineResolver::new(),
            wishlist_resolver: LineResolver::new(),
        })
    }
}

/// One user's storefront session.
#[derive(Debug)]
pub struct Storefront<S> {
    /// Shared storage backend.
    storage: Arc<S>,
    /// Shared event bus.
    bus: Arc<EventBus>,
    /// Keys of this session's state.
    keys: StorageKeys,
    /// Shopping cart.
    cart: Cart<Arc<S>>,
    /// Wishlist.
    wishlist: Wishlist<Arc<S>>,
    /// Saved addresses.
    addresses: AddressBook<Arc<S>>,
    /// Seller coupons.
    coupons: CouponStore<Arc<S>>,
    /// Home banner.
    home: HomeContent<Arc<S>>,
    /// Checkout in progress.
    checkout: Checkout,
    /// Generations of cart row resolution.
    cart_resolver: LineResolver,
    /// Generations of wishlist row resolution.
    wishlist_resolver: LineResolver,
}

impl<S: Storage> Storefront<S> {
    /// Creates a new builder.
    #[inline]
    #[must_use]
    pub fn builder() -> StorefrontBuilder<S> {
        StorefrontBuilder {
            storage: None,
            bus: None,
            user: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
        }
    }

    /// Storage backend.
    #[inline]
    #[must_use]
    pub const fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Event bus every aggregate publishes to.
    #[inline]
    #[must_use]
    pub const fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Storage keys of this session.
    #[inline]
    #[must_use]
    pub const fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Shopping cart.
    #[inline]
    #[must_use]
    pub const fn cart(&self) -> &Cart<Arc<S>> {
        &self.cart
    }

    /// Shopping cart, for mutation.
    #[inline]
    pub const fn cart_mut(&mut self) -> &mut Cart<Arc<S>> {
        &mut self.cart
    }

    /// Wishlist.
    #[inline]
    #[must_use]
    pub const fn wishlist(&self) -> &Wishlist<Arc<S>> {
        &self.wishlist
    }

    /// Wishlist, for mutation.
    #[inline]
    pub const fn wishlist_mut(&mut self) -> &mut Wishlist<Arc<S>> {
        &mut self.wishlist
    }

    /// Address book.
    #[inline]
    #[must_use]
    pub const fn addresses(&self) -> &AddressBook<Arc<S>> {
        &self.addresses
    }

    /// Address book, for mutation.
    #[inline]
    pub const fn addresses_mut(&mut self) -> &mut AddressBook<Arc<S>> {
        &mut self.addresses
    }

    /// Coupon store.
    #[inline]
    #[must_use]
    pub const fn coupons(&self) -> &CouponStore<Arc<S>> {
        &self.coupons
    }

    /// Coupon store, for seller edits.
    #[inline]
    pub const fn coupons_mut(&mut self) -> &mut CouponStore<Arc<S>> {
        &mut self.coupons
    }

    /// Home content.
    #[inline]
    #[must_use]
    pub const fn home(&self) -> &HomeContent<Arc<S>> {
        &self.home
    }

    /// Home content, for seller edits.
    #[inline]
    pub const fn home_mut(&mut self) -> &mut HomeContent<Arc<S>> {
        &mut self.home
    }

    /// Checkout in progress.
    #[inline]
    #[must_use]
    pub const fn checkout(&self) -> &Checkout {
        &self.checkout
    }

    /// Checkout in progress, for mutation.
    #[inline]
    pub const fn checkout_mut(&mut self) -> &mut Checkout {
        &mut self.checkout
    }

    /// Resolves the cart into display rows in a new batch. Pass the
    /// result to [`LineResolver::commit`] on [`cart_resolver`](Self::cart_resolver)
    /// to drop it if the cart was resolved again meanwhile.
    ///
    /// # Errors
    ///
    /// Returns the first catalog error.
    #[inline]
    pub async fn resolve_cart<C: ProductCatalog>(
        &self,
        catalog: &C,
    ) -> Result<Resolved<CartDisplayItem>> {
        self.cart_resolver.resolve_cart(catalog, self.cart.lines()).await
    }

    /// Resolves the wishlist into display rows, newest first, in a new
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns the first catalog error.
    #[inline]
    pub async fn resolve_wishlist<C: ProductCatalog>(
        &self,
        catalog: &C,
    ) -> Result<Resolved<WishlistDisplayItem>> {
        self.wishlist_resolver
            .resolve_wishlist(catalog, self.wishlist.lines())
            .await
    }

    /// Generation tracker of cart resolution.
    #[inline]
    #[must_use]
    pub const fn cart_resolver(&self) -> &LineResolver {
        &self.cart_resolver
    }

    /// Generation tracker of wishlist resolution.
    #[inline]
    #[must_use]
    pub const fn wishlist_resolver(&self) -> &LineResolver {
        &self.wishlist_resolver
    }

    /// Applies a coupon code to the current cart rows.
    ///
    /// # Errors
    ///
    /// See [`Checkout::apply_coupon`].
    #[inline]
    pub fn apply_coupon(
        &mut self,
        code: &str,
        items: &[CartDisplayItem],
        now: DateTime<Utc>,
    ) -> Result<CouponValidation> {
        self.checkout.apply_coupon(&self.coupons, code, items, now)
    }

    /// Pays for `items`, shipping to the address selected for checkout.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] if no address is saved,
    /// otherwise see [`Checkout::place_order`].
    #[inline]
    pub async fn place_order<G: PaymentGateway>(
        &mut self,
        gateway: &G,
        items: &[CartDisplayItem],
        info: PaymentInfo,
    ) -> Result<OrderReceipt> {
        let address = self
            .addresses
            .selected_for_checkout()
            .cloned()
            .ok_or_else(|| StorefrontError::validation("Please select a shipping address."))?;
        let receipt = self
            .checkout
            .place_order(gateway, &mut self.cart, items, &address, info)
            .await?;
        if let Err(err) = self.addresses.clear_checkout_selection() {
            tracing::warn!(error = %err, "could not clear checkout address selection");
        }
        Ok(receipt)
    }

    /// Reloads whatever aggregate is stored under `key` after another
    /// session wrote it, then publishes
    /// [`StorefrontEvent::StorageChanged`]. Returns `false` for keys this
    /// session does not track.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the reload fails.
    #[tracing::instrument(skip_all, fields(key = %key))]
    #[inline]
    pub fn handle_storage_change(&mut self, key: &str) -> Result<bool> {
        if key == self.cart.key() {
            self.cart.reload()?;
            let _dropped = self.checkout.sync_with_cart(&self.cart);
        } else if key == self.wishlist.key() {
            self.wishlist.reload()?;
        } else if key == self.coupons.key() {
            self.coupons.reload()?;
        } else if key == self.home.key() {
            self.home.reload()?;
        } else {
            let (addresses_key, selection_key) = self.addresses.keys();
            if key != addresses_key && key != selection_key {
                tracing::trace!("ignoring untracked key");
                return Ok(false);
            }
            self.addresses.reload()?;
        }
        tracing::debug!("reloaded after external change");
        self.bus.publish(&StorefrontEvent::StorageChanged {
            key: key.to_owned(),
        });
        Ok(true)
    }
}
