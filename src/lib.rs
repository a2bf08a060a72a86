//! Client-side core of an e-commerce storefront.
//!
//! This crate holds the state a shopper builds up while browsing: the
//! [`cart`], the [`wishlist`], the [`address_book`], and the seller's
//! [`coupon`] list with its validator. It also computes checkout totals in
//! [`pricing`] and hands the payable amount to a
//! [`PaymentGateway`](payment::PaymentGateway) in [`checkout`].
//!
//! State is persisted through the [`Storage`](storage::Storage) trait as
//! one JSON array per key. Product details come from a
//! [`ProductCatalog`](catalog::ProductCatalog). The [`Storefront`]
//! facade ties everything to one backend and one
//! [`EventBus`](events::EventBus).
//!
//! ```
//! use storefront_core::models::ProductId;
//! use storefront_core::storage::InMemoryStorage;
//! use storefront_core::Storefront;
//!
//! let mut store = Storefront::builder()
//!     .storage(InMemoryStorage::new())
//!     .user("asha@example.com")
//!     .build()?;
//! store.cart_mut().add_to_cart(&ProductId::from("p1"), 2)?;
//! assert_eq!(store.cart().item_count(), 2);
//! # Ok::<(), storefront_core::error::StorefrontError>(())
//! ```

pub mod address_book;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod coupon;
pub mod error;
pub mod events;
pub mod home_content;
pub mod models;
pub mod payment;
pub mod pricing;
pub mod resolve;
pub mod storage;
pub mod storefront;
pub mod wishlist;

pub use storefront::{Storefront, StorefrontBuilder};
