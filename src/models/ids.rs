//! Newtype wrappers for entity identifiers.
//!
//! Products, coupons, addresses and payment transactions are all keyed by
//! strings; wrapping them keeps a product id from being passed where an
//! address id is expected.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype ID wrapping a `String`.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from the given string.
            #[inline]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Generates a fresh random (UUID v4) identifier.
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_string_id! {
    /// Unique identifier for a catalog product (document id).
    ProductId
}

define_string_id! {
    /// Unique identifier for a seller coupon (UUID string).
    CouponId
}

define_string_id! {
    /// Unique identifier for a saved shipping address (UUID string).
    AddressId
}

define_string_id! {
    /// Identifier returned by the payment gateway for a completed payment.
    TransactionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_display_and_inner() {
        let id = ProductId::new("prod-1".to_owned());
        assert_eq!(id.to_string(), "prod-1");
        assert_eq!(id.as_inner(), "prod-1");
        assert_eq!(id.into_inner(), "prod-1");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = CouponId::from("c1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""c1""#);
        let back: CouponId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let first = AddressId::generate();
        let second = AddressId::generate();
        assert_ne!(first, second);
        assert!(uuid::Uuid::parse_str(first.as_inner()).is_ok());
    }
}
