//! Error types for the storefront core.

/// All errors that can occur when using the storefront core.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// User-supplied input was rejected before any state was changed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A coupon with the same (case-insensitive) code already exists.
    #[error("coupon code \"{0}\" already exists")]
    DuplicateCouponCode(String),

    /// The product catalog collaborator failed.
    #[error("catalog error: {0}")]
    Catalog(Box<dyn core::error::Error + Send + Sync>),

    /// The payment gateway declined or failed the payment.
    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// Checkout was attempted with nothing to pay for.
    #[error("cart is empty")]
    EmptyCart,

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StorefrontError {
    /// Builds a [`StorefrontError::Validation`] from any message.
    #[inline]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Builds a [`StorefrontError::NotFound`] for the given entity kind.
    #[inline]
    pub fn not_found<T: ToString>(entity: &'static str, id: &T) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, StorefrontError>;
