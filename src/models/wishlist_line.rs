//! Persisted wishlist line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProductId;

/// A product saved to the wishlist and when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistLine {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// When the product was added (persisted as epoch milliseconds).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}
