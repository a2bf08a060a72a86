//! Catalog product model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ProductId;

/// A customer review attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review identifier.
    pub id: String,
    /// Display name of the reviewer.
    pub author: String,
    /// Star rating (1-5).
    pub rating: f64,
    /// Review text.
    pub comment: String,
    /// ISO-8601 date the review was written.
    pub date: String,
}

/// A product as returned by the catalog collaborator.
///
/// Only `id`, `name` and `price` are needed to resolve cart and wishlist
/// lines; everything else is carried through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog document identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: Option<String>,
    /// Current selling price.
    pub price: Decimal,
    /// Pre-discount price, shown struck through when present.
    pub original_price: Option<Decimal>,
    /// Image URLs; the first one is the primary image.
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Optional product video URLs.
    pub video_urls: Option<Vec<String>>,
    /// Category name.
    pub category: Option<String>,
    /// Average rating.
    pub rating: Option<f64>,
    /// Units in stock.
    pub stock: Option<u32>,
    /// Hint used when generating placeholder imagery.
    pub data_ai_hint: Option<String>,
    /// Customer reviews.
    pub reviews: Option<Vec<Review>>,
}

impl Product {
    /// Creates a product with only the fields checkout needs.
    #[inline]
    #[must_use]
    pub fn new<I: Into<ProductId>, N: Into<String>>(id: I, name: N, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
            original_price: None,
            image_urls: Vec::new(),
            video_urls: None,
            category: None,
            rating: None,
            stock: None,
            data_ai_hint: None,
            reviews: None,
        }
    }

    /// Returns the primary image URL, if any.
    #[inline]
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_product() {
        let json = r#"{
            "id": "p-1",
            "name": "Minimalist Desk Lamp",
            "description": "A lamp",
            "price": 49.99,
            "originalPrice": 59.99,
            "imageUrls": ["https://img/1.png", "https://img/2.png"],
            "category": "Home",
            "rating": 4.5,
            "stock": 12
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::from("p-1"));
        assert_eq!(product.price, Decimal::new(4999, 2));
        assert_eq!(product.original_price, Some(Decimal::new(5999, 2)));
        assert_eq!(product.primary_image(), Some("https://img/1.png"));
        assert_eq!(product.stock, Some(12));
        assert!(product.reviews.is_none());
    }

    #[test]
    fn deserialize_minimal_product_without_images() {
        let json = r#"{"id": "p-2", "name": "Bottle", "price": 25}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.image_urls.is_empty());
        assert_eq!(product.price, Decimal::from(25));
        assert!(product.primary_image().is_none());
    }

    #[test]
    fn price_serializes_as_number() {
        let product = Product::new("p-3", "Mug", Decimal::new(1250, 2));
        let value = serde_json::to_value(&product).unwrap();
        assert!(value["price"].is_number());
    }
}
