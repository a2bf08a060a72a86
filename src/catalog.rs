//! Product catalog collaborator and listing filters.
//!
//! The hosted product database is out of scope; the storefront only needs
//! lookups by id and a full listing, expressed by [`ProductCatalog`].
//! [`InMemoryCatalog`] serves a fixed product list (e.g. loaded from a JSON
//! file) and is what tests and the CLI use.

use core::cmp::Ordering;

use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Product, ProductId, ProductSort};

/// Read access to product details.
pub trait ProductCatalog: Send + Sync {
    /// Returns the product with `id`, or `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Catalog`](crate::error::StorefrontError::Catalog)
    /// if the lookup itself fails.
    fn fetch_product_by_id(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<Product>>> + Send;

    /// Returns every product.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Catalog`](crate::error::StorefrontError::Catalog)
    /// if the listing fails.
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;

    /// Returns the products matching `filter`, sorted and paged.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`fetch_products`](Self::fetch_products).
    #[inline]
    fn search(&self, filter: &ProductFilter) -> impl Future<Output = Result<Vec<Product>>> + Send {
        async move { Ok(filter.apply(self.fetch_products().await?)) }
    }
}

/// Catalog backed by a product list held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    /// Products in listing order.
    products: Vec<Product>,
}

impl InMemoryCatalog {
    /// Creates a catalog over `products`.
    #[inline]
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parses a JSON array of products.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Serialization`](crate::error::StorefrontError::Serialization)
    /// if the document is not a valid product list.
    #[inline]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Distinct category names in first-seen order.
    #[inline]
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for category in self.products.iter().filter_map(|p| p.category.as_deref()) {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        categories
    }

    /// Number of products.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns `true` if the catalog has no products.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for InMemoryCatalog {
    #[inline]
    fn fetch_product_by_id(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<Product>>> + Send {
        core::future::ready(Ok(self
            .products
            .iter()
            .find(|product| product.id == *id)
            .cloned()))
    }

    #[inline]
    fn fetch_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send {
        core::future::ready(Ok(self.products.clone()))
    }
}

/// Composable filter for product listings.
///
/// Use builder-style methods to chain criteria. A product must satisfy
/// every set criterion to pass; sorting and paging apply afterwards.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use storefront_core::catalog::ProductFilter;
/// use storefront_core::models::ProductSort;
///
/// let filter = ProductFilter::new()
///     .query("shirt")
///     .category("Apparel")
///     .price_range(Decimal::from(10), Decimal::from(50))
///     .sort(ProductSort::PriceAsc)
///     .limit(20);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Search text (case-insensitive, matches name, description or category).
    pub query: Option<String>,
    /// Accepted categories (case-insensitive); empty accepts all.
    pub categories: Vec<String>,
    /// Minimum price (inclusive).
    pub min_price: Option<Decimal>,
    /// Maximum price (inclusive).
    pub max_price: Option<Decimal>,
    /// Sort order; `None` keeps catalog order.
    pub sort: Option<ProductSort>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Number of matching results to skip.
    pub offset: usize,
}

impl ProductFilter {
    /// Creates an empty filter that matches all products.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to products mentioning `text`.
    #[inline]
    #[must_use]
    pub fn query<T: Into<String>>(mut self, text: T) -> Self {
        self.query = Some(text.into());
        self
    }

    /// Adds an accepted category.
    #[inline]
    #[must_use]
    pub fn category<T: Into<String>>(mut self, name: T) -> Self {
        self.categories.push(name.into());
        self
    }

    /// Restricts to prices within `[min, max]`.
    #[inline]
    #[must_use]
    pub const fn price_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_price = Some(min);
        self.max_price = Some(max);
        self
    }

    /// Sets the sort order.
    #[inline]
    #[must_use]
    pub const fn sort(mut self, order: ProductSort) -> Self {
        self.sort = Some(order);
        self
    }

    /// Caps the number of results.
    #[inline]
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` matches.
    #[inline]
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns `true` if the product satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_query(product) && self.matches_category(product) && self.matches_price(product)
    }

    /// Filters, sorts and pages `products`.
    #[inline]
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut matching: Vec<Product> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .collect();
        if let Some(order) = self.sort {
            matching.sort_by(|left, right| compare(order, left, right));
        }
        matching
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }

    /// Checks search text criteria.
    fn matches_query(&self, product: &Product) -> bool {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .is_none_or(|text| {
                let needle = text.to_lowercase();
                [
                    Some(product.name.as_str()),
                    product.description.as_deref(),
                    product.category.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            })
    }

    /// Checks category criteria.
    fn matches_category(&self, product: &Product) -> bool {
        self.categories.is_empty()
            || product.category.as_deref().is_some_and(|category| {
                self.categories
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(category))
            })
    }

    /// Checks price criteria.
    fn matches_price(&self, product: &Product) -> bool {
        self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

/// Orders two products for a listing.
fn compare(order: ProductSort, left: &Product, right: &Product) -> Ordering {
    match order {
        ProductSort::PriceAsc => left.price.cmp(&right.price),
        ProductSort::PriceDesc => right.price.cmp(&left.price),
        ProductSort::Rating => match (left.rating, right.rating) {
            (Some(l), Some(r)) => r.total_cmp(&l),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        ProductSort::Name => left.name.to_lowercase().cmp(&right.name.to_lowercase()),
    }
}
