//! Resolution of cart and wishlist lines into display rows.
//!
//! Lines only carry product ids, so showing them means one catalog lookup
//! per line. Lookups run concurrently, and every batch is tagged with a
//! generation number: when the lines change while a batch is in flight, a
//! newer batch is started and the older result is discarded on commit
//! instead of overwriting fresher data.

use core::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;

use crate::catalog::ProductCatalog;
use crate::error::Result;
use crate::models::{
    CartDisplayItem, CartLine, Product, ProductId, WishlistDisplayItem, WishlistLine,
};

/// Rows produced by one resolution batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    /// Generation the batch was started with.
    pub generation: u64,
    /// Rows for lines whose product exists, in line order.
    pub items: Vec<T>,
}

/// Issues generations and resolves lines against a catalog.
#[derive(Debug, Default)]
pub struct LineResolver {
    /// Latest generation handed out.
    generation: AtomicU64,
}

impl LineResolver {
    /// Creates a resolver at generation 0.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new batch, invalidating every earlier one.
    #[inline]
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Latest generation handed out.
    #[inline]
    #[must_use]
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns `true` if no newer batch has been started since `generation`.
    #[inline]
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Stores `resolved` into `target` if it is still current. Returns
    /// `false` (leaving `target` alone) for a stale batch.
    #[inline]
    pub fn commit<T>(&self, resolved: Resolved<T>, target: &mut Vec<T>) -> bool {
        if !self.is_current(resolved.generation) {
            tracing::debug!(
                stale = resolved.generation,
                current = self.current(),
                "discarding stale resolution"
            );
            return false;
        }
        *target = resolved.items;
        true
    }

    /// Resolves cart lines in a new batch. Lines whose product no longer
    /// exists are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first catalog error if any lookup fails; every failure
    /// is logged.
    #[tracing::instrument(skip_all, fields(lines = lines.len()))]
    #[inline]
    pub async fn resolve_cart<C: ProductCatalog>(
        &self,
        catalog: &C,
        lines: &[CartLine],
    ) -> Result<Resolved<CartDisplayItem>> {
        let generation = self.begin();
        let products = fetch_all(catalog, lines.iter().map(|line| &line.product_id)).await?;
        let items = lines
            .iter()
            .zip(products)
            .filter_map(|(line, product)| {
                product.map(|found| CartDisplayItem {
                    product: found,
                    quantity: line.quantity,
                })
            })
            .collect();
        Ok(Resolved { generation, items })
    }

    /// Resolves wishlist lines in a new batch, most recently added first.
    /// Lines whose product no longer exists are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first catalog error if any lookup fails; every failure
    /// is logged.
    #[tracing::instrument(skip_all, fields(lines = lines.len()))]
    #[inline]
    pub async fn resolve_wishlist<C: ProductCatalog>(
        &self,
        catalog: &C,
        lines: &[WishlistLine],
    ) -> Result<Resolved<WishlistDisplayItem>> {
        let generation = self.begin();
        let products = fetch_all(catalog, lines.iter().map(|line| &line.product_id)).await?;
        let mut items: Vec<WishlistDisplayItem> = lines
            .iter()
            .zip(products)
            .filter_map(|(line, product)| {
                product.map(|found| WishlistDisplayItem {
                    product: found,
                    added_at: line.added_at,
                })
            })
            .collect();
        items.sort_by(|left, right| right.added_at.cmp(&left.added_at));
        Ok(Resolved { generation, items })
    }
}

/// Looks up every id concurrently, preserving order.
async fn fetch_all<'ids, C, I>(catalog: &C, ids: I) -> Result<Vec<Option<Product>>>
where
    C: ProductCatalog,
    I: Iterator<Item = &'ids ProductId>,
{
    let results = join_all(ids.map(|id| async move {
        match catalog.fetch_product_by_id(id).await {
            Ok(product) => {
                if product.is_none() {
                    tracing::debug!(product_id = %id, "product no longer in catalog");
                }
                Ok(product)
            }
            Err(err) => {
                tracing::warn!(product_id = %id, error = %err, "product lookup failed");
                Err(err)
            }
        }
    }))
    .await;
    results.into_iter().collect::<Result<Vec<_>>>()
}
