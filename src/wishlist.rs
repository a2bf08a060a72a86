//! Wishlist aggregate: saved products with the time they were added.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::events::{EventBus, StorefrontEvent};
use crate::models::{ProductId, WishlistLine};
use crate::storage::{self, Storage};

/// Outcome of [`Wishlist::toggle_wishlist_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistToggle {
    /// The product was not saved and now is.
    Added,
    /// The product was saved and no longer is.
    Removed,
}

/// A user's wishlist. Presence is the only state per product.
#[derive(Debug)]
pub struct Wishlist<S> {
    /// Backend the lines are persisted to.
    storage: S,
    /// Bus notified of additions and removals.
    bus: Arc<EventBus>,
    /// Storage key of the line list.
    key: String,
    /// Lines in insertion order, unique per product.
    lines: Vec<WishlistLine>,
}

impl<S: Storage> Wishlist<S> {
    /// Hydrates the wishlist stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn load<T: Into<String>>(storage: S, bus: Arc<EventBus>, key: T) -> Result<Self> {
        let storage_key = key.into();
        let lines = read_lines(&storage, &storage_key)?;
        Ok(Self {
            storage,
            bus,
            key: storage_key,
            lines,
        })
    }

    /// Saves the product if absent, removes it if present.
    ///
    /// Publishes exactly one [`StorefrontEvent::WishlistItemAdded`] or
    /// [`StorefrontEvent::WishlistItemRemoved`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails; the wishlist is left
    /// unchanged and no event is published.
    #[tracing::instrument(skip_all, fields(product_id = %product_id))]
    #[inline]
    pub fn toggle_wishlist_item(&mut self, product_id: &ProductId) -> Result<WishlistToggle> {
        if self.is_in_wishlist(product_id) {
            self.commit(self.without(product_id))?;
            self.bus
                .publish(&StorefrontEvent::WishlistItemRemoved(product_id.clone()));
            Ok(WishlistToggle::Removed)
        } else {
            let mut lines = self.lines.clone();
            lines.push(WishlistLine {
                product_id: product_id.clone(),
                added_at: Utc::now(),
            });
            self.commit(lines)?;
            self.bus
                .publish(&StorefrontEvent::WishlistItemAdded(product_id.clone()));
            Ok(WishlistToggle::Added)
        }
    }

    /// Removes a product. Returns `false` (and publishes nothing) if it was
    /// not saved.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all, fields(product_id = %product_id))]
    #[inline]
    pub fn remove_from_wishlist(&mut self, product_id: &ProductId) -> Result<bool> {
        if !self.is_in_wishlist(product_id) {
            return Ok(false);
        }
        self.commit(self.without(product_id))?;
        self.bus
            .publish(&StorefrontEvent::WishlistItemRemoved(product_id.clone()));
        Ok(true)
    }

    /// Drops every line, e.g. on sign-out. Publishes one removal per line.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[inline]
    pub fn clear(&mut self) -> Result<()> {
        let removed = core::mem::take(&mut self.lines);
        if let Err(err) = storage::save_json(&self.storage, &self.key, &self.lines) {
            self.lines = removed;
            return Err(err);
        }
        for line in removed {
            self.bus
                .publish(&StorefrontEvent::WishlistItemRemoved(line.product_id));
        }
        Ok(())
    }

    /// Re-reads the lines from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        self.lines = read_lines(&self.storage, &self.key)?;
        Ok(())
    }

    /// Returns `true` if the product is saved.
    #[inline]
    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.lines.iter().any(|line| line.product_id == *product_id)
    }

    /// Number of saved products.
    #[inline]
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Lines in insertion order.
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[WishlistLine] {
        &self.lines
    }

    /// Lines ordered most recently added first.
    #[inline]
    #[must_use]
    pub fn sorted_for_display(&self) -> Vec<WishlistLine> {
        let mut lines = self.lines.clone();
        lines.sort_by(|left, right| right.added_at.cmp(&left.added_at));
        lines
    }

    /// Storage key the wishlist is persisted under.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current lines minus one product.
    fn without(&self, product_id: &ProductId) -> Vec<WishlistLine> {
        self.lines
            .iter()
            .filter(|line| line.product_id != *product_id)
            .cloned()
            .collect()
    }

    /// Persists `lines`, then commits them.
    fn commit(&mut self, lines: Vec<WishlistLine>) -> Result<()> {
        storage::save_json(&self.storage, &self.key, &lines)?;
        self.lines = lines;
        tracing::debug!(lines = self.lines.len(), "wishlist saved");
        Ok(())
    }
}

/// Loads lines, keeping the first occurrence of each product.
fn read_lines<S: Storage + ?Sized>(storage: &S, key: &str) -> Result<Vec<WishlistLine>> {
    let mut lines: Vec<WishlistLine> = storage::load_list(storage, key)?;
    let mut seen = std::collections::HashSet::new();
    lines.retain(|line| seen.insert(line.product_id.clone()));
    Ok(lines)
}
