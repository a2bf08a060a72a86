//! Cart aggregate: product ids mapped to quantities.
//!
//! Every mutation builds the new line list, writes it to storage as one
//! JSON array and only then commits it in memory, so a failed write leaves
//! the cart as it was. A successful write publishes
//! [`StorefrontEvent::CartChanged`].

use std::sync::Arc;

use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, StorefrontEvent};
use crate::models::{CartLine, ProductId};
use crate::storage::{self, Storage};

/// A user's shopping cart.
#[derive(Debug)]
pub struct Cart<S> {
    /// Backend the lines are persisted to.
    storage: S,
    /// Bus notified after every write.
    bus: Arc<EventBus>,
    /// Storage key of the line list.
    key: String,
    /// Lines in insertion order; every quantity is at least 1.
    lines: Vec<CartLine>,
}

impl<S: Storage> Cart<S> {
    /// Hydrates the cart stored under `key`. Malformed stored data yields
    /// an empty cart.
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

    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] for a zero quantity, or a
    /// storage error if the write fails.
    #[tracing::instrument(skip_all, fields(product_id = %product_id, quantity = quantity))]
    #[inline]
    pub fn add_to_cart(&mut self, product_id: &ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(StorefrontError::validation("Quantity must be at least 1."));
        }
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|line| line.product_id == *product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(CartLine {
                product_id: product_id.clone(),
                quantity,
            }),
        }
        self.commit(lines)
    }

    /// Sets a line's quantity. Values at or below zero drop the line;
    /// unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all, fields(product_id = %product_id, new_quantity = new_quantity))]
    #[inline]
    pub fn update_quantity(&mut self, product_id: &ProductId, new_quantity: i64) -> Result<()> {
        if !self.contains(product_id) {
            return Ok(());
        }
        let clamped = u32::try_from(new_quantity.max(0)).unwrap_or(u32::MAX);
        let lines = self
            .lines
            .iter()
            .filter_map(|line| {
                if line.product_id != *product_id {
                    return Some(line.clone());
                }
                (clamped > 0).then(|| CartLine {
                    product_id: line.product_id.clone(),
                    quantity: clamped,
                })
            })
            .collect();
        self.commit(lines)
    }

    /// Drops a product's line. Removing an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all, fields(product_id = %product_id))]
    #[inline]
    pub fn remove_from_cart(&mut self, product_id: &ProductId) -> Result<()> {
        if !self.contains(product_id) {
            return Ok(());
        }
        let lines = self
            .lines
            .iter()
            .filter(|line| line.product_id != *product_id)
            .cloned()
            .collect();
        self.commit(lines)
    }

    /// Empties the cart.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn clear_cart(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    /// Re-reads the lines from storage, replacing the in-memory state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        self.lines = read_lines(&self.storage, &self.key)?;
        Ok(())
    }

    /// Total number of units across all lines.
    #[inline]
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Quantity of one product, or 0 if it is not in the cart.
    #[inline]
    #[must_use]
    pub fn item_quantity(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product_id == *product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Returns `true` if the cart has at least one line.
    #[inline]
    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Current lines in insertion order.
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Storage key the cart is persisted under.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if a line exists for the product.
    fn contains(&self, product_id: &ProductId) -> bool {
        self.lines.iter().any(|line| line.product_id == *product_id)
    }

    /// Persists `lines`, then commits them and notifies subscribers.
    fn commit(&mut self, lines: Vec<CartLine>) -> Result<()> {
        storage::save_json(&self.storage, &self.key, &lines)?;
        self.lines = lines;
        tracing::debug!(lines = self.lines.len(), units = self.item_count(), "cart saved");
        self.bus.publish(&StorefrontEvent::CartChanged);
        Ok(())
    }
}

/// Loads lines, dropping zero quantities and folding repeated products
/// into their first line (saturating, like [`Cart::add_to_cart`]).
fn read_lines<S: Storage + ?Sized>(storage: &S, key: &str) -> Result<Vec<CartLine>> {
    let stored: Vec<CartLine> = storage::load_list(storage, key)?;
    let mut lines: Vec<CartLine> = Vec::with_capacity(stored.len());
    for line in stored {
        if line.quantity == 0 {
            continue;
        }
        match lines.iter_mut().find(|kept| kept.product_id == line.product_id) {
            Some(kept) => kept.quantity = kept.quantity.saturating_add(line.quantity),
            None => lines.push(line),
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::storage::InMemoryStorage;

    const KEY: &str = "nxtbazaar-cart-guest";

    fn new_cart() -> (Cart<Arc<InMemoryStorage>>, Arc<InMemoryStorage>, Arc<EventBus>) {
        let storage = Arc::new(InMemoryStorage::new());
        let bus = Arc::new(EventBus::new());
        let cart = Cart::load(Arc::clone(&storage), Arc::clone(&bus), KEY).unwrap();
        (cart, storage, bus)
    }

    fn pid(id: &str) -> ProductId {
        ProductId::from(id)
    }

    #[test]
    fn add_merges_repeated_products() {
        let (mut cart, _, _) = new_cart();
        cart.add_to_cart(&pid("p1"), 2).unwrap();
        cart.add_to_cart(&pid("p1"), 3).unwrap();
        cart.add_to_cart(&pid("p2"), 1).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_quantity(&pid("p1")), 5);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn add_zero_is_rejected_without_writing() {
        let (mut cart, storage, bus) = new_cart();
        let seen = events::record(&bus);
        let err = cart.add_to_cart(&pid("p1"), 0).unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        assert!(!cart.has_items());
        assert!(storage.get(KEY).unwrap().is_none());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn add_saturates() {
        let (mut cart, _, _) = new_cart();
        cart.add_to_cart(&pid("p1"), u32::MAX).unwrap();
        cart.add_to_cart(&pid("p1"), 10).unwrap();
        assert_eq!(cart.item_quantity(&pid("p1")), u32::MAX);
    }

    #[test]
    fn update_quantity_sets_and_drops() {
        let (mut cart, _, _) = new_cart();
        cart.add_to_cart(&pid("p1"), 2).unwrap();
        cart.add_to_cart(&pid("p2"), 2).unwrap();

        cart.update_quantity(&pid("p1"), 7).unwrap();
        cart.update_quantity(&pid("p1"), 7).unwrap();
        assert_eq!(cart.item_quantity(&pid("p1")), 7);

        cart.update_quantity(&pid("p2"), -4).unwrap();
        assert_eq!(cart.item_quantity(&pid("p2")), 0);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 7);
    }

    #[test]
    fn update_unknown_product_is_noop() {
        let (mut cart, storage, _) = new_cart();
        cart.update_quantity(&pid("ghost"), 3).unwrap();
        assert!(!cart.has_items());
        assert!(storage.get(KEY).unwrap().is_none());
    }

    #[test]
    fn remove_and_clear() {
        let (mut cart, _, _) = new_cart();
        cart.add_to_cart(&pid("p1"), 1).unwrap();
        cart.add_to_cart(&pid("p2"), 1).unwrap();
        cart.remove_from_cart(&pid("p1")).unwrap();
        cart.remove_from_cart(&pid("p1")).unwrap();
        assert_eq!(cart.lines().len(), 1);
        cart.clear_cart().unwrap();
        assert!(!cart.has_items());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn count_matches_sum_after_mixed_operations() {
        let (mut cart, _, _) = new_cart();
        let ops: [(&str, i64); 6] = [("a", 3), ("b", 2), ("a", 0), ("c", 5), ("b", 9), ("c", -1)];
        for (id, qty) in ops {
            if cart.item_quantity(&pid(id)) == 0 {
                cart.add_to_cart(&pid(id), u32::try_from(qty.max(1)).unwrap())
                    .unwrap();
            } else {
                cart.update_quantity(&pid(id), qty).unwrap();
            }
        }
        let sum: u64 = cart.lines().iter().map(|line| u64::from(line.quantity)).sum();
        assert_eq!(cart.item_count(), sum);
        assert!(cart.lines().iter().all(|line| line.quantity > 0));
    }

    #[test]
    fn every_write_persists_and_publishes() {
        let (mut cart, storage, bus) = new_cart();
        let seen = events::record(&bus);
        cart.add_to_cart(&pid("p1"), 2).unwrap();
        cart.update_quantity(&pid("p1"), 4).unwrap();
        cart.remove_from_cart(&pid("p1")).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert!(
            seen.lock()
                .unwrap()
                .iter()
                .all(|event| *event == StorefrontEvent::CartChanged)
        );
        assert_eq!(storage.get(KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let (mut cart, storage, _) = new_cart();
        cart.add_to_cart(&pid("p1"), 1).unwrap();
        storage
            .set(
                KEY,
                r#"[{"productId":"p9","quantity":4},{"productId":"p0","quantity":0}]"#.to_owned(),
            )
            .unwrap();
        cart.reload().unwrap();
        assert_eq!(cart.item_quantity(&pid("p9")), 4);
        assert_eq!(cart.item_quantity(&pid("p1")), 0);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn repeated_stored_products_are_merged() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .set(
                KEY,
                r#"[{"productId":"p1","quantity":2},{"productId":"p2","quantity":1},{"productId":"p1","quantity":5}]"#
                    .to_owned(),
            )
            .unwrap();
        let mut cart = Cart::load(Arc::clone(&storage), Arc::new(EventBus::new()), KEY).unwrap();
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_quantity(&pid("p1")), 7);
        assert_eq!(cart.item_count(), 8);

        cart.update_quantity(&pid("p1"), 3).unwrap();
        assert_eq!(cart.item_count(), 4);
        assert_eq!(
            storage.get(KEY).unwrap().as_deref(),
            Some(r#"[{"productId":"p1","quantity":3},{"productId":"p2","quantity":1}]"#)
        );
    }

    #[test]
    fn merged_duplicates_saturate() {
        let storage = Arc::new(InMemoryStorage::new());
        let max = u32::MAX;
        storage
            .set(
                KEY,
                format!(r#"[{{"productId":"p1","quantity":{max}}},{{"productId":"p1","quantity":9}}]"#),
            )
            .unwrap();
        let cart = Cart::load(storage, Arc::new(EventBus::new()), KEY).unwrap();
        assert_eq!(cart.item_quantity(&pid("p1")), u32::MAX);
    }

    #[test]
    fn persisted_lines_survive_reopen() {
        let (mut cart, storage, bus) = new_cart();
        cart.add_to_cart(&pid("p1"), 2).unwrap();
        let reopened = Cart::load(Arc::clone(&storage), bus, KEY).unwrap();
        assert_eq!(reopened.lines(), cart.lines());
    }
}
