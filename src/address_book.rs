//! Saved shipping addresses with exactly one default.
//!
//! [`AddressBook`] is the only path that mutates a user's addresses, so the
//! rule "exactly one address is default whenever the set is non-empty" is
//! enforced here and nowhere else. The address chosen for the current
//! checkout is stored separately and cleared when that address goes away.

use std::sync::Arc;

use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, StorefrontEvent};
use crate::models::{Address, AddressDraft, AddressId};
use crate::storage::{self, Storage};

/// Entity name used in [`StorefrontError::NotFound`].
const ENTITY: &str = "address";

/// A user's saved addresses and checkout selection.
#[derive(Debug)]
pub struct AddressBook<S> {
    /// Backend the addresses are persisted to.
    storage: S,
    /// Bus notified after every write.
    bus: Arc<EventBus>,
    /// Storage key of the address list.
    key: String,
    /// Storage key of the selected checkout address id.
    selection_key: String,
    /// Saved addresses; the default one is first after an add.
    addresses: Vec<Address>,
    /// Address chosen for the current checkout, if any.
    selected: Option<AddressId>,
}

impl<S: Storage> AddressBook<S> {
    /// Hydrates the address list under `key` and the checkout selection
    /// under `selection_key`, repairing the default flag if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn load<K: Into<String>, L: Into<String>>(
        storage: S,
        bus: Arc<EventBus>,
        key: K,
        selection_key: L,
    ) -> Result<Self> {
        let mut book = Self {
            storage,
            bus,
            key: key.into(),
            selection_key: selection_key.into(),
            addresses: Vec::new(),
            selected: None,
        };
        book.reload()?;
        Ok(book)
    }

    /// Validates and saves a new address under a fresh id.
    ///
    /// The address becomes the default when requested or when it is the
    /// first one; a new default is placed first and every other address
    /// loses the flag.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] for an invalid draft, or a
    /// storage error if the write fails.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn add_address(&mut self, draft: AddressDraft) -> Result<Address> {
        draft.validate()?;
        let is_default = draft.is_default.unwrap_or(false) || self.addresses.is_empty();
        let address = draft.into_address(AddressId::generate(), is_default);
        let mut addresses = self.addresses.clone();
        if is_default {
            for existing in &mut addresses {
                existing.is_default = false;
            }
            addresses.insert(0, address.clone());
        } else {
            addresses.push(address.clone());
        }
        self.commit(addresses)?;
        tracing::debug!(id = %address.id, is_default, "address added");
        Ok(address)
    }

    /// Replaces a saved address with the same id.
    ///
    /// Setting the default flag clears it everywhere else; clearing it on
    /// the only default hands the flag to the first address.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] for invalid fields,
    /// [`StorefrontError::NotFound`] for an unknown id, or a storage error.
    #[tracing::instrument(skip_all, fields(id = %address.id))]
    #[inline]
    pub fn update_address(&mut self, address: Address) -> Result<()> {
        address.to_draft().validate()?;
        let Some(position) = self.position(&address.id) else {
            return Err(StorefrontError::not_found(ENTITY, &address.id));
        };
        let mut addresses = self.addresses.clone();
        if address.is_default {
            for existing in &mut addresses {
                existing.is_default = false;
            }
        }
        if let Some(slot) = addresses.get_mut(position) {
            *slot = address;
        }
        ensure_single_default(&mut addresses);
        self.commit(addresses)
    }

    /// Makes `id` the default address.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotFound`] for an unknown id, or a
    /// storage error if the write fails.
    #[tracing::instrument(skip_all, fields(id = %id))]
    #[inline]
    pub fn set_default(&mut self, id: &AddressId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(StorefrontError::not_found(ENTITY, id));
        }
        let addresses = self
            .addresses
            .iter()
            .cloned()
            .map(|mut address| {
                address.is_default = address.id == *id;
                address
            })
            .collect();
        self.commit(addresses)
    }

    /// Removes an address. If it was the default, the first remaining one
    /// takes over; if it was selected for checkout, the selection is
    /// cleared. Returns `false` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a write fails.
    #[tracing::instrument(skip_all, fields(id = %id))]
    #[inline]
    pub fn remove_and_reassign_default(&mut self, id: &AddressId) -> Result<bool> {
        if self.position(id).is_none() {
            return Ok(false);
        }
        let mut addresses: Vec<Address> = self
            .addresses
            .iter()
            .filter(|address| address.id != *id)
            .cloned()
            .collect();
        ensure_single_default(&mut addresses);
        self.commit(addresses)?;
        if self.selected.as_ref() == Some(id) {
            self.clear_checkout_selection()?;
        }
        Ok(true)
    }

    /// Chooses the address used by the current checkout.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotFound`] for an unknown id, or a
    /// storage error if the write fails.
    #[inline]
    pub fn select_for_checkout(&mut self, id: &AddressId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(StorefrontError::not_found(ENTITY, id));
        }
        storage::save_json(&self.storage, &self.selection_key, id)?;
        self.selected = Some(id.clone());
        self.bus.publish(&StorefrontEvent::AddressesChanged);
        Ok(())
    }

    /// Forgets the checkout selection.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    #[inline]
    pub fn clear_checkout_selection(&mut self) -> Result<()> {
        self.storage.remove(&self.selection_key)?;
        if self.selected.take().is_some() {
            self.bus.publish(&StorefrontEvent::AddressesChanged);
        }
        Ok(())
    }

    /// Address to ship to: the explicit selection, else the default.
    #[inline]
    #[must_use]
    pub fn selected_for_checkout(&self) -> Option<&Address> {
        self.selected
            .as_ref()
            .and_then(|id| self.get(id))
            .or_else(|| self.default_address())
    }

    /// Id of the explicit checkout selection, without the default fallback.
    #[inline]
    #[must_use]
    pub const fn selected_id(&self) -> Option<&AddressId> {
        self.selected.as_ref()
    }

    /// The default address, if any address is saved.
    #[inline]
    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.addresses.iter().find(|address| address.is_default)
    }

    /// Looks up an address by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &AddressId) -> Option<&Address> {
        self.addresses.iter().find(|address| address.id == *id)
    }

    /// All saved addresses.
    #[inline]
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Storage keys of the address list and the checkout selection.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> (&str, &str) {
        (&self.key, &self.selection_key)
    }

    /// Re-reads addresses and selection from storage. A selection that no
    /// longer matches a saved address is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        let mut addresses: Vec<Address> = storage::load_list(&self.storage, &self.key)?;
        ensure_single_default(&mut addresses);
        let selected = match storage::load_json::<AddressId, _>(&self.storage, &self.selection_key)
        {
            Ok(selected) => selected,
            Err(StorefrontError::Serialization(err)) => {
                tracing::warn!(error = %err, "discarding malformed checkout selection");
                None
            }
            Err(err) => return Err(err),
        };
        self.selected = selected.filter(|id| addresses.iter().any(|address| address.id == *id));
        self.addresses = addresses;
        Ok(())
    }

    /// Index of the address with `id`.
    fn position(&self, id: &AddressId) -> Option<usize> {
        self.addresses.iter().position(|address| address.id == *id)
    }

    /// Persists `addresses`, then commits them and notifies subscribers.
    fn commit(&mut self, addresses: Vec<Address>) -> Result<()> {
        storage::save_json(&self.storage, &self.key, &addresses)?;
        self.addresses = addresses;
        self.bus.publish(&StorefrontEvent::AddressesChanged);
        Ok(())
    }
}

/// Leaves exactly one default in a non-empty list: the first flagged
/// address keeps it, or the first address gets it if none is flagged.
fn ensure_single_default(addresses: &mut [Address]) {
    let keep = addresses
        .iter()
        .position(|address| address.is_default)
        .unwrap_or(0);
    for (index, address) in addresses.iter_mut().enumerate() {
        address.is_default = index == keep;
    }
}
