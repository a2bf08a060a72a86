//! Pluggable key-value storage backends for persisting storefront state.
//!
//! Every aggregate persists itself as one JSON document under a
//! per-purpose, per-user key (see [`StorageKeys`]). The [`Storage`] trait is
//! the only thing aggregates know about, so the same logic runs against
//! [`InMemoryStorage`] in tests and [`FileStorage`] in the CLI.

#[cfg(feature = "storage-file")]
mod file;
mod keys;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileStorage;
pub use keys::{DEFAULT_KEY_PREFIX, GUEST_USER, StorageKeys};
pub use memory::InMemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, StorefrontError};

/// Key-value storage backend.
///
/// All methods take `&self`; implementations should use interior
/// mutability (e.g. `Mutex`) for thread-safe mutation. Writes are
/// last-writer-wins.
pub trait Storage: core::fmt::Debug + Send + Sync {
    /// Returns the raw value stored under `key`, or `Ok(None)` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes the value under `key`. Removing a missing key is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    fn remove(&self, key: &str) -> Result<()>;

    /// Lists all stored keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    fn keys(&self) -> Result<Vec<String>>;
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    #[inline]
    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    #[inline]
    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }
}

/// Reads and deserializes the JSON document under `key`.
///
/// # Errors
///
/// Returns [`StorefrontError::Serialization`] if the stored document is
/// malformed, or a storage error if the backend fails.
pub fn load_json<T, S>(storage: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    storage
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(StorefrontError::from))
        .transpose()
}

/// Serializes `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// Returns an error if serialization or the backend write fails.
pub fn save_json<T, S>(storage: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: Storage + ?Sized,
{
    let json = serde_json::to_string(value)?;
    storage.set(key, json)
}

/// Reads a flat JSON array stored under `key`.
///
/// A missing key and a malformed document both yield an empty list; the
/// latter is logged, matching how a corrupted entry is discarded rather
/// than blocking the session.
///
/// # Errors
///
/// Returns an error only if the storage backend itself fails.
pub fn load_list<T, S>(storage: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    match load_json::<Vec<T>, S>(storage, key) {
        Ok(items) => Ok(items.unwrap_or_default()),
        Err(StorefrontError::Serialization(err)) => {
            tracing::warn!(key = %key, error = %err, "discarding malformed stored list");
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CartLine, ProductId};

    #[test]
    fn load_json_missing_key_is_none() {
        let storage = InMemoryStorage::new();
        let value: Option<Vec<CartLine>> = load_json(&storage, "absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn save_then_load_list() {
        let storage = InMemoryStorage::new();
        let lines = vec![CartLine {
            product_id: ProductId::from("p-1"),
            quantity: 3,
        }];
        save_json(&storage, "cart", &lines).unwrap();
        let loaded: Vec<CartLine> = load_list(&storage, "cart").unwrap();
        assert_eq!(loaded, lines);
    }

    #[test]
    fn load_list_discards_malformed_document() {
        let storage = InMemoryStorage::new();
        storage.set("cart", "{not json".to_owned()).unwrap();
        let loaded: Vec<CartLine> = load_list(&storage, "cart").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn load_json_surfaces_malformed_document() {
        let storage = InMemoryStorage::new();
        storage.set("cart", "[1, 2".to_owned()).unwrap();
        let result = load_json::<Vec<CartLine>, _>(&storage, "cart");
        assert!(matches!(result, Err(StorefrontError::Serialization(_))));
    }

    #[test]
    fn arc_storage_delegates() {
        let storage = std::sync::Arc::new(InMemoryStorage::new());
        storage.set("k", "\"v\"".to_owned()).unwrap();
        assert_eq!(Storage::get(&storage, "k").unwrap().as_deref(), Some("\"v\""));
        assert_eq!(Storage::keys(&storage).unwrap(), vec!["k".to_owned()]);
    }
}
