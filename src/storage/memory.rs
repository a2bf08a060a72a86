//! In-memory storage backend for testing.
//!
//! Provides [`InMemoryStorage`], a thread-safe in-memory implementation of
//! the [`Storage`](super::Storage) trait. Ideal for unit and integration
//! tests where file I/O is undesirable.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::{Result, StorefrontError};

/// Thread-safe in-memory storage for testing.
///
/// # Example
///
/// ```rust
/// use storefront_core::storage::{InMemoryStorage, Storage};
///
/// let storage = InMemoryStorage::new();
/// storage.set("greeting", "\"hello\"".to_owned()).unwrap();
/// assert_eq!(storage.get("greeting").unwrap().as_deref(), Some("\"hello\""));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    /// All entries behind a single mutex for thread-safe interior mutability.
    inner: Mutex<BTreeMap<String, String>>,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Result<R> {
        let mut inner = self.inner.lock().map_err(|err| lock_error(&err))?;
        Ok(f(&mut inner))
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> StorefrontError {
    StorefrontError::Storage(err.to_string().into())
}

impl super::Storage for InMemoryStorage {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_lock(|inner| inner.get(key).cloned())
    }

    #[inline]
    fn set(&self, key: &str, value: String) -> Result<()> {
        self.with_lock(|inner| {
            let _old = inner.insert(key.to_owned(), value);
        })
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.with_lock(|inner| {
            let _old = inner.remove(key);
        })
    }

    #[inline]
    fn keys(&self) -> Result<Vec<String>> {
        self.with_lock(|inner| inner.keys().cloned().collect())
    }
}
