//! Seller-editable home page banner.

use std::sync::Arc;

use crate::error::{Result, StorefrontError};
use crate::events::{EventBus, StorefrontEvent};
use crate::storage::{self, Storage};

/// Banner shown until the seller picks another image.
pub const DEFAULT_HOME_IMAGE_URL: &str = "https://picsum.photos/seed/storebanner/1200/240";

/// URL schemes accepted for the banner.
const ALLOWED_PREFIXES: [&str; 3] = ["http://", "https://", "data:image/"];

/// Home page content shared by every session.
#[derive(Debug)]
pub struct HomeContent<S> {
    /// Backend the URL is persisted to.
    storage: S,
    /// Bus notified after every write.
    bus: Arc<EventBus>,
    /// Storage key of the URL.
    key: String,
    /// Seller's URL, if one was set.
    image_url: Option<String>,
}

impl<S: Storage> HomeContent<S> {
    /// Hydrates the banner stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn load<T: Into<String>>(storage: S, bus: Arc<EventBus>, key: T) -> Result<Self> {
        let mut content = Self {
            storage,
            bus,
            key: key.into(),
            image_url: None,
        };
        content.reload()?;
        Ok(content)
    }

    /// URL of the banner to show.
    #[inline]
    #[must_use]
    pub fn image_url(&self) -> &str {
        self.image_url.as_deref().unwrap_or(DEFAULT_HOME_IMAGE_URL)
    }

    /// Returns `true` if the seller replaced the default banner.
    #[inline]
    #[must_use]
    pub const fn is_customized(&self) -> bool {
        self.image_url.is_some()
    }

    /// Replaces the banner.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Validation`] unless `url` is an
    /// `http(s)` or `data:image/` URL, or a storage error if the write
    /// fails.
    #[tracing::instrument(skip_all)]
    #[inline]
    pub fn set_image_url(&mut self, url: &str) -> Result<()> {
        let trimmed = url.trim();
        if !ALLOWED_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            return Err(StorefrontError::validation(
                "Image URL must start with http://, https:// or data:image/.",
            ));
        }
        storage::save_json(&self.storage, &self.key, trimmed)?;
        self.image_url = Some(trimmed.to_owned());
        self.bus.publish(&StorefrontEvent::HomeContentChanged);
        Ok(())
    }

    /// Restores the default banner.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the removal fails.
    #[inline]
    pub fn reset(&mut self) -> Result<()> {
        self.storage.remove(&self.key)?;
        self.image_url = None;
        self.bus.publish(&StorefrontEvent::HomeContentChanged);
        Ok(())
    }

    /// Re-reads the URL from storage. A malformed entry falls back to the
    /// default banner.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    #[inline]
    pub fn reload(&mut self) -> Result<()> {
        self.image_url = match storage::load_json::<String, _>(&self.storage, &self.key) {
            Ok(url) => url.filter(|stored| !stored.is_empty()),
            Err(StorefrontError::Serialization(err)) => {
                tracing::warn!(key = %self.key, error = %err, "discarding malformed banner url");
                None
            }
            Err(err) => return Err(err),
        };
        Ok(())
    }

    /// Storage key the URL is persisted under.
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}
