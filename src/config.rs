//! Runtime configuration read from the environment.

use std::path::PathBuf;

use crate::coupon::DEFAULT_CURRENCY_SYMBOL;
use crate::error::{Result, StorefrontError};
use crate::storage::{DEFAULT_KEY_PREFIX, StorageKeys};

/// Directory holding the stored state.
pub const DATA_DIR_ENV: &str = "STOREFRONT_DATA_DIR";
/// E-mail of the signed-in user; unset means a guest session.
pub const USER_ENV: &str = "STOREFRONT_USER";
/// Prefix of every storage key.
pub const KEY_PREFIX_ENV: &str = "STOREFRONT_KEY_PREFIX";
/// Symbol shown in front of amounts.
pub const CURRENCY_SYMBOL_ENV: &str = "STOREFRONT_CURRENCY_SYMBOL";

/// Storefront session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Storage directory override.
    pub data_dir: Option<PathBuf>,
    /// Signed-in user, `None` for a guest.
    pub user: Option<String>,
    /// Prefix of every storage key.
    pub key_prefix: String,
    /// Symbol shown in front of amounts.
    pub currency_symbol: String,
}

impl Default for StorefrontConfig {
    #[inline]
    fn default() -> Self {
        Self {
            data_dir: None,
            user: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_owned(),
        }
    }
}

impl StorefrontConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`from_lookup`](Self::from_lookup).
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value. Unset and blank variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Configuration`] if the key prefix
    /// contains whitespace.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        let key_prefix = read(KEY_PREFIX_ENV).unwrap_or(defaults.key_prefix);
        if key_prefix.chars().any(char::is_whitespace) {
            return Err(StorefrontError::Configuration(format!(
                "{KEY_PREFIX_ENV} must not contain whitespace: \"{key_prefix}\""
            )));
        }
        Ok(Self {
            data_dir: read(DATA_DIR_ENV).map(PathBuf::from),
            user: read(USER_ENV),
            key_prefix,
            currency_symbol: read(CURRENCY_SYMBOL_ENV).unwrap_or(defaults.currency_symbol),
        })
    }

    /// Storage keys for the configured prefix and user.
    #[inline]
    #[must_use]
    pub fn storage_keys(&self) -> StorageKeys {
        StorageKeys::new(&self.key_prefix, self.user.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|&(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StorefrontConfig::default());
        assert!(config.storage_keys().is_guest());
        assert_eq!(config.storage_keys().cart(), "nxtbazaar-cart-guest");
    }

    #[test]
    fn variables_override_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            (DATA_DIR_ENV, "/tmp/shop"),
            (USER_ENV, "Asha@Example.com"),
            (KEY_PREFIX_ENV, "shop"),
            (CURRENCY_SYMBOL_ENV, "$"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/shop")));
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.storage_keys().cart(), "shop-cart-asha@example.com");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            StorefrontConfig::from_lookup(lookup(&[(USER_ENV, "  "), (KEY_PREFIX_ENV, "")]))
                .unwrap();
        assert!(config.user.is_none());
        assert_eq!(config.key_prefix, DEFAULT_KEY_PREFIX);
    }

    #[test]
    fn prefix_with_whitespace_is_rejected() {
        let err =
            StorefrontConfig::from_lookup(lookup(&[(KEY_PREFIX_ENV, "my shop")])).unwrap_err();
        assert!(matches!(err, StorefrontError::Configuration(_)));
    }
}
