use crate::storage::{DEFAULT_KEY_PREFIX, Storage, prefixed};

/// [`Storage`] backed by the browser's `window.localStorage`.
pub struct LocalStorage {
    prefix: String,
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// `None` if there is no window or the browser denies access to the
    /// local storage (e.g. disabled cookies)
    pub fn new() -> Option<Self> {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Option<Self> {
        let storage = match web_sys::window()?.local_storage() {
            Ok(storage) => storage?,
            Err(error) => {
                log::warn!("localStorage is not accessible: {error:?}");
                return None;
            }
        };

        Some(Self {
            prefix: prefix.into(),
            storage,
        })
    }
}

impl Storage for LocalStorage {
    fn get_item(&self, key: &str) -> Option<serde_json::Value> {
        let raw = match self.storage.get_item(&prefixed(&self.prefix, key)) {
            Ok(raw) => raw?,
            Err(error) => {
                log::warn!("Cannot read `{key}' from localStorage: {error:?}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                log::warn!("Ignoring malformed storage item `{key}': {error}");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: serde_json::Value) {
        // the quota may be exceeded, or the storage be read only
        if let Err(error) = self
            .storage
            .set_item(&prefixed(&self.prefix, key), &value.to_string())
        {
            log::warn!("Cannot write `{key}' to localStorage: {error:?}");
        }
    }

    fn remove_item(&self, key: &str) {
        if let Err(error) = self.storage.remove_item(&prefixed(&self.prefix, key)) {
            log::warn!("Cannot remove `{key}' from localStorage: {error:?}");
        }
    }
}
