use std::{cell::RefCell, collections::HashMap};

/// prefix applied to every key the connectors store
pub const DEFAULT_KEY_PREFIX: &str = "wagmi";

/// Key/value store used to remember the connection state across page
/// loads.
///
/// Values are JSON encoded. Storage failures are not fatal to the
/// connectors: implementations log them and carry on.
pub trait Storage {
    fn get_item(&self, key: &str) -> Option<serde_json::Value>;

    fn set_item(&self, key: &str, value: serde_json::Value);

    fn remove_item(&self, key: &str);

    fn contains(&self, key: &str) -> bool {
        self.get_item(key).is_some()
    }
}

pub(crate) fn prefixed(prefix: &str, key: &str) -> String {
    format!("{prefix}.{key}")
}

/// Storage kept in memory, lost on page reload.
#[derive(Debug)]
pub struct MemoryStorage {
    prefix: String,
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            items: RefCell::new(HashMap::new()),
        }
    }

    /// the raw (already prefixed) keys currently stored
    pub fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<serde_json::Value> {
        let items = self.items.borrow();
        let raw = items.get(&prefixed(&self.prefix, key))?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(error) => {
                log::warn!("Ignoring malformed storage item `{key}': {error}");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: serde_json::Value) {
        self.items
            .borrow_mut()
            .insert(prefixed(&self.prefix, key), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(&prefixed(&self.prefix, key));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_are_prefixed() {
        let storage = MemoryStorage::new();
        storage.set_item("enkrypt.shimDisconnect", json!(true));

        assert_eq!(storage.keys(), vec!["wagmi.enkrypt.shimDisconnect".to_owned()]);
        assert_eq!(storage.get_item("enkrypt.shimDisconnect"), Some(json!(true)));
        assert!(storage.contains("enkrypt.shimDisconnect"));
    }

    #[test]
    fn remove() {
        let storage = MemoryStorage::with_prefix("app");
        storage.set_item("key", json!({ "a": 1 }));
        storage.remove_item("key");

        assert!(!storage.contains("key"));
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn malformed_item_is_ignored() {
        let storage = MemoryStorage::new();
        storage
            .items
            .borrow_mut()
            .insert("wagmi.key".to_owned(), "{not json".to_owned());

        assert_eq!(storage.get_item("key"), None);
    }
}
