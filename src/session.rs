use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TOKEN_KEY: &str = "vocably_token";

/// Key/value storage that lives exactly as long as one client session.
///
/// Clones share the same map, so handing a clone to a freshly constructed
/// client behaves like reloading the page in the same tab. A new
/// `SessionStorage` starts empty, like a tab that was closed and reopened.
/// Nothing is ever written to disk.
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    pub fn set_item(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    pub fn remove_item(&self, key: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.remove(key);
        }
    }
}

/// Holds the bearer token for the current session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    storage: SessionStorage,
}

impl SessionStore {
    pub fn new(storage: SessionStorage) -> Self {
        Self { storage }
    }

    pub fn set(&self, token: &str) {
        self.storage.set_item(TOKEN_KEY, token);
    }

    pub fn get(&self) -> Option<String> {
        self.storage.get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn clear(&self) {
        self.storage.remove_item(TOKEN_KEY);
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}
