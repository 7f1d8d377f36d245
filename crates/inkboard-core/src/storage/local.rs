//! Browser `localStorage` backend for WebAssembly.

use super::{Storage, StorageError, StorageResult};
use crate::scene::Snapshot;
use wasm_bindgen::JsValue;

const KEY_PREFIX: &str = "inkboard:";

/// Stores snapshots in the browser's `localStorage` under a key prefix.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    prefix: String,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage {
    pub fn new() -> Self {
        Self::with_prefix(KEY_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn store(&self) -> StorageResult<web_sys::Storage> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("No window object".to_string()))?;
        window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_error(e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))
    }

    fn item_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

fn js_error(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

impl Storage for LocalStorage {
    fn save(&self, key: &str, snapshot: &Snapshot) -> StorageResult<()> {
        // Fails when the quota is exceeded.
        self.store()?
            .set_item(&self.item_key(key), snapshot.as_str())
            .map_err(|e| StorageError::Io(js_error(e)))
    }

    fn load(&self, key: &str) -> StorageResult<Option<Snapshot>> {
        let item = self
            .store()?
            .get_item(&self.item_key(key))
            .map_err(|e| StorageError::Io(js_error(e)))?;
        Ok(item.map(Snapshot::from))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.store()?
            .remove_item(&self.item_key(key))
            .map_err(|e| StorageError::Io(js_error(e)))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let store = self.store()?;
        let len = store.length().map_err(|e| StorageError::Io(js_error(e)))?;
        let mut keys = Vec::new();
        for index in 0..len {
            let Some(name) = store.key(index).map_err(|e| StorageError::Io(js_error(e)))? else {
                continue;
            };
            if let Some(key) = name.strip_prefix(&self.prefix) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }
}
