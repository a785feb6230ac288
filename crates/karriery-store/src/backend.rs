//! Key-value persistence substrate.
//!
//! The record store keeps each collection as one JSON document under a fixed
//! key, so all it needs from storage is whole-value get / set / remove.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// Storage interface used by [`RecordStore`](crate::RecordStore).
///
/// Values are UTF-8 JSON documents. `set_many` must apply either every pair
/// or none of them.
pub trait KvBackend: Send {
    /// Get the value for a key. Returns `None` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a key-value pair, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set several pairs atomically.
    fn set_many(&self, entries: &[(&str, String)]) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process substrate. Contents vanish when the value is dropped.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }
}

impl KvBackend for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_get_set_remove() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("a").unwrap(), None);

        kv.set("a", "1").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("1"));

        kv.set("a", "2").unwrap();
        assert_eq!(kv.get("a").unwrap().as_deref(), Some("2"));

        kv.remove("a").unwrap();
        kv.remove("a").unwrap();
        assert_eq!(kv.get("a").unwrap(), None);
    }

    #[test]
    fn memory_set_many() {
        let kv = MemoryKv::new();
        kv.set_many(&[("x", "1".to_string()), ("y", "2".to_string())])
            .unwrap();
        assert_eq!(kv.get("x").unwrap().as_deref(), Some("1"));
        assert_eq!(kv.get("y").unwrap().as_deref(), Some("2"));
    }
}
