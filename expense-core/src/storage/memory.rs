//! Process-local key-value store.

use std::collections::HashMap;
use std::sync::Mutex;

use super::error::{StorageError, StorageResult};
use super::traits::KeyValueStore;

/// Mutex-guarded in-memory store. Nothing survives the process; useful for
/// tests and for hosts that persist the session themselves.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> StorageResult<T> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&mut guard))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) -> StorageResult<()> {
        self.with_entries(|entries| {
            for (key, value) in new_entries {
                entries.insert((*key).to_string(), (*value).to_string());
            }
        })
    }

    fn delete_entries(&self, keys: &[&str]) -> StorageResult<()> {
        self.with_entries(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let store = InMemoryKeyValueStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_multi_key_operations() {
        let store = InMemoryKeyValueStore::new();
        store.set_entries(&[("a", "1"), ("b", "2")]).unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));

        store.delete_entries(&["a", "b", "missing"]).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), None);
    }
}
