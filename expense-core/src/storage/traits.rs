//! Persistence port used by the token store.

use super::error::StorageResult;

/// Durable key-value store for small string values.
///
/// The token store keeps exactly two entries in it (`accessToken` and
/// `refreshToken`). Any local file, OS keychain or embedded KV store can back
/// it.
///
/// # Implementation Notes
///
/// `set_entries` and `delete_entries` default to one call per key. Backends
/// that can persist several keys in one write SHOULD override them so a crash
/// never leaves only part of a multi-key update on disk.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` if the key exists
    /// - `Ok(None)` if it does not
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns `Ok(())` if the key does not exist. Only actual I/O failures
    /// are reported.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Stores several entries.
    ///
    /// # Errors
    ///
    /// Returns the first write failure.
    fn set_entries(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Removes several keys.
    ///
    /// # Errors
    ///
    /// Returns the first delete failure.
    fn delete_entries(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}
