//! File-backed key-value store.
//!
//! All entries live in one JSON object file. Every mutation rewrites the whole
//! file with the write-to-temp-then-rename pattern:
//! 1. Serialize the updated map into `.{name}.tmp` next to the target
//! 2. Sync the temporary file to disk
//! 3. Atomically rename it over the target
//!
//! The target therefore always holds either the complete old map or the
//! complete new map, so the token pair is never half-written on disk.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::error::{StorageError, StorageResult};
use super::traits::KeyValueStore;

type Entries = BTreeMap<String, String>;

/// Key-value store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Opens (or prepares) the store at `path`. Parent directories are created
    /// if missing; the file itself is created on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn new(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, &e))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "store".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn read_entries(&self) -> StorageResult<Entries> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Entries::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StorageError::Serialization(format!(
                    "{} is not a valid store file: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(StorageError::io(&self.path, &e)),
        }
    }

    fn write_entries(&self, entries: &Entries) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let temp_path = self.temp_path();

        let mut file = open_private(&temp_path)
            .map_err(|e| StorageError::io(&temp_path, &e))?;
        file.write_all(&bytes)
            .map_err(|e| StorageError::io(&temp_path, &e))?;
        file.sync_all()
            .map_err(|e| StorageError::io(&temp_path, &e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .map_err(|e| StorageError::io(&self.path, &e))?;
        self.sync_directory();
        Ok(())
    }

    /// Makes the rename durable. Best effort: not every platform lets a
    /// directory be opened for syncing.
    fn sync_directory(&self) {
        #[cfg(unix)]
        {
            let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) else {
                return;
            };
            if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
                log::debug!("failed to sync store directory {}: {e}", dir.display());
            }
        }
    }

    fn update(&self, f: impl FnOnce(&mut Entries) -> bool) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut entries = self.read_entries()?;
        if f(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.set_entries(&[(key, value)])
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_entries(&[key])
    }

    fn set_entries(&self, new_entries: &[(&str, &str)]) -> StorageResult<()> {
        self.update(|entries| {
            for (key, value) in new_entries {
                entries.insert((*key).to_string(), (*value).to_string());
            }
            true
        })
    }

    fn delete_entries(&self, keys: &[&str]) -> StorageResult<()> {
        self.update(|entries| {
            let mut changed = false;
            for key in keys {
                changed |= entries.remove(*key).is_some();
            }
            changed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileKeyValueStore::new(&path).unwrap();
        store
            .set_entries(&[("accessToken", "a"), ("refreshToken", "r")])
            .unwrap();
        drop(store);

        let reopened = FileKeyValueStore::new(&path).unwrap();
        assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("a"));
        assert_eq!(reopened.get("refreshToken").unwrap().as_deref(), Some("r"));
        assert!(!dir.path().join("nested").join(".session.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("none.json")).unwrap();
        assert_eq!(store.get("accessToken").unwrap(), None);
        // deleting from a store that was never written is a no-op
        store.delete_entries(&["accessToken"]).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_delete_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("s.json")).unwrap();
        store.set("keep", "1").unwrap();
        store.set("drop", "2").unwrap();
        store.delete("drop").unwrap();

        assert_eq!(store.get("keep").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("drop").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        fs::write(&path, b"{not json").unwrap();

        let store = FileKeyValueStore::new(&path).unwrap();
        match store.get("accessToken") {
            Err(StorageError::Serialization(_)) => {}
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("s.json")).unwrap();
        store.set("accessToken", "a").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
