use log::{trace, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

const DATA_DIR_ENV: &str = "HUE_MATCH_DATA_DIR";
const APP_DIR_NAME: &str = "hue-match";

/// Opaque blob storage keyed by name. Blobs are whatever the caller
/// serialized; the store never looks inside.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError>;
}

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        if !data_dir.exists() {
            if let Err(e) = fs::create_dir_all(&data_dir) {
                warn!(target: "store", "Could not create {}: {}", data_dir.display(), e);
            }
        }
        Self { data_dir }
    }

    /// `$HUE_MATCH_DATA_DIR`, else the platform's local data directory.
    pub fn default_location() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.path_for(key), blob)?;
        Ok(())
    }
}

/// Process-local store for tests and for running without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// Store whose writes always fail, for exercising the log-and-carry-on path.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    pub failed_writes: std::cell::Cell<usize>,
}

#[cfg(test)]
impl KeyValueStore for ReadOnlyStore {
    fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn save(&self, key: &str, _blob: &str) -> Result<(), StoreError> {
        self.failed_writes.set(self.failed_writes.get() + 1);
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("{} is read-only", key),
        )))
    }
}

/// Loads and decodes `key`. Missing, unreadable and undecodable blobs all
/// come back as `None`; the last two are logged.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.load(key) {
        Ok(Some(contents)) => match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(target: "store", "Discarding corrupt data under {}: {}", key, e);
                None
            }
        },
        Ok(None) => {
            trace!(target: "store", "Nothing stored under {}", key);
            None
        }
        Err(e) => {
            warn!(target: "store", "Could not read {}: {}", key, e);
            None
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let contents = serde_json::to_string_pretty(value)?;
    store.save(key, &contents)
}
