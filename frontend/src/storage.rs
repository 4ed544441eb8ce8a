//! Durable key/value storage (the native counterpart of browser local storage).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Synchronous string key/value store.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object file.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) a storage file. A missing or unreadable file
    /// starts out empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let items = match Self::read_file(&path) {
            Ok(items) => items,
            Err(e) => {
                warn!("Ignoring unreadable storage file {:?}: {}", path, e);
                HashMap::new()
            }
        };
        debug!("Opened storage {:?} with {} keys", path, items.len());
        Self {
            path,
            items: Mutex::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Result<HashMap<String, String>> {
        if !path.exists() {
            info!("Storage file does not exist, starting empty");
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_file(&self, items: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write to temporary file first, then rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;
        debug!("Wrote {} keys to {:?}", items.len(), self.path);
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();
        items.insert(key.to_string(), value.to_string());
        self.write_file(&items)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut items = self.items.lock();
        if items.remove(key).is_some() {
            self.write_file(&items)?;
        }
        Ok(())
    }
}
