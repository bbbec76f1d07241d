//! Durable client-side storage for session entries.
//!
//! The lifecycle manager persists exactly four independent string entries:
//! the three session tokens and the fallback device identifier. Entries are
//! written synchronously on each mutation; there is no transactional
//! guarantee across keys.
//!
//! Three backends are provided:
//! - `FileStorage`: one file per key under the platform config directory
//! - `KeyringStorage`: entries in the OS keychain
//! - `MemoryStorage`: in-process map, for tests and embedders

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

/// Storage key names. Each key holds a single opaque string.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const CSRF_TOKEN: &str = "csrf_token";
    pub const DEVICE_ID: &str = "device_id";
}

/// A key/value store for the session's durable entries.
///
/// `get` treats a missing or unreadable entry as absent rather than an
/// error; only writes surface failures.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// File-backed storage, one file per key.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Open storage in the platform default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::config::AuthConfig::storage_dir()?))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.entry_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create storage directory {:?}", self.dir))?;
        std::fs::write(self.entry_path(key), value)
            .with_context(|| format!("Failed to write storage entry {}", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove storage entry {}", key))?;
        }
        Ok(())
    }
}

/// OS keychain storage. Each key becomes an account under one service name.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Storage for KeyringStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entry(key).ok()?.get_password().ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store entry in keychain")?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        if let Ok(entry) = self.entry(key) {
            // Absent entries are fine; removal is best-effort idempotent
            let _ = entry.delete_credential();
        }
        Ok(())
    }
}

/// In-memory storage for tests and embedders that manage persistence
/// themselves.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert!(storage.get(keys::ACCESS_TOKEN).is_none());

        storage.set(keys::ACCESS_TOKEN, "tok-1").unwrap();
        assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some("tok-1"));

        storage.remove(keys::ACCESS_TOKEN).unwrap();
        assert!(storage.get(keys::ACCESS_TOKEN).is_none());
        // Removing an absent key is not an error
        storage.remove(keys::ACCESS_TOKEN).unwrap();
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("authkeep-test-{}", std::process::id()));
        let storage = FileStorage::new(dir.clone());

        storage.set(keys::DEVICE_ID, "ab12cd34").unwrap();
        assert_eq!(storage.get(keys::DEVICE_ID).as_deref(), Some("ab12cd34"));

        // A second store over the same directory sees the entry
        let reopened = FileStorage::new(dir.clone());
        assert_eq!(reopened.get(keys::DEVICE_ID).as_deref(), Some("ab12cd34"));

        storage.remove(keys::DEVICE_ID).unwrap();
        assert!(storage.get(keys::DEVICE_ID).is_none());

        let _ = std::fs::remove_dir_all(dir);
    }
}
