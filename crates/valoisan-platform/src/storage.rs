//! Storage areas and the native file-backed implementation.
//!
//! Two areas are modelled:
//!
//! - [`ExtensionStorage`] -- the extension-scoped `storage.local` area.
//!   Asynchronous, JSON-valued, authoritative for the preference record.
//! - [`LocalStorage`] -- the page's `localStorage`. Synchronous,
//!   string-valued, holds the legacy mirror.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlatformError;

/// The extension's persistent key-value area.
#[async_trait]
pub trait ExtensionStorage: Send + Sync {
    /// Read the value stored under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, PlatformError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), PlatformError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), PlatformError>;
}

/// The page's synchronous string store.
pub trait LocalStorage: Send + Sync {
    /// `localStorage.getItem`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// `localStorage.setItem`. Fails when the quota is exhausted.
    fn set_item(&self, key: &str, value: &str) -> Result<(), PlatformError>;

    /// `localStorage.removeItem`.
    fn remove_item(&self, key: &str);
}

#[cfg(feature = "native")]
pub use native::NativeExtensionStorage;

#[cfg(feature = "native")]
mod native {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use tokio::sync::Mutex;
    use tracing::debug;

    use super::ExtensionStorage;
    use crate::error::PlatformError;

    /// Canonical storage kept as a single JSON object in a file.
    ///
    /// Every operation re-reads the file, so several processes pointed at
    /// the same path observe each other's writes. Operations within one
    /// instance are serialized; across instances the last write wins.
    pub struct NativeExtensionStorage {
        path: PathBuf,
        lock: Mutex<()>,
    }

    impl NativeExtensionStorage {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                lock: Mutex::new(()),
            }
        }

        /// `<data dir>/valoisan/storage.json`, if the platform has a data dir.
        pub fn default_path() -> Option<PathBuf> {
            dirs::data_dir().map(|d| d.join("valoisan").join("storage.json"))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        async fn read_all(&self) -> Result<Map<String, Value>, PlatformError> {
            if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
                return Ok(Map::new());
            }
            let contents = tokio::fs::read_to_string(&self.path).await?;
            if contents.trim().is_empty() {
                return Ok(Map::new());
            }
            match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => Ok(map),
                _ => Err(PlatformError::Storage(format!(
                    "{} does not contain a JSON object",
                    self.path.display()
                ))),
            }
        }

        async fn write_all(&self, map: &Map<String, Value>) -> Result<(), PlatformError> {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let contents = serde_json::to_string_pretty(map)?;
            tokio::fs::write(&self.path, contents).await?;
            debug!(path = %self.path.display(), keys = map.len(), "storage flushed");
            Ok(())
        }
    }

    #[async_trait]
    impl ExtensionStorage for NativeExtensionStorage {
        async fn get(&self, key: &str) -> Result<Option<Value>, PlatformError> {
            let _guard = self.lock.lock().await;
            Ok(self.read_all().await?.remove(key))
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), PlatformError> {
            let _guard = self.lock.lock().await;
            let mut map = self.read_all().await?;
            map.insert(key.to_owned(), value);
            self.write_all(&map).await
        }

        async fn remove(&self, key: &str) -> Result<(), PlatformError> {
            let _guard = self.lock.lock().await;
            let mut map = self.read_all().await?;
            if map.remove(key).is_some() {
                self.write_all(&map).await?;
            }
            Ok(())
        }
    }
}
