//! In-memory storage areas.
//!
//! Both areas use a [`Mutex`] to satisfy the `Send + Sync` bounds of the
//! storage traits. Each can be switched into a failing mode to exercise
//! the relay's degrade-to-nothing paths.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PlatformError;
use crate::storage::{ExtensionStorage, LocalStorage};

/// In-memory `storage.local`.
#[derive(Default)]
pub struct MemoryExtensionStorage {
    values: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryExtensionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set` / `remove` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Direct synchronous read, bypassing failure injection.
    pub fn snapshot(&self, key: &str) -> Option<Value> {
        self.values
            .lock()
            .expect("MemoryExtensionStorage mutex poisoned")
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl ExtensionStorage for MemoryExtensionStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, PlatformError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PlatformError::Storage(format!("read of '{key}' failed")));
        }
        Ok(self.snapshot(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), PlatformError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlatformError::Storage(format!("write of '{key}' failed")));
        }
        self.values
            .lock()
            .expect("MemoryExtensionStorage mutex poisoned")
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PlatformError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlatformError::Storage(format!("remove of '{key}' failed")));
        }
        self.values
            .lock()
            .expect("MemoryExtensionStorage mutex poisoned")
            .remove(key);
        Ok(())
    }
}

/// In-memory page `localStorage`.
#[derive(Default)]
pub struct MemoryLocalStorage {
    items: Mutex<HashMap<String, String>>,
    quota_exhausted: AtomicBool,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: pre-populate an item.
    pub fn with_item(self, key: &str, value: &str) -> Self {
        self.items
            .lock()
            .expect("MemoryLocalStorage mutex poisoned")
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Make every subsequent `set_item` fail with a quota error.
    pub fn exhaust_quota(&self, exhausted: bool) {
        self.quota_exhausted.store(exhausted, Ordering::SeqCst);
    }
}

impl LocalStorage for MemoryLocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .expect("MemoryLocalStorage mutex poisoned")
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        if self.quota_exhausted.load(Ordering::SeqCst) {
            return Err(PlatformError::QuotaExceeded {
                key: key.to_owned(),
            });
        }
        self.items
            .lock()
            .expect("MemoryLocalStorage mutex poisoned")
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items
            .lock()
            .expect("MemoryLocalStorage mutex poisoned")
            .remove(key);
    }
}
