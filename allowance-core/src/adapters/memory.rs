//! In-memory key-value snapshot store
//!
//! Stands in for a cloud key-value store: several handles created with
//! [`MemoryStore::share`] see the same entries, the way devices signed into
//! one cloud account do. Availability can be switched off to simulate an
//! unreachable backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::result::{Error, Result};
use crate::ports::SnapshotStore;

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

/// Snapshot store keeping blobs in process memory under a fixed key
#[derive(Debug, Clone)]
pub struct MemoryStore {
    key: String,
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Another handle onto the same entries
    pub fn share(&self) -> Self {
        self.clone()
    }

    /// Simulate the backend going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.shared.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Store raw bytes directly, bypassing availability (test setup)
    pub fn put_raw(&self, blob: impl Into<Vec<u8>>) -> Result<()> {
        let mut entries = self.lock()?;
        entries.insert(self.key.clone(), blob.into());
        Ok(())
    }

    /// Current raw bytes, bypassing availability
    pub fn get_raw(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(&self.key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.shared
            .entries
            .lock()
            .map_err(|e| Error::persistence(format!("Lock poisoned: {}", e)))
    }

    fn ensure_available(&self) -> Result<()> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(Error::persistence("key-value store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, blob: &[u8]) -> Result<()> {
        self.ensure_available()?;
        self.put_raw(blob)
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;
        self.get_raw()
    }
}
