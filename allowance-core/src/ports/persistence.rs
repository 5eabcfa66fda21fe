//! Persistence port - opaque snapshot blob storage

use async_trait::async_trait;

use crate::domain::result::Result;

/// Storage for the serialized ledger
///
/// Implementations know nothing about the blob's contents. The ledger writes
/// the full snapshot after every mutation and reads the last one on startup.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name used in log output (e.g., "file", "memory")
    fn name(&self) -> &str;

    /// Persist the blob, replacing whatever was stored before
    async fn save(&self, blob: &[u8]) -> Result<()>;

    /// Load the last persisted blob, or `None` if nothing was ever saved
    async fn load(&self) -> Result<Option<Vec<u8>>>;
}
