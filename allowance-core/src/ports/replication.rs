//! Replication port - peer-to-peer snapshot exchange

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::result::Result;

/// Callback invoked with the snapshot blob carried by each incoming message
pub type ReceiveHandler = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Channel to other devices holding a copy of the ledger
///
/// Delivery is best-effort and unordered with respect to local edits.
/// Receivers replace their whole ledger with what arrives.
#[async_trait]
pub trait Replicator: Send + Sync {
    /// Channel name used in log output
    fn name(&self) -> &str;

    /// Send a snapshot blob to every reachable peer
    async fn push(&self, blob: &[u8]) -> Result<()>;

    /// Register the handler for snapshots arriving from peers
    ///
    /// Messages that arrived before registration are delivered once the
    /// handler is installed. Registering again replaces the previous handler.
    fn on_receive(&self, handler: ReceiveHandler);
}
