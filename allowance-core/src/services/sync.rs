//! Sync service - background persistence and replication of snapshots
//!
//! The ledger hands every post-mutation snapshot to a [`SnapshotPublisher`].
//! A worker task drains the queue, writes the newest blob through the
//! [`SnapshotStore`] and pushes it through the [`Replicator`]. Failures are
//! logged and counted, never reported back to the caller, and never touch the
//! in-memory ledger.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::result::{Error, Result};
use crate::ports::{Replicator, SnapshotStore};
use crate::services::LedgerStore;

/// How far a published snapshot should travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Local mutation: persist and send to peers
    PersistAndPush,
    /// Snapshot that came from a peer: persist only, never echo back
    PersistOnly,
}

#[derive(Debug)]
struct Outbound {
    blob: Vec<u8>,
    propagation: Propagation,
}

/// Fire-and-forget handle used by the ledger to hand off snapshots
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl SnapshotPublisher {
    /// Queue a snapshot; never blocks
    pub fn publish(&self, blob: Vec<u8>, propagation: Propagation) {
        if self.tx.send(Outbound { blob, propagation }).is_err() {
            warn!("Sync worker has stopped; snapshot not persisted");
        }
    }
}

/// Counters reported by the worker when it finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub saved: usize,
    pub save_failures: usize,
    pub pushed: usize,
    pub push_failures: usize,
    /// Snapshots superseded by a newer one before they were written
    pub coalesced: usize,
}

/// Running worker; await [`SyncWorker::finish`] to flush before exit
pub struct SyncWorker {
    handle: JoinHandle<SyncStats>,
}

impl SyncWorker {
    /// Wait until every publisher is dropped and the queue is drained
    pub async fn finish(self) -> Result<SyncStats> {
        self.handle
            .await
            .map_err(|e| Error::persistence(format!("sync worker failed: {}", e)))
    }
}

/// Wires the ledger to its storage and peer channel
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn SnapshotStore>,
    replicator: Option<Arc<dyn Replicator>>,
}

impl SyncService {
    pub fn new(store: Arc<dyn SnapshotStore>, replicator: Option<Arc<dyn Replicator>>) -> Self {
        Self { store, replicator }
    }

    pub fn replicator(&self) -> Option<Arc<dyn Replicator>> {
        self.replicator.clone()
    }

    /// Load the last snapshot; anything unreadable yields an empty ledger
    pub async fn load(&self) -> LedgerStore {
        let blob = match self.store.load().await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Snapshot load failed; starting empty");
                None
            }
        };
        LedgerStore::from_blob(blob.as_deref())
    }

    /// Load the ledger and attach a running publisher to it
    pub async fn open(&self) -> (LedgerStore, SyncWorker) {
        let mut ledger = self.load().await;
        let (publisher, worker) = self.spawn();
        ledger.attach_publisher(publisher);
        (ledger, worker)
    }

    /// Start the background worker
    pub fn spawn(&self) -> (SnapshotPublisher, SyncWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = self.clone();
        let handle = tokio::spawn(async move { service.run(rx).await });
        (SnapshotPublisher { tx }, SyncWorker { handle })
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<Outbound>) -> SyncStats {
        let mut stats = SyncStats::default();

        while let Some(mut next) = rx.recv().await {
            // Every snapshot is complete, so only the newest queued one matters.
            // A push is still owed if any skipped snapshot needed one.
            let mut push = next.propagation == Propagation::PersistAndPush;
            while let Ok(newer) = rx.try_recv() {
                push |= newer.propagation == Propagation::PersistAndPush;
                next = newer;
                stats.coalesced += 1;
            }

            match self.store.save(&next.blob).await {
                Ok(()) => {
                    stats.saved += 1;
                    debug!(store = self.store.name(), bytes = next.blob.len(), "Snapshot saved");
                }
                Err(e) => {
                    stats.save_failures += 1;
                    warn!(store = self.store.name(), error = %e, "Snapshot save failed");
                }
            }

            if let (true, Some(replicator)) = (push, &self.replicator) {
                match replicator.push(&next.blob).await {
                    Ok(()) => stats.pushed += 1,
                    Err(e) => {
                        stats.push_failures += 1;
                        warn!(channel = replicator.name(), error = %e, "Snapshot push failed");
                    }
                }
            }
        }

        info!(
            saved = stats.saved,
            save_failures = stats.save_failures,
            pushed = stats.pushed,
            push_failures = stats.push_failures,
            "Sync worker stopped"
        );
        stats
    }
}
