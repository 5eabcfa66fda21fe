//! Layered snapshot store - cloud first, device-local fallback
//!
//! Saves go to every layer so the local copy always exists as a backup.
//! Loads walk the layers in order and return the first blob that decodes;
//! an unreachable or garbled layer falls through to the next one.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::Snapshot;
use crate::ports::SnapshotStore;

/// Ordered stack of snapshot stores, highest priority first
pub struct LayeredStore {
    layers: Vec<Arc<dyn SnapshotStore>>,
}

impl LayeredStore {
    pub fn new(layers: Vec<Arc<dyn SnapshotStore>>) -> Self {
        Self { layers }
    }

    /// Primary (cloud) store backed by a local fallback
    pub fn with_fallback(primary: Arc<dyn SnapshotStore>, fallback: Arc<dyn SnapshotStore>) -> Self {
        Self::new(vec![primary, fallback])
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for LayeredStore {
    fn name(&self) -> &str {
        "layered"
    }

    /// Succeeds if at least one layer accepted the blob
    async fn save(&self, blob: &[u8]) -> Result<()> {
        let mut failures = Vec::new();
        for layer in &self.layers {
            if let Err(e) = layer.save(blob).await {
                warn!(store = layer.name(), error = %e, "Snapshot layer save failed");
                failures.push(format!("{}: {}", layer.name(), e));
            }
        }

        if !self.layers.is_empty() && failures.len() == self.layers.len() {
            return Err(Error::persistence(format!(
                "all snapshot layers failed ({})",
                failures.join("; ")
            )));
        }
        Ok(())
    }

    async fn load(&self) -> Result<Option<Vec<u8>>> {
        for layer in &self.layers {
            match layer.load().await {
                Ok(Some(blob)) => match Snapshot::decode(&blob) {
                    Ok(_) => {
                        debug!(store = layer.name(), "Loaded snapshot from layer");
                        return Ok(Some(blob));
                    }
                    Err(e) => {
                        warn!(store = layer.name(), error = %e, "Skipping unreadable snapshot layer");
                    }
                },
                Ok(None) => debug!(store = layer.name(), "Snapshot layer is empty"),
                Err(e) => warn!(store = layer.name(), error = %e, "Snapshot layer load failed"),
            }
        }
        Ok(None)
    }
}
