//! In-process peer channel
//!
//! A [`PeerHub`] fans replication messages out to every [`PeerLink`]
//! attached to it, like a device-to-device messaging session. Each link
//! subscribes when it is created, so messages sent before a handler is
//! registered are buffered and delivered once it is.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::ReplicationMessage;
use crate::ports::{ReceiveHandler, Replicator};

/// Messages buffered per link before the oldest are dropped
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Envelope {
    origin: String,
    message: Arc<Vec<u8>>,
}

/// Broadcast medium shared by a group of devices
#[derive(Debug, Clone)]
pub struct PeerHub {
    sender: broadcast::Sender<Envelope>,
}

impl Default for PeerHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PeerHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a device to the hub
    pub fn link(&self, device: impl Into<String>) -> PeerLink {
        PeerLink {
            device: device.into(),
            sender: self.sender.clone(),
            pending: Mutex::new(Some(self.sender.subscribe())),
            listener: Mutex::new(None),
        }
    }
}

/// One device's connection to a [`PeerHub`]
pub struct PeerLink {
    device: String,
    sender: broadcast::Sender<Envelope>,
    /// Subscription held until a handler takes it over
    pending: Mutex<Option<broadcast::Receiver<Envelope>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl PeerLink {
    pub fn device(&self) -> &str {
        &self.device
    }

    fn take_receiver(&self) -> broadcast::Receiver<Envelope> {
        match self.pending.lock() {
            Ok(mut pending) => pending.take().unwrap_or_else(|| self.sender.subscribe()),
            Err(_) => self.sender.subscribe(),
        }
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

#[async_trait]
impl Replicator for PeerLink {
    fn name(&self) -> &str {
        "peer"
    }

    async fn push(&self, blob: &[u8]) -> Result<()> {
        let message = ReplicationMessage::seal(blob)?;
        let envelope = Envelope {
            origin: self.device.clone(),
            message: Arc::new(message),
        };
        let receivers = self
            .sender
            .send(envelope)
            .map_err(|_| Error::replication("no peers attached"))?;
        debug!(device = %self.device, receivers, "Pushed snapshot to peers");
        Ok(())
    }

    fn on_receive(&self, handler: ReceiveHandler) {
        let mut receiver = self.take_receiver();
        let device = self.device.clone();

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => {
                        if envelope.origin == device {
                            continue;
                        }
                        match ReplicationMessage::open(&envelope.message) {
                            Ok(blob) => handler(blob),
                            Err(e) => warn!(
                                device = %device,
                                origin = %envelope.origin,
                                error = %e,
                                "Dropping malformed replication message"
                            ),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Later snapshots supersede the skipped ones
                        warn!(device = %device, skipped, "Peer channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        if let Ok(mut listener) = self.listener.lock() {
            if let Some(previous) = listener.replace(handle) {
                previous.abort();
            }
        }
    }
}
