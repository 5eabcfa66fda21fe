//! Allowance Core - ledger engine for children's allowances
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Account, Transaction) and balance derivation
//! - **ports**: Trait definitions for external dependencies (SnapshotStore, Replicator)
//! - **services**: Ledger store, background sync worker and ledger actor
//! - **adapters**: Concrete implementations (file, memory, layered, peer)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use adapters::{FileStore, LayeredStore, PeerHub};
use config::Config;
use ports::{Replicator, SnapshotStore};
use services::{LedgerStore, SyncService, SyncStats, SyncWorker};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{Account, AccountSettings, SettingsUpdate, Snapshot, Transaction, TransactionKind};
pub use services::{LedgerEvent, LedgerSummary};

/// Main context for allowance operations
///
/// Holds the configuration, the loaded ledger and the worker persisting it.
/// Call [`AllowanceContext::close`] before exiting so pending writes land.
pub struct AllowanceContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub ledger: LedgerStore,
    worker: SyncWorker,
}

impl AllowanceContext {
    /// Open the ledger stored under `data_dir` with no peer channel
    pub async fn open(data_dir: &Path) -> Result<Self> {
        Self::open_with(data_dir, None).await
    }

    pub async fn open_with(
        data_dir: &Path,
        replicator: Option<Arc<dyn Replicator>>,
    ) -> Result<Self> {
        let config = Self::prepare(data_dir)?;
        Self::open_configured(data_dir, config, replicator).await
    }

    /// Open the ledger and join `hub` under the configured device name
    pub async fn open_on_hub(data_dir: &Path, hub: &PeerHub) -> Result<Self> {
        let config = Self::prepare(data_dir)?;
        let link: Arc<dyn Replicator> = Arc::new(hub.link(config.device_name.clone()));
        Self::open_configured(data_dir, config, Some(link)).await
    }

    fn prepare(data_dir: &Path) -> Result<Config> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
        Config::load(data_dir)
    }

    async fn open_configured(
        data_dir: &Path,
        config: Config,
        replicator: Option<Arc<dyn Replicator>>,
    ) -> Result<Self> {
        info!(
            device = %config.device_name,
            replication = replicator.as_ref().map(|r| r.name()).unwrap_or("none"),
            "Opening ledger"
        );
        let sync = SyncService::new(Self::snapshot_store(&config, data_dir), replicator);
        let (ledger, worker) = sync.open().await;

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            ledger,
            worker,
        })
    }

    /// Cloud layer over the device-local file when a cloud directory is set
    pub fn snapshot_store(config: &Config, data_dir: &Path) -> Arc<dyn SnapshotStore> {
        let local: Arc<dyn SnapshotStore> =
            Arc::new(FileStore::new(config.local_snapshot_path(data_dir)));

        match config.cloud_snapshot_path() {
            Some(cloud_path) => {
                debug!(path = %cloud_path.display(), "Using cloud snapshot layer");
                let cloud: Arc<dyn SnapshotStore> = Arc::new(FileStore::new(cloud_path));
                Arc::new(LayeredStore::with_fallback(cloud, local))
            }
            None => local,
        }
    }

    /// Stop accepting changes and wait for the last snapshot to be written
    pub async fn close(self) -> Result<SyncStats> {
        drop(self.ledger);
        let stats = self.worker.finish().await?;
        Ok(stats)
    }
}
