//! Ledger actor - serializes local edits and peer snapshots
//!
//! The [`LedgerStore`] assumes a single writer. When local commands and
//! incoming replication messages arrive concurrently, the actor owns the store
//! on one task and applies both streams in arrival order. Callers talk to it
//! through a cloneable [`LedgerHandle`].

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountSettings, SettingsUpdate, Snapshot, Transaction, TransactionKind};
use crate::ports::{ReceiveHandler, Replicator};
use crate::services::ledger::{LedgerEvent, LedgerStore, LedgerSummary};

type Command = Box<dyn FnOnce(&mut LedgerStore) + Send>;

/// Spawns the task that owns a [`LedgerStore`]
pub struct LedgerActor;

impl LedgerActor {
    /// Move `store` onto its own task
    ///
    /// Snapshots delivered by `replicator` replace the ledger wholesale. The
    /// task ends when every handle is dropped and yields the store back.
    pub fn spawn(
        mut store: LedgerStore,
        replicator: Option<Arc<dyn Replicator>>,
    ) -> (LedgerHandle, JoinHandle<LedgerStore>) {
        let (command_tx, mut commands) = mpsc::unbounded_channel::<Command>();
        let (incoming_tx, mut incoming) = mpsc::unbounded_channel::<Vec<u8>>();

        if let Some(replicator) = &replicator {
            let handler: ReceiveHandler = Arc::new(move |blob| {
                let _ = incoming_tx.send(blob);
            });
            replicator.on_receive(handler);
        }

        let handle = tokio::spawn(async move {
            info!("Ledger actor started");
            loop {
                tokio::select! {
                    command = commands.recv() => match command {
                        Some(command) => command(&mut store),
                        None => break,
                    },
                    Some(blob) = incoming.recv() => {
                        // Unreadable snapshots are logged by the store and dropped
                        if let Ok(accounts) = store.apply_remote(&blob) {
                            debug!(accounts, "Applied peer snapshot");
                        }
                    }
                }
            }
            // keep the link alive until the loop ends
            drop(replicator);
            info!("Ledger actor stopped");
            store
        });

        (LedgerHandle { tx: command_tx }, handle)
    }
}

/// Cloneable async front-end to a running [`LedgerActor`]
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl LedgerHandle {
    /// Run `f` against the store on the actor task
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LedgerStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command: Command = Box::new(move |store| {
            let _ = reply_tx.send(f(store));
        });
        self.tx.send(command).map_err(|_| Error::Closed)?;
        reply_rx.await.map_err(|_| Error::Closed)
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.call(|store| store.accounts().to_vec()).await
    }

    pub async fn sorted_accounts(&self) -> Result<Vec<Account>> {
        self.call(|store| store.sorted_accounts().into_iter().cloned().collect())
            .await
    }

    pub async fn account(&self, account_id: Uuid) -> Result<Option<Account>> {
        self.call(move |store| store.account(account_id).cloned()).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot> {
        self.call(|store| store.snapshot()).await
    }

    pub async fn summary(&self) -> Result<LedgerSummary> {
        self.call(|store| store.summary()).await
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<LedgerEvent>> {
        self.call(|store| store.subscribe()).await
    }

    pub async fn add_account(
        &self,
        name: impl Into<String>,
        birth_year: i32,
        settings: AccountSettings,
    ) -> Result<Account> {
        let name = name.into();
        self.call(move |store| store.add_account(&name, birth_year, settings))
            .await?
    }

    pub async fn remove_account(&self, account_id: Uuid) -> Result<bool> {
        self.call(move |store| store.remove_account(account_id)).await
    }

    pub async fn update_account_settings(
        &self,
        account_id: Uuid,
        update: SettingsUpdate,
    ) -> Result<Account> {
        self.call(move |store| store.update_account_settings(account_id, update))
            .await?
    }

    pub async fn record_transaction(
        &self,
        account_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        note: impl Into<String>,
    ) -> Result<Transaction> {
        let note = note.into();
        self.call(move |store| store.record_transaction(account_id, kind, amount, &note))
            .await?
    }

    pub async fn edit_transaction(
        &self,
        account_id: Uuid,
        transaction_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        note: impl Into<String>,
    ) -> Result<Transaction> {
        let note = note.into();
        self.call(move |store| {
            store.edit_transaction(account_id, transaction_id, kind, amount, &note)
        })
        .await?
    }

    pub async fn delete_transaction(&self, account_id: Uuid, transaction_id: Uuid) -> Result<bool> {
        self.call(move |store| store.delete_transaction(account_id, transaction_id))
            .await?
    }

    pub async fn settle_tithing(&self, account_id: Uuid) -> Result<Option<Transaction>> {
        self.call(move |store| store.settle_tithing(account_id)).await?
    }

    pub async fn settle_savings(&self, account_id: Uuid) -> Result<Option<Transaction>> {
        self.call(move |store| store.settle_savings(account_id)).await?
    }

    /// Apply a peer blob directly, as if it had arrived over the channel
    pub async fn apply_remote(&self, blob: Vec<u8>) -> Result<usize> {
        self.call(move |store| store.apply_remote(&blob)).await?
    }
}
