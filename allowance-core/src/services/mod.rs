//! Service layer - ledger orchestration
//!
//! The ledger store holds the accounts and enforces every rule. The sync
//! service persists and replicates what the store publishes, and the actor
//! serializes local edits with snapshots arriving from peers.

mod actor;
mod ledger;
mod sync;

pub use actor::{LedgerActor, LedgerHandle};
pub use ledger::{
    AccountSummary, LedgerEvent, LedgerStore, LedgerSummary, SAVINGS_WITHDRAWAL_NOTE,
    TITHING_PAYMENT_NOTE,
};
pub use sync::{Propagation, SnapshotPublisher, SyncService, SyncStats, SyncWorker};
