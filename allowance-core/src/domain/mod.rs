//! Core domain entities
//!
//! All ledger entities are defined here. These are pure data structures
//! with validation and derivation logic - no I/O or external dependencies.

mod account;
pub mod balance;
pub mod result;
pub mod snapshot;
mod transaction;

pub use account::{current_year, Account, AccountSettings, SettingsUpdate, MIN_BIRTH_YEAR};
pub use balance::{DerivedBalances, LedgerTotals};
pub use snapshot::{ReplicationMessage, Snapshot, REPLICATION_KEY, SNAPSHOT_VERSION};
pub use transaction::{Transaction, TransactionKind};
