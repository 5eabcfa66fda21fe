//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The ledger depends
//! only on these traits: an opaque blob store for persistence and a
//! best-effort peer channel for replication.

mod persistence;
mod replication;

pub use persistence::SnapshotStore;
pub use replication::{ReceiveHandler, Replicator};
