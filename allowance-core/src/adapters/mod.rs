//! Adapter implementations
//!
//! Adapters implement the port traits with concrete backends:
//! - Local filesystem (atomic JSON file) for SnapshotStore
//! - In-memory key-value store for SnapshotStore (cloud stand-in, tests)
//! - Layered cloud-then-local composition of SnapshotStores
//! - In-process broadcast hub for Replicator

pub mod file;
pub mod layered;
pub mod memory;
pub mod peer;

pub use file::FileStore;
pub use layered::LayeredStore;
pub use memory::MemoryStore;
pub use peer::{PeerHub, PeerLink};
