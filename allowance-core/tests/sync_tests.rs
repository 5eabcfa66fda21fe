//! Persistence and replication tests
//!
//! File-backed stores run against real temp directories; devices talk over
//! an in-process peer hub.
//!
//! Run with: cargo test --test sync_tests -- --nocapture

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tempfile::TempDir;
use tokio::time::timeout;

use allowance_core::adapters::{MemoryStore, PeerHub};
use allowance_core::config::Config;
use allowance_core::domain::{AccountSettings, Snapshot, TransactionKind};
use allowance_core::ports::{Replicator, SnapshotStore};
use allowance_core::services::{LedgerActor, LedgerEvent, LedgerHandle, SyncService, SyncWorker};
use allowance_core::AllowanceContext;

// ============================================================================
// Test Helpers
// ============================================================================

struct Device {
    handle: LedgerHandle,
    task: tokio::task::JoinHandle<allowance_core::services::LedgerStore>,
    worker: SyncWorker,
    store: MemoryStore,
}

impl Device {
    async fn join(hub: &PeerHub, name: &str) -> Self {
        let store = MemoryStore::new(name);
        let link: Arc<dyn Replicator> = Arc::new(hub.link(name));
        let service = SyncService::new(Arc::new(store.share()), Some(link));

        let (ledger, worker) = service.open().await;
        let (handle, task) = LedgerActor::spawn(ledger, service.replicator());
        Self {
            handle,
            task,
            worker,
            store,
        }
    }

    /// Stop the actor and wait for the last snapshot to be written
    async fn shut_down(self) -> MemoryStore {
        drop(self.handle);
        let ledger = self.task.await.unwrap();
        drop(ledger);
        self.worker.finish().await.unwrap();
        self.store
    }
}

async fn next_replace(events: &mut tokio::sync::broadcast::Receiver<LedgerEvent>) -> usize {
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for peer snapshot")
            .unwrap();
        if let LedgerEvent::Replaced { accounts } = event {
            return accounts;
        }
    }
}

fn write_settings(data_dir: &TempDir, cloud_dir: &TempDir) {
    let config = Config {
        cloud_dir: Some(cloud_dir.path().to_path_buf()),
        ..Config::default()
    };
    config.save(data_dir.path()).unwrap();
}

// ============================================================================
// Context Persistence
// ============================================================================

#[tokio::test]
async fn test_context_persists_across_reopen() {
    let dir = TempDir::new().unwrap();

    let mut ctx = AllowanceContext::open(dir.path()).await.unwrap();
    let id = ctx
        .ledger
        .add_account("Alex", 2015, AccountSettings::default())
        .unwrap()
        .id();
    ctx.ledger
        .record_transaction(id, TransactionKind::Deposit, dec!(25), "Chores")
        .unwrap();
    let stats = ctx.close().await.unwrap();
    assert_eq!(stats.save_failures, 0);

    let ctx = AllowanceContext::open(dir.path()).await.unwrap();
    let account = ctx.ledger.account(id).expect("account survives reopen");
    assert_eq!(account.balance(), dec!(25));
    assert_eq!(account.tithing_due(), dec!(2.5));
    assert_eq!(account.transactions()[0].note(), "Chores");
}

#[tokio::test]
async fn test_context_with_garbage_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ledger.json"), b"\xff\xfe not a ledger").unwrap();

    let ctx = AllowanceContext::open(dir.path()).await.unwrap();
    assert!(ctx.ledger.accounts().is_empty());
}

#[tokio::test]
async fn test_context_migrates_unversioned_file() {
    let dir = TempDir::new().unwrap();
    let legacy = r#"[{
        "id": "6F9619FF-8B86-D011-B42D-00C04FC964FF",
        "name": "Legacy",
        "birthYear": 2012,
        "transactions": [
            {"id": "7F9619FF-8B86-D011-B42D-00C04FC964FF", "type": "deposit",
             "amount": 40, "note": "", "date": 786000000}
        ],
        "isTithingEnabled": true,
        "isSavingsEnabled": false,
        "savingsPercentage": 0
    }]"#;
    std::fs::write(dir.path().join("ledger.json"), legacy).unwrap();

    let ctx = AllowanceContext::open(dir.path()).await.unwrap();
    assert_eq!(ctx.ledger.accounts().len(), 1);
    let account = &ctx.ledger.accounts()[0];
    assert_eq!(account.name(), "Legacy");
    assert_eq!(account.balance(), dec!(40));
    assert_eq!(account.tithing_due(), dec!(4));
}

#[tokio::test]
async fn test_cloud_layer_is_written_and_falls_back() {
    let data = TempDir::new().unwrap();
    let cloud = TempDir::new().unwrap();
    write_settings(&data, &cloud);

    let mut ctx = AllowanceContext::open(data.path()).await.unwrap();
    let id = ctx
        .ledger
        .add_account("Cloudy", 2016, AccountSettings::default())
        .unwrap()
        .id();
    ctx.close().await.unwrap();

    let cloud_file = cloud.path().join("allowance-tracker-data.json");
    assert!(cloud_file.exists());
    assert!(data.path().join("ledger.json").exists());

    // a garbled cloud copy falls through to the device-local one
    std::fs::write(&cloud_file, b"{\"version\":").unwrap();
    let ctx = AllowanceContext::open(data.path()).await.unwrap();
    assert!(ctx.ledger.account(id).is_some());
}

#[tokio::test]
async fn test_snapshot_store_prefers_cloud() {
    let data = TempDir::new().unwrap();
    let cloud = TempDir::new().unwrap();
    write_settings(&data, &cloud);
    let config = Config::load(data.path()).unwrap();

    let mut ctx = AllowanceContext::open(data.path()).await.unwrap();
    ctx.ledger
        .add_account("Shared", 2016, AccountSettings::default())
        .unwrap();
    ctx.close().await.unwrap();

    // another device updated the cloud copy only
    let mut other = allowance_core::services::LedgerStore::new();
    other
        .add_account("From elsewhere", 2018, AccountSettings::default())
        .unwrap();
    std::fs::write(
        cloud.path().join("allowance-tracker-data.json"),
        other.snapshot().encode().unwrap(),
    )
    .unwrap();

    let store = AllowanceContext::snapshot_store(&config, data.path());
    let blob = store.load().await.unwrap().unwrap();
    let snapshot = Snapshot::decode(&blob).unwrap();
    assert_eq!(snapshot.accounts[0].name(), "From elsewhere");
}

// ============================================================================
// Replication Between Devices
// ============================================================================

#[tokio::test]
async fn test_mutation_reaches_peer_device() {
    let hub = PeerHub::default();
    let phone = Device::join(&hub, "phone").await;
    let watch = Device::join(&hub, "watch").await;
    let mut watch_events = watch.handle.subscribe().await.unwrap();

    let account = phone
        .handle
        .add_account("Alex", 2015, AccountSettings::default())
        .await
        .unwrap();

    assert_eq!(next_replace(&mut watch_events).await, 1);
    let mirrored = watch.handle.account(account.id()).await.unwrap();
    assert_eq!(mirrored.map(|a| a.name().to_string()), Some("Alex".to_string()));

    let watch_store = watch.shut_down().await;
    phone.shut_down().await;

    // received snapshots are persisted locally
    let persisted = Snapshot::decode(&watch_store.get_raw().unwrap().unwrap()).unwrap();
    assert_eq!(persisted.accounts[0].id(), account.id());
}

#[tokio::test]
async fn test_received_snapshot_is_not_echoed() {
    let hub = PeerHub::default();
    let phone = Device::join(&hub, "phone").await;
    let watch = Device::join(&hub, "watch").await;
    let mut phone_events = phone.handle.subscribe().await.unwrap();
    let mut watch_events = watch.handle.subscribe().await.unwrap();

    phone
        .handle
        .add_account("Alex", 2015, AccountSettings::default())
        .await
        .unwrap();
    next_replace(&mut watch_events).await;

    assert_eq!(
        phone_events.recv().await.unwrap(),
        LedgerEvent::AccountAdded(phone.handle.accounts().await.unwrap()[0].id())
    );
    let echoed = timeout(Duration::from_millis(200), phone_events.recv()).await;
    assert!(echoed.is_err(), "phone received its own change back");

    watch.shut_down().await;
    phone.shut_down().await;
}

#[tokio::test]
async fn test_last_snapshot_wins_across_devices() {
    let hub = PeerHub::default();
    let phone = Device::join(&hub, "phone").await;
    let watch = Device::join(&hub, "watch").await;
    let mut phone_events = phone.handle.subscribe().await.unwrap();
    let mut watch_events = watch.handle.subscribe().await.unwrap();

    let alex = phone
        .handle
        .add_account("Alex", 2015, AccountSettings::default())
        .await
        .unwrap();
    next_replace(&mut watch_events).await;

    watch
        .handle
        .record_transaction(alex.id(), TransactionKind::Deposit, dec!(10), "")
        .await
        .unwrap();
    next_replace(&mut phone_events).await;

    let on_phone = phone.handle.account(alex.id()).await.unwrap().unwrap();
    assert_eq!(on_phone.balance(), dec!(10));
    assert_eq!(on_phone.tithing_due(), dec!(1));

    watch.shut_down().await;
    phone.shut_down().await;
}

#[tokio::test]
async fn test_context_joins_hub_under_configured_device_name() {
    let data = TempDir::new().unwrap();
    let config = Config {
        device_name: "kitchen".to_string(),
        ..Config::default()
    };
    config.save(data.path()).unwrap();

    let hub = PeerHub::default();
    let (watch_tx, mut watch_rx) = tokio::sync::mpsc::unbounded_channel();
    let watch = hub.link("watch");
    watch.on_receive(Arc::new(move |blob: Vec<u8>| {
        let _ = watch_tx.send(blob);
    }));
    // same name as the context, so its own messages are filtered out
    let (twin_tx, mut twin_rx) = tokio::sync::mpsc::unbounded_channel();
    let twin = hub.link("kitchen");
    twin.on_receive(Arc::new(move |blob: Vec<u8>| {
        let _ = twin_tx.send(blob);
    }));

    let mut ctx = AllowanceContext::open_on_hub(data.path(), &hub).await.unwrap();
    assert_eq!(ctx.config.device_name, "kitchen");
    ctx.ledger
        .add_account("Alex", 2015, AccountSettings::default())
        .unwrap();
    ctx.close().await.unwrap();

    let blob = timeout(Duration::from_secs(2), watch_rx.recv())
        .await
        .expect("watch never received the snapshot")
        .unwrap();
    assert_eq!(Snapshot::decode(&blob).unwrap().accounts[0].name(), "Alex");

    let from_twin = timeout(Duration::from_millis(200), twin_rx.recv()).await;
    assert!(from_twin.is_err(), "link named like the sender got its message");
}
