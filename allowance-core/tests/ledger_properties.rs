//! Property tests for balance derivation and the snapshot format
//!
//! Run with: cargo test --test ledger_properties

use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;

use allowance_core::domain::{AccountSettings, Snapshot, TransactionKind};
use allowance_core::services::LedgerStore;

/// (kind index, amount in cents)
fn entries() -> impl Strategy<Value = Vec<(usize, i64)>> {
    prop::collection::vec((0usize..TransactionKind::ALL.len(), 1i64..100_000), 0..40)
}

fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..=100).prop_map(|pct| Decimal::new(pct, 2))
}

/// Single-account snapshot whose transactions all share one timestamp
fn same_instant_blob(entries: &[(usize, i64)], savings_rate: Decimal) -> Vec<u8> {
    let transactions: Vec<_> = entries
        .iter()
        .enumerate()
        .map(|(i, (kind, cents))| {
            json!({
                "id": format!("00000000-0000-4000-8000-{:012}", i),
                "kind": TransactionKind::ALL[*kind].as_str(),
                "amount": Decimal::new(*cents, 2).to_string(),
                "note": "",
                "timestamp": "2025-01-01T00:00:00Z",
            })
        })
        .collect();

    let doc = json!({
        "version": 1,
        "accounts": [{
            "id": "11111111-1111-4111-8111-111111111111",
            "name": "Prop",
            "birthYear": 2015,
            "transactions": transactions,
            "tithingEnabled": true,
            "savingsEnabled": true,
            "savingsRate": savings_rate.to_string(),
        }]
    });
    serde_json::to_vec(&doc).unwrap()
}

fn ledger_from(entries: &[(usize, i64)], savings_rate: Decimal) -> LedgerStore {
    let mut ledger = LedgerStore::new();
    let settings = AccountSettings {
        tithing_enabled: true,
        savings_enabled: true,
        savings_rate,
    };
    let id = ledger.add_account("Prop", 2015, settings).unwrap().id();
    for (kind, cents) in entries {
        ledger
            .record_transaction(id, TransactionKind::ALL[*kind], Decimal::new(*cents, 2), "")
            .unwrap();
    }
    ledger
}

proptest! {
    #[test]
    fn recomputation_is_idempotent(entries in entries(), savings_rate in rate()) {
        let blob = same_instant_blob(&entries, savings_rate);
        let once = Snapshot::decode(&blob).unwrap();
        let twice = Snapshot::decode(&once.encode().unwrap()).unwrap();

        prop_assert_eq!(once.accounts[0].derived(), twice.accounts[0].derived());
    }

    #[test]
    fn equal_timestamps_commute(
        entries in entries(),
        savings_rate in rate(),
        seed in any::<u64>(),
    ) {
        let mut shuffled = entries.clone();
        // deterministic Fisher-Yates driven by the seed
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            shuffled.swap(i, j);
        }

        let original = Snapshot::decode(&same_instant_blob(&entries, savings_rate)).unwrap();
        let permuted = Snapshot::decode(&same_instant_blob(&shuffled, savings_rate)).unwrap();

        prop_assert_eq!(original.accounts[0].derived(), permuted.accounts[0].derived());
    }

    #[test]
    fn dues_are_never_negative(entries in entries(), savings_rate in rate()) {
        let ledger = ledger_from(&entries, savings_rate);
        let account = &ledger.accounts()[0];

        prop_assert!(account.tithing_due() >= Decimal::ZERO);
        prop_assert!(account.savings_due() >= Decimal::ZERO);
    }

    #[test]
    fn snapshot_round_trips(entries in entries(), savings_rate in rate()) {
        let ledger = ledger_from(&entries, savings_rate);
        let snapshot = ledger.snapshot();

        let decoded = Snapshot::decode(&snapshot.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn settlement_clears_dues(entries in entries(), savings_rate in rate()) {
        let mut ledger = ledger_from(&entries, savings_rate);
        let id = ledger.accounts()[0].id();

        ledger.settle_tithing(id).unwrap();
        ledger.settle_savings(id).unwrap();
        let account = ledger.account(id).unwrap();
        prop_assert_eq!(account.tithing_due(), Decimal::ZERO);
        prop_assert_eq!(account.savings_due(), Decimal::ZERO);

        let count = account.transactions().len();
        prop_assert!(ledger.settle_tithing(id).unwrap().is_none());
        prop_assert!(ledger.settle_savings(id).unwrap().is_none());
        prop_assert_eq!(ledger.account(id).unwrap().transactions().len(), count);
    }
}
