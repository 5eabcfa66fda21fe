//! Snapshot blob format
//!
//! The whole ledger is stored and replicated as one JSON document:
//! ```json
//! { "version": 1, "accounts": [ { "id": "...", "transactions": [ ... ], ... } ] }
//! ```
//! Older installs wrote a bare array of account records with no version
//! field. Those are read as version 0 and migrated on decode. Documents with a
//! version newer than [`SNAPSHOT_VERSION`] are rejected with
//! [`Error::UnsupportedSnapshot`] instead of being misread.
//!
//! Peers exchange the document wrapped in a [`ReplicationMessage`] keyed by
//! [`REPLICATION_KEY`].

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::account::{Account, AccountSettings};
use super::result::{Error, Result};
use super::transaction::{Transaction, TransactionKind};

/// Schema version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// Field name carrying the snapshot inside a replication message
pub const REPLICATION_KEY: &str = "children";

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the reference
/// date used by numeric timestamps in unversioned snapshots
const REFERENCE_DATE_OFFSET_SECS: f64 = 978_307_200.0;

/// Full serialized account collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    pub accounts: Vec<Account>,
}

impl Snapshot {
    /// Wrap accounts in a document at the current schema version
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            accounts,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode any known schema version, migrating to the current one
    ///
    /// Accounts come back with duplicate ids dropped and balances recomputed.
    /// Accounts holding a non-positive amount, a savings rate outside
    /// `[0, 1]` or totals outside the `Decimal` range fail the whole decode.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: JsonValue = serde_json::from_slice(bytes)?;

        if value.is_array() {
            return Ok(Self::new(normalize_accounts(migrate_v0(value)?)?));
        }

        let version = value
            .as_object()
            .ok_or_else(|| Error::persistence("snapshot must be a JSON object or array"))?
            .get("version")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| Error::persistence("snapshot has no version field"))?;
        let version = u32::try_from(version).unwrap_or(u32::MAX);
        if version > SNAPSHOT_VERSION {
            return Err(Error::UnsupportedSnapshot {
                version,
                supported: SNAPSHOT_VERSION,
            });
        }
        if version == 0 {
            return Err(Error::persistence("version 0 snapshots are bare arrays"));
        }

        let snapshot: Snapshot = serde_json::from_value(value)?;
        let accounts = snapshot.accounts;

        Ok(Self::new(normalize_accounts(accounts)?))
    }
}

/// Drop repeated account ids (first wins) and re-derive every balance
fn normalize_accounts(accounts: Vec<Account>) -> Result<Vec<Account>> {
    let mut seen = HashSet::new();
    accounts
        .into_iter()
        .filter(|a| seen.insert(a.id()))
        .map(Account::normalized)
        .collect()
}

/// Envelope for snapshots sent between devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationMessage {
    children: JsonValue,
}

impl ReplicationMessage {
    /// Put an encoded snapshot into the envelope for sending
    pub fn seal(snapshot_blob: &[u8]) -> Result<Vec<u8>> {
        let children: JsonValue = serde_json::from_slice(snapshot_blob)?;
        Ok(serde_json::to_vec(&ReplicationMessage { children })?)
    }

    /// Extract the snapshot bytes from a received message
    pub fn open(message: &[u8]) -> Result<Vec<u8>> {
        let value: JsonValue = serde_json::from_slice(message)?;
        let children = value
            .get(REPLICATION_KEY)
            .ok_or_else(|| Error::replication(format!("message has no '{}' field", REPLICATION_KEY)))?;
        Ok(serde_json::to_vec(children)?)
    }
}

// =============================================================================
// Version 0 (unversioned bare array)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAccount {
    id: String,
    name: String,
    birth_year: i32,
    #[serde(default)]
    transactions: Vec<LegacyTransaction>,
    #[serde(default = "default_true")]
    is_tithing_enabled: bool,
    #[serde(default)]
    is_savings_enabled: bool,
    #[serde(default)]
    savings_percentage: f64,
}

#[derive(Debug, Deserialize)]
struct LegacyTransaction {
    id: String,
    #[serde(rename = "type")]
    kind: LegacyKind,
    amount: f64,
    #[serde(default)]
    note: String,
    date: LegacyDate,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum LegacyKind {
    Deposit,
    Withdrawal,
    TithingPayment,
    SavingsDeposit,
}

impl From<LegacyKind> for TransactionKind {
    fn from(kind: LegacyKind) -> Self {
        match kind {
            LegacyKind::Deposit => TransactionKind::Deposit,
            LegacyKind::Withdrawal => TransactionKind::Withdrawal,
            LegacyKind::TithingPayment => TransactionKind::TithingPayment,
            LegacyKind::SavingsDeposit => TransactionKind::SavingsWithdrawal,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyDate {
    /// Seconds since 2001-01-01T00:00:00Z
    Reference(f64),
    Iso(DateTime<Utc>),
}

impl LegacyDate {
    fn to_utc(&self) -> Result<DateTime<Utc>> {
        match self {
            LegacyDate::Iso(dt) => Ok(*dt),
            LegacyDate::Reference(secs) => {
                let millis = ((secs + REFERENCE_DATE_OFFSET_SECS) * 1000.0).round() as i64;
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or_else(|| Error::persistence(format!("timestamp out of range: {}", secs)))
            }
        }
    }
}

fn default_true() -> bool {
    true
}

fn decimal_from_f64(value: f64, dp: u32) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(Error::persistence(format!("non-finite number in snapshot: {}", value)));
    }
    Decimal::from_str(&value.to_string())
        .map(|d| d.round_dp(dp))
        .map_err(|e| Error::persistence(format!("bad decimal {}: {}", value, e)))
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::persistence(format!("bad id '{}': {}", raw, e)))
}

fn migrate_v0(value: JsonValue) -> Result<Vec<Account>> {
    let legacy: Vec<LegacyAccount> = serde_json::from_value(value)?;
    legacy.into_iter().map(migrate_account).collect()
}

fn migrate_account(legacy: LegacyAccount) -> Result<Account> {
    // Stored either as a fraction or as a whole percentage
    let mut savings_rate = decimal_from_f64(legacy.savings_percentage, 4)?;
    if savings_rate > Decimal::ONE {
        savings_rate /= Decimal::ONE_HUNDRED;
    }
    let savings_rate = savings_rate.clamp(Decimal::ZERO, Decimal::ONE);

    let settings = AccountSettings {
        tithing_enabled: legacy.is_tithing_enabled,
        savings_enabled: legacy.is_savings_enabled,
        savings_rate,
    };

    // Old data is taken as-is; it may predate the current bounds
    let mut account = Account::restore(
        parse_id(&legacy.id)?,
        legacy.name,
        legacy.birth_year,
        settings,
    );

    for tx in legacy.transactions {
        let amount = decimal_from_f64(tx.amount, 2)?.abs();
        // Zero entries carry no value and are not representable any more
        if amount.is_zero() {
            continue;
        }
        account.push_transaction(Transaction::with_timestamp(
            parse_id(&tx.id)?,
            tx.kind.into(),
            amount,
            tx.note,
            tx.date.to_utc()?,
        ));
    }
    Ok(account)
}
