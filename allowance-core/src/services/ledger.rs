//! Ledger store - the single owner and writer of account state
//!
//! Every mutation validates its input, changes the transaction log, re-derives
//! the touched account's balances from scratch, and then hands a full snapshot
//! to the attached [`SnapshotPublisher`]. Each change is first applied to a
//! copy of the account, so a failed validation (including totals that would
//! leave the `Decimal` range) returns before anything is changed.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    current_year, Account, AccountSettings, SettingsUpdate, Snapshot, Transaction,
    TransactionKind,
};
use crate::services::sync::{Propagation, SnapshotPublisher};

/// Note attached to settlement transactions
pub const TITHING_PAYMENT_NOTE: &str = "Tithing payment";
pub const SAVINGS_WITHDRAWAL_NOTE: &str = "Savings withdrawal";

/// Buffered change notifications per subscriber
const EVENT_CAPACITY: usize = 256;

/// Change notification sent to subscribers after each committed change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    AccountAdded(Uuid),
    AccountRemoved(Uuid),
    /// Settings or transaction log of the account changed
    AccountChanged(Uuid),
    /// The whole collection was swapped for a peer's snapshot
    Replaced { accounts: usize },
}

/// Aggregate figures across all accounts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub total_accounts: usize,
    pub total_transactions: usize,
    pub total_balance: Decimal,
    pub total_tithing_due: Decimal,
    pub total_savings_due: Decimal,
    pub total_net_balance: Decimal,
    pub accounts: Vec<AccountSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub age: i32,
    pub balance: Decimal,
    pub tithing_due: Decimal,
    pub savings_due: Decimal,
    pub net_balance: Decimal,
    pub transactions: usize,
}

/// In-memory account collection
pub struct LedgerStore {
    accounts: Vec<Account>,
    events: broadcast::Sender<LedgerEvent>,
    publisher: Option<SnapshotPublisher>,
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore {
    /// Empty ledger with no persistence attached
    pub fn new() -> Self {
        Self::from_accounts(Vec::new())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::from_accounts(snapshot.accounts)
    }

    /// Decode a stored blob; missing or unreadable data means empty
    pub fn from_blob(blob: Option<&[u8]>) -> Self {
        match blob.map(Snapshot::decode) {
            None => {
                debug!("No stored snapshot; starting with an empty ledger");
                Self::new()
            }
            Some(Ok(snapshot)) => {
                info!(accounts = snapshot.accounts.len(), "Loaded ledger snapshot");
                Self::from_snapshot(snapshot)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Stored snapshot unreadable; starting with an empty ledger");
                Self::new()
            }
        }
    }

    fn from_accounts(accounts: Vec<Account>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            accounts,
            events,
            publisher: None,
        }
    }

    /// Route post-mutation snapshots to a sync worker
    pub fn attach_publisher(&mut self, publisher: SnapshotPublisher) {
        self.publisher = Some(publisher);
    }

    /// Stream of change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Accounts in insertion order
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    /// Youngest first; equal birth years keep insertion order
    pub fn sorted_accounts(&self) -> Vec<&Account> {
        let mut sorted: Vec<&Account> = self.accounts.iter().collect();
        sorted.sort_by(|a, b| b.birth_year().cmp(&a.birth_year()));
        sorted
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.accounts.clone())
    }

    pub fn summary(&self) -> LedgerSummary {
        let year = current_year();
        let mut summary = LedgerSummary {
            total_accounts: self.accounts.len(),
            ..LedgerSummary::default()
        };

        for account in self.sorted_accounts() {
            summary.total_transactions += account.transactions().len();
            summary.total_balance = summary.total_balance.saturating_add(account.balance());
            summary.total_tithing_due =
                summary.total_tithing_due.saturating_add(account.tithing_due());
            summary.total_savings_due =
                summary.total_savings_due.saturating_add(account.savings_due());
            summary.total_net_balance =
                summary.total_net_balance.saturating_add(account.net_balance());
            summary.accounts.push(AccountSummary {
                id: account.id().to_string(),
                name: account.name().to_string(),
                age: account.age(year),
                balance: account.balance(),
                tithing_due: account.tithing_due(),
                savings_due: account.savings_due(),
                net_balance: account.net_balance(),
                transactions: account.transactions().len(),
            });
        }
        summary
    }

    // =========================================================================
    // Account lifecycle
    // =========================================================================

    pub fn add_account(
        &mut self,
        name: &str,
        birth_year: i32,
        settings: AccountSettings,
    ) -> Result<Account> {
        let account = Account::new(name, birth_year, settings)?;
        let id = account.id();
        self.accounts.push(account.clone());

        info!(account_id = %id, "Account added");
        self.commit(LedgerEvent::AccountAdded(id), Propagation::PersistAndPush);
        Ok(account)
    }

    /// Remove an account and its whole log; unknown ids are ignored
    pub fn remove_account(&mut self, account_id: Uuid) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id() != account_id);
        if self.accounts.len() == before {
            debug!(account_id = %account_id, "Remove skipped: no such account");
            return false;
        }

        info!(account_id = %account_id, "Account removed");
        self.commit(LedgerEvent::AccountRemoved(account_id), Propagation::PersistAndPush);
        true
    }

    /// Change account settings; a new savings rate applies to all past deposits
    pub fn update_account_settings(
        &mut self,
        account_id: Uuid,
        update: SettingsUpdate,
    ) -> Result<Account> {
        let account = self.account_mut(account_id)?;
        *account = account.with_change(|a| a.apply_settings(&update))?;
        let updated = account.clone();

        debug!(account_id = %account_id, "Account settings updated");
        self.commit(LedgerEvent::AccountChanged(account_id), Propagation::PersistAndPush);
        Ok(updated)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    pub fn record_transaction(
        &mut self,
        account_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        note: &str,
    ) -> Result<Transaction> {
        let account = self.account_mut(account_id)?;
        Transaction::validate_amount(amount)?;

        let tx = Transaction::new(kind, amount, note);
        *account = account.with_change(|a| {
            a.push_transaction(tx.clone());
            Ok(())
        })?;

        debug!(account_id = %account_id, transaction_id = %tx.id(), kind = %kind, "Transaction recorded");
        self.commit(LedgerEvent::AccountChanged(account_id), Propagation::PersistAndPush);
        Ok(tx)
    }

    /// Replace a transaction's kind, amount and note; id and timestamp are kept
    pub fn edit_transaction(
        &mut self,
        account_id: Uuid,
        transaction_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        note: &str,
    ) -> Result<Transaction> {
        let account = self.account_mut(account_id)?;
        let existing = account.transaction(transaction_id).ok_or_else(|| {
            Error::not_found(format!(
                "transaction {} in account {}",
                transaction_id, account_id
            ))
        })?;
        Transaction::validate_amount(amount)?;

        let replacement = existing.replaced(kind, amount, note);
        *account = account.with_change(|a| {
            a.replace_transaction(replacement.clone());
            Ok(())
        })?;

        debug!(account_id = %account_id, transaction_id = %transaction_id, "Transaction edited");
        self.commit(LedgerEvent::AccountChanged(account_id), Propagation::PersistAndPush);
        Ok(replacement)
    }

    /// Delete a transaction; unknown ids are ignored and return `Ok(false)`
    ///
    /// Removing a deposit can push the balance below the `Decimal` range, in
    /// which case the delete is refused with a validation error.
    pub fn delete_transaction(&mut self, account_id: Uuid, transaction_id: Uuid) -> Result<bool> {
        let Some(account) = self.accounts.iter_mut().find(|a| a.id() == account_id) else {
            debug!(account_id = %account_id, "Delete skipped: no such account");
            return Ok(false);
        };
        if account.transaction(transaction_id).is_none() {
            debug!(transaction_id = %transaction_id, "Delete skipped: no such transaction");
            return Ok(false);
        }
        *account = account.with_change(|a| {
            a.remove_transaction(transaction_id);
            Ok(())
        })?;

        debug!(account_id = %account_id, transaction_id = %transaction_id, "Transaction deleted");
        self.commit(LedgerEvent::AccountChanged(account_id), Propagation::PersistAndPush);
        Ok(true)
    }

    /// Pay out all outstanding tithing; `None` if nothing was due
    pub fn settle_tithing(&mut self, account_id: Uuid) -> Result<Option<Transaction>> {
        self.settle(account_id, TransactionKind::TithingPayment, TITHING_PAYMENT_NOTE)
    }

    /// Withdraw all outstanding savings; `None` if nothing was due
    pub fn settle_savings(&mut self, account_id: Uuid) -> Result<Option<Transaction>> {
        self.settle(account_id, TransactionKind::SavingsWithdrawal, SAVINGS_WITHDRAWAL_NOTE)
    }

    fn settle(
        &mut self,
        account_id: Uuid,
        kind: TransactionKind,
        note: &str,
    ) -> Result<Option<Transaction>> {
        let account = self.account_mut(account_id)?;
        let due = match kind {
            TransactionKind::TithingPayment => account.tithing_due(),
            TransactionKind::SavingsWithdrawal => account.savings_due(),
            _ => return Err(Error::validation(format!("{} cannot be settled", kind))),
        };
        if due <= Decimal::ZERO {
            return Ok(None);
        }

        let tx = Transaction::new(kind, due, note);
        *account = account.with_change(|a| {
            a.push_transaction(tx.clone());
            Ok(())
        })?;

        info!(account_id = %account_id, kind = %kind, "Settled outstanding due");
        self.commit(LedgerEvent::AccountChanged(account_id), Propagation::PersistAndPush);
        Ok(Some(tx))
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Swap the whole collection for a snapshot from a peer
    ///
    /// Last write wins: local changes not yet seen by the peer are discarded.
    /// The new state is persisted locally but not pushed back out.
    pub fn replace_all(&mut self, snapshot: Snapshot) {
        let count = snapshot.accounts.len();
        self.accounts = snapshot.accounts;

        info!(accounts = count, "Ledger replaced from peer snapshot");
        self.commit(LedgerEvent::Replaced { accounts: count }, Propagation::PersistOnly);
    }

    /// Decode and apply a peer's blob; an unreadable blob leaves state as is
    pub fn apply_remote(&mut self, blob: &[u8]) -> Result<usize> {
        let snapshot = Snapshot::decode(blob).map_err(|e| {
            warn!(error = %e, "Ignoring unreadable peer snapshot");
            e
        })?;
        let count = snapshot.accounts.len();
        self.replace_all(snapshot);
        Ok(count)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn account_mut(&mut self, account_id: Uuid) -> Result<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.id() == account_id)
            .ok_or_else(|| Error::not_found(format!("account {}", account_id)))
    }

    /// Notify subscribers and hand the new snapshot to the sync worker
    fn commit(&self, event: LedgerEvent, propagation: Propagation) {
        // No subscribers is fine
        let _ = self.events.send(event);

        let Some(publisher) = &self.publisher else {
            return;
        };
        match self.snapshot().encode() {
            Ok(blob) => publisher.publish(blob, propagation),
            Err(e) => warn!(error = %e, "Snapshot encoding failed; change kept in memory only"),
        }
    }
}
