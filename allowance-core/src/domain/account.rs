//! Account domain model

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::balance::{DerivedBalances, LedgerTotals};
use super::result::{Error, Result};
use super::transaction::Transaction;

/// Earliest birth year accepted for a dependent
pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Account-level options exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub tithing_enabled: bool,
    pub savings_enabled: bool,
    /// Fraction of deposits set aside for savings, in `[0, 1]`
    pub savings_rate: Decimal,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            tithing_enabled: true,
            savings_enabled: false,
            savings_rate: Decimal::ZERO,
        }
    }
}

/// Partial settings change; `None` leaves the field as it is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub birth_year: Option<i32>,
    pub tithing_enabled: Option<bool>,
    pub savings_enabled: Option<bool>,
    pub savings_rate: Option<Decimal>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.birth_year.is_none()
            && self.tithing_enabled.is_none()
            && self.savings_enabled.is_none()
            && self.savings_rate.is_none()
    }
}

/// One dependent's ledger: settings, transaction log and derived balances
///
/// Fields are only writable inside the crate. All changes go through
/// [`crate::services::LedgerStore`], which re-derives balances after each one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    id: Uuid,
    name: String,
    birth_year: i32,
    #[serde(default)]
    transactions: Vec<Transaction>,
    tithing_enabled: bool,
    savings_enabled: bool,
    savings_rate: Decimal,

    // Derived; persisted for readers of the blob, always recomputed on load
    #[serde(default)]
    balance: Decimal,
    #[serde(default)]
    tithing_due: Decimal,
    #[serde(default)]
    savings_due: Decimal,
}

impl Account {
    /// Fixed share of deposits accrued as tithing
    pub const TITHING_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

    /// Create an empty account after validating every input
    pub fn new(name: impl Into<String>, birth_year: i32, settings: AccountSettings) -> Result<Self> {
        Self::with_id(Uuid::new_v4(), name, birth_year, settings)
    }

    /// Same as [`Account::new`] with a caller-supplied id
    pub fn with_id(
        id: Uuid,
        name: impl Into<String>,
        birth_year: i32,
        settings: AccountSettings,
    ) -> Result<Self> {
        let name = Self::normalize_name(&name.into())?;
        Self::validate_birth_year(birth_year)?;
        Self::validate_savings_rate(settings.savings_rate)?;

        Ok(Self {
            id,
            name,
            birth_year,
            transactions: Vec::new(),
            tithing_enabled: settings.tithing_enabled,
            savings_enabled: settings.savings_enabled,
            savings_rate: settings.savings_rate,
            balance: Decimal::ZERO,
            tithing_due: Decimal::ZERO,
            savings_due: Decimal::ZERO,
        })
    }

    /// Rebuild an account from stored data without validating it
    pub(crate) fn restore(
        id: Uuid,
        name: String,
        birth_year: i32,
        settings: AccountSettings,
    ) -> Self {
        Self {
            id,
            name,
            birth_year,
            transactions: Vec::new(),
            tithing_enabled: settings.tithing_enabled,
            savings_enabled: settings.savings_enabled,
            savings_rate: settings.savings_rate,
            balance: Decimal::ZERO,
            tithing_due: Decimal::ZERO,
            savings_due: Decimal::ZERO,
        }
    }

    /// Trim the display name and reject blank ones
    pub fn normalize_name(name: &str) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("account name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    pub fn validate_birth_year(birth_year: i32) -> Result<()> {
        let current = current_year();
        if !(MIN_BIRTH_YEAR..=current).contains(&birth_year) {
            return Err(Error::validation(format!(
                "birth year must be between {} and {} (got {})",
                MIN_BIRTH_YEAR, current, birth_year
            )));
        }
        Ok(())
    }

    pub fn validate_savings_rate(rate: Decimal) -> Result<()> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(Error::validation(format!(
                "savings rate must be between 0 and 1 (got {})",
                rate
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn birth_year(&self) -> i32 {
        self.birth_year
    }

    /// Age in whole years as of `current_year`
    pub fn age(&self, current_year: i32) -> i32 {
        current_year - self.birth_year
    }

    /// Transactions in insertion order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id() == id)
    }

    /// Newest first; equal timestamps keep insertion order
    pub fn sorted_transactions(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.transactions.iter().collect();
        sorted.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        sorted
    }

    pub fn recent_transactions(&self, limit: usize) -> Vec<&Transaction> {
        let mut sorted = self.sorted_transactions();
        sorted.truncate(limit);
        sorted
    }

    pub fn settings(&self) -> AccountSettings {
        AccountSettings {
            tithing_enabled: self.tithing_enabled,
            savings_enabled: self.savings_enabled,
            savings_rate: self.savings_rate,
        }
    }

    pub fn tithing_rate(&self) -> Decimal {
        Self::TITHING_RATE
    }

    /// Tithing rate as applied by recomputation (zero while disabled)
    pub fn effective_tithing_rate(&self) -> Decimal {
        if self.tithing_enabled {
            Self::TITHING_RATE
        } else {
            Decimal::ZERO
        }
    }

    /// Savings rate as applied by recomputation (zero while disabled)
    pub fn effective_savings_rate(&self) -> Decimal {
        if self.savings_enabled {
            self.savings_rate
        } else {
            Decimal::ZERO
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn tithing_due(&self) -> Decimal {
        self.tithing_due
    }

    pub fn savings_due(&self) -> Decimal {
        self.savings_due
    }

    /// Balance minus outstanding tithing and savings; not persisted
    pub fn net_balance(&self) -> Decimal {
        self.derived().net_balance()
    }

    pub fn derived(&self) -> DerivedBalances {
        DerivedBalances {
            balance: self.balance,
            tithing_due: self.tithing_due,
            savings_due: self.savings_due,
        }
    }

    // =========================================================================
    // Crate-internal mutation (callers must recompute afterwards)
    // =========================================================================

    /// Re-derive balances from the full log
    ///
    /// Fails with [`Error::Validation`] when the totals leave the `Decimal`
    /// range; the account is left as it was.
    pub(crate) fn recompute(&mut self) -> Result<()> {
        let derived = LedgerTotals::from_transactions(&self.transactions)
            .and_then(|totals| {
                DerivedBalances::compute(
                    &totals,
                    self.effective_tithing_rate(),
                    self.effective_savings_rate(),
                )
            })
            .ok_or_else(|| Error::validation("amounts exceed the supported range"))?;
        self.balance = derived.balance;
        self.tithing_due = derived.tithing_due;
        self.savings_due = derived.savings_due;
        Ok(())
    }

    /// Apply `change` to a copy and recompute it; `self` is untouched on error
    pub(crate) fn with_change<F>(&self, change: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let mut candidate = self.clone();
        change(&mut candidate)?;
        candidate.recompute()?;
        Ok(candidate)
    }

    pub(crate) fn push_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Swap an entry in place so its position in the log is kept
    pub(crate) fn replace_transaction(&mut self, tx: Transaction) -> bool {
        match self.transactions.iter_mut().find(|t| t.id() == tx.id()) {
            Some(slot) => {
                *slot = tx;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_transaction(&mut self, id: Uuid) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id() != id);
        self.transactions.len() != before
    }

    /// Validate every field of the update first, then apply all of it
    pub(crate) fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        if let Some(year) = update.birth_year {
            Self::validate_birth_year(year)?;
        }
        if let Some(rate) = update.savings_rate {
            Self::validate_savings_rate(rate)?;
        }

        if let Some(year) = update.birth_year {
            self.birth_year = year;
        }
        if let Some(enabled) = update.tithing_enabled {
            self.tithing_enabled = enabled;
        }
        if let Some(enabled) = update.savings_enabled {
            self.savings_enabled = enabled;
        }
        if let Some(rate) = update.savings_rate {
            self.savings_rate = rate;
        }
        Ok(())
    }

    /// Restore a decoded account: drop duplicate transaction ids (first wins)
    /// and re-derive balances so stored values can never drift.
    ///
    /// Data that breaks an invariant enforced on the write path (non-positive
    /// amount, savings rate outside `[0, 1]`, totals out of range) is rejected
    /// with [`Error::Persistence`].
    pub(crate) fn normalized(mut self) -> Result<Self> {
        let id = self.id;
        let corrupt = |e: Error| Error::persistence(format!("account {}: {}", id, e));

        Self::validate_savings_rate(self.savings_rate).map_err(corrupt)?;
        for tx in &self.transactions {
            Transaction::validate_amount(tx.amount()).map_err(corrupt)?;
        }

        let mut seen = std::collections::HashSet::new();
        self.transactions.retain(|t| seen.insert(t.id()));
        self.recompute().map_err(corrupt)?;
        Ok(self)
    }
}

/// Calendar year in UTC
pub fn current_year() -> i32 {
    Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionKind;
    use rust_decimal_macros::dec;

    fn tithing_account() -> Account {
        Account::new("Alice", 2015, AccountSettings::default()).unwrap()
    }

    #[test]
    fn test_account_validation() {
        assert!(Account::new("  ", 2015, AccountSettings::default()).is_err());
        assert!(Account::new("Bob", 1850, AccountSettings::default()).is_err());
        assert!(Account::new("Bob", current_year() + 1, AccountSettings::default()).is_err());

        let bad_rate = AccountSettings {
            savings_rate: dec!(1.5),
            ..AccountSettings::default()
        };
        assert!(Account::new("Bob", 2015, bad_rate).is_err());

        let account = Account::new("  Bob ", 2015, AccountSettings::default()).unwrap();
        assert_eq!(account.name(), "Bob");
        assert_eq!(account.balance(), Decimal::ZERO);
        assert!(account.transactions().is_empty());
    }

    #[test]
    fn test_age() {
        let account = tithing_account();
        assert_eq!(account.age(2026), 11);
    }

    #[test]
    fn test_disabled_tithing_has_zero_rate() {
        let mut account = Account::new(
            "Sam",
            2017,
            AccountSettings {
                tithing_enabled: false,
                ..AccountSettings::default()
            },
        )
        .unwrap();
        account.push_transaction(Transaction::new(TransactionKind::Deposit, dec!(100), ""));
        account.recompute().unwrap();

        assert_eq!(account.tithing_rate(), dec!(0.10));
        assert_eq!(account.effective_tithing_rate(), Decimal::ZERO);
        assert_eq!(account.tithing_due(), Decimal::ZERO);
        assert_eq!(account.net_balance(), dec!(100));
    }

    #[test]
    fn test_sorted_transactions_newest_first() {
        use chrono::{Duration, TimeZone};

        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut account = tithing_account();
        let first = Transaction::with_timestamp(
            Uuid::new_v4(), TransactionKind::Deposit, dec!(1), "First", base,
        );
        let tie = Transaction::with_timestamp(
            Uuid::new_v4(), TransactionKind::Deposit, dec!(2), "Tie", base,
        );
        let last = Transaction::with_timestamp(
            Uuid::new_v4(),
            TransactionKind::Withdrawal,
            dec!(1),
            "Last",
            base + Duration::minutes(5),
        );
        account.push_transaction(first);
        account.push_transaction(tie);
        account.push_transaction(last);

        let notes: Vec<&str> = account.sorted_transactions().iter().map(|t| t.note()).collect();
        assert_eq!(notes, vec!["Last", "First", "Tie"]);

        let recent: Vec<&str> = account.recent_transactions(2).iter().map(|t| t.note()).collect();
        assert_eq!(recent, vec!["Last", "First"]);
    }

    #[test]
    fn test_apply_settings_is_all_or_nothing() {
        let mut account = tithing_account();
        let update = SettingsUpdate {
            savings_enabled: Some(true),
            savings_rate: Some(dec!(2)),
            ..SettingsUpdate::default()
        };
        assert!(account.apply_settings(&update).is_err());
        assert!(!account.settings().savings_enabled);
    }

    #[test]
    fn test_normalized_drops_duplicate_ids() {
        let mut account = tithing_account();
        let tx = Transaction::new(TransactionKind::Deposit, dec!(10), "");
        account.push_transaction(tx.clone());
        account.push_transaction(tx);

        let account = account.normalized().unwrap();
        assert_eq!(account.transactions().len(), 1);
        assert_eq!(account.balance(), dec!(10));
        assert_eq!(account.tithing_due(), dec!(1));
    }

    #[test]
    fn test_with_change_leaves_original_on_overflow() {
        let mut account = tithing_account();
        account.push_transaction(Transaction::new(TransactionKind::Deposit, Decimal::MAX, ""));
        account.recompute().unwrap();

        let err = account
            .with_change(|a| {
                a.push_transaction(Transaction::new(TransactionKind::Deposit, Decimal::MAX, ""));
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(account.transactions().len(), 1);
        assert_eq!(account.balance(), Decimal::MAX);
    }

    #[test]
    fn test_normalized_rejects_out_of_range_data() {
        let mut negative = tithing_account();
        negative.push_transaction(Transaction::new(TransactionKind::Deposit, dec!(-50), ""));
        assert!(matches!(negative.normalized(), Err(Error::Persistence(_))));

        let mut rate = tithing_account();
        rate.savings_rate = dec!(5);
        assert!(matches!(rate.normalized(), Err(Error::Persistence(_))));

        let mut overflow = tithing_account();
        overflow.push_transaction(Transaction::new(TransactionKind::Deposit, Decimal::MAX, ""));
        overflow.push_transaction(Transaction::new(TransactionKind::Deposit, Decimal::MAX, ""));
        assert!(matches!(overflow.normalized(), Err(Error::Persistence(_))));
    }
}
