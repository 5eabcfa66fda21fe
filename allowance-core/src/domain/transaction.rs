//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// What a ledger entry does to an account
///
/// Amounts are always stored positive; the kind carries the sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TithingPayment,
    SavingsWithdrawal,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 4] = [
        TransactionKind::Deposit,
        TransactionKind::Withdrawal,
        TransactionKind::TithingPayment,
        TransactionKind::SavingsWithdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::TithingPayment => "tithingPayment",
            TransactionKind::SavingsWithdrawal => "savingsWithdrawal",
        }
    }

    /// True if the entry adds money to the balance
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Deposit)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    /// Accepts the wire names as well as kebab/snake case spellings
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdrawal" => Ok(TransactionKind::Withdrawal),
            "tithingpayment" | "tithing" => Ok(TransactionKind::TithingPayment),
            "savingswithdrawal" | "savings" => Ok(TransactionKind::SavingsWithdrawal),
            _ => Err(Error::validation(format!("unknown transaction kind '{}'", s))),
        }
    }
}

/// A single immutable ledger entry belonging to an account
///
/// Transactions are never changed in place. An edit produces a new value via
/// [`Transaction::replaced`] that keeps the original id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: Uuid,
    kind: TransactionKind,
    amount: Decimal,
    note: String,
    timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction stamped with the current time
    pub fn new(kind: TransactionKind, amount: Decimal, note: impl Into<String>) -> Self {
        Self::with_timestamp(Uuid::new_v4(), kind, amount, note, Utc::now())
    }

    /// Create a transaction with every field supplied (migration, tests)
    pub fn with_timestamp(
        id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        note: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            amount,
            note: note.into(),
            timestamp,
        }
    }

    /// Build the replacement for this entry, keeping its id and timestamp
    pub fn replaced(&self, kind: TransactionKind, amount: Decimal, note: impl Into<String>) -> Self {
        Self::with_timestamp(self.id, kind, amount, note, self.timestamp)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Amount with the sign implied by the kind
    pub fn signed_amount(&self) -> Decimal {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Reject zero and negative amounts
    pub fn validate_amount(amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::validation(format!(
                "amount must be greater than zero (got {})",
                amount
            )));
        }
        Ok(())
    }
}
