//! Derived balance computation
//!
//! Balances are never patched incrementally. Every structural change to an
//! account's log re-runs [`LedgerTotals::from_transactions`] followed by
//! [`DerivedBalances::compute`], which is a pure function of the log and the
//! rates passed in. Summation is commutative, so log order never matters.
//!
//! All arithmetic is checked: a log whose totals leave the `Decimal` range
//! yields `None` instead of a result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{Transaction, TransactionKind};

/// Cumulative per-kind totals over a transaction log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    pub tithing_paid: Decimal,
    pub savings_paid: Decimal,
}

impl LedgerTotals {
    /// Single linear pass over the log; `None` on overflow
    pub fn from_transactions<'a, I>(transactions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals = Self::default();
        for tx in transactions {
            let slot = match tx.kind() {
                TransactionKind::Deposit => &mut totals.deposits,
                TransactionKind::Withdrawal => &mut totals.withdrawals,
                TransactionKind::TithingPayment => &mut totals.tithing_paid,
                TransactionKind::SavingsWithdrawal => &mut totals.savings_paid,
            };
            *slot = slot.checked_add(tx.amount())?;
        }
        Some(totals)
    }
}

/// Balances derived from [`LedgerTotals`] and the account's effective rates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedBalances {
    pub balance: Decimal,
    pub tithing_due: Decimal,
    pub savings_due: Decimal,
}

impl DerivedBalances {
    /// Rates apply to all-time cumulative deposits, so a rate change is
    /// retroactive for anything not yet paid out.
    ///
    /// Returns `None` when the balance or the net balance would leave the
    /// `Decimal` range, so [`Self::net_balance`] is always representable for
    /// computed values.
    pub fn compute(
        totals: &LedgerTotals,
        tithing_rate: Decimal,
        savings_rate: Decimal,
    ) -> Option<Self> {
        let balance = totals
            .deposits
            .checked_sub(totals.withdrawals)?
            .checked_sub(totals.tithing_paid)?
            .checked_sub(totals.savings_paid)?;
        let tithing_due = due(tithing_rate, totals.deposits, totals.tithing_paid)?;
        let savings_due = due(savings_rate, totals.deposits, totals.savings_paid)?;
        balance.checked_sub(tithing_due)?.checked_sub(savings_due)?;

        Some(Self {
            balance,
            tithing_due,
            savings_due,
        })
    }

    /// Display-only value: what is left after outstanding dues
    pub fn net_balance(&self) -> Decimal {
        self.balance
            .saturating_sub(self.tithing_due)
            .saturating_sub(self.savings_due)
    }
}

fn due(rate: Decimal, deposits: Decimal, paid: Decimal) -> Option<Decimal> {
    Some(rate.checked_mul(deposits)?.checked_sub(paid)?.max(Decimal::ZERO))
}
