//! Account balance calculations.
//!
//! - Asset/Expense: balance += debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance += credit - debit (credit-normal)
//!
//! Stored balances are a cache of posted lines; [`replay`] rebuilds a
//! balance from lines and [`BalanceCheck`] compares the two.

use std::collections::BTreeMap;

use erp_ledger_shared::types::{AccountId, Money};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::{AccountType, LineInput, NormalBalance};

impl NormalBalance {
    /// Signed balance change for a debit/credit pair.
    #[must_use]
    pub fn delta(self, debit: Money, credit: Money) -> Money {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Debit and credit posted to one account by one or more lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineTotals {
    /// Sum of debits.
    pub debit: Money,
    /// Sum of credits.
    pub credit: Money,
}

impl LineTotals {
    /// Balance change for an account of the given type.
    #[must_use]
    pub fn delta_for(&self, account_type: AccountType) -> Money {
        account_type.normal_balance().delta(self.debit, self.credit)
    }
}

/// Aggregates lines per account, in ascending account id order.
///
/// The ordering is the lock order used when applying balances, so two
/// transactions touching the same accounts never wait on each other in a
/// cycle.
///
/// # Errors
///
/// Returns `LedgerError::BalanceOverflow` if a per-account sum overflows.
pub fn aggregate_by_account(
    lines: &[LineInput],
) -> Result<BTreeMap<AccountId, LineTotals>, LedgerError> {
    let mut totals: BTreeMap<AccountId, LineTotals> = BTreeMap::new();
    for line in lines {
        let entry = totals.entry(line.account_id).or_default();
        entry.debit = entry
            .debit
            .checked_add(line.debit)
            .ok_or(LedgerError::BalanceOverflow(line.account_id))?;
        entry.credit = entry
            .credit
            .checked_add(line.credit)
            .ok_or(LedgerError::BalanceOverflow(line.account_id))?;
    }
    Ok(totals)
}

/// Replays debit/credit pairs into a balance for the given account type.
#[must_use]
pub fn replay<I>(account_type: AccountType, lines: I) -> Money
where
    I: IntoIterator<Item = (Money, Money)>,
{
    let side = account_type.normal_balance();
    lines
        .into_iter()
        .map(|(debit, credit)| side.delta(debit, credit))
        .sum()
}

/// Stored versus recomputed balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    /// The account.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Balance column value.
    pub stored: Money,
    /// Balance replayed from posted lines.
    pub recomputed: Money,
}

impl BalanceCheck {
    /// Returns true if stored equals recomputed.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stored == self.recomputed
    }

    /// Stored minus recomputed.
    #[must_use]
    pub fn drift(&self) -> Money {
        self.stored - self.recomputed
    }
}

/// One non-header account in the trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// The account.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Debit column (balances on the debit side).
    pub debit: Money,
    /// Credit column (balances on the credit side).
    pub credit: Money,
}

impl TrialBalanceRow {
    /// Places a stored balance in the debit or credit column.
    ///
    /// A negative balance shows on the opposite side.
    #[must_use]
    pub fn from_balance(
        account_id: AccountId,
        code: String,
        name: String,
        account_type: AccountType,
        balance: Money,
    ) -> Self {
        let (debit, credit) = match (account_type.normal_balance(), balance.is_negative()) {
            (NormalBalance::Debit, false) | (NormalBalance::Credit, true) => {
                (balance.abs(), Money::ZERO)
            }
            (NormalBalance::Credit, false) | (NormalBalance::Debit, true) => {
                (Money::ZERO, balance.abs())
            }
        };
        Self {
            account_id,
            code,
            name,
            account_type,
            debit,
            credit,
        }
    }
}

/// Trial balance over all non-header accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of the debit column.
    pub total_debit: Money,
    /// Sum of the credit column.
    pub total_credit: Money,
}

impl TrialBalance {
    /// Builds the totals from rows.
    #[must_use]
    pub fn from_rows(rows: Vec<TrialBalanceRow>) -> Self {
        let total_debit = rows.iter().map(|r| r.debit).sum();
        let total_credit = rows.iter().map(|r| r.credit).sum();
        Self {
            rows,
            total_debit,
            total_credit,
        }
    }

    /// Returns true if the debit and credit columns agree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn test_delta_by_normal_side() {
        assert_eq!(AccountType::Asset.normal_balance().delta(money(100), money(30)), money(70));
        assert_eq!(AccountType::Revenue.normal_balance().delta(money(100), money(30)), money(-70));
        assert_eq!(AccountType::Liability.normal_balance().delta(Money::ZERO, money(50)), money(50));
    }

    #[test]
    fn test_aggregate_orders_accounts_and_sums() {
        let a = AccountId::new();
        let b = AccountId::new();
        let lines = vec![
            LineInput::debit(b, money(100)),
            LineInput::credit(a, money(40)),
            LineInput::credit(a, money(60)),
        ];
        let totals = aggregate_by_account(&lines).unwrap();
        let keys: Vec<_> = totals.keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(totals[&a].credit, money(100));
        assert_eq!(totals[&b].debit, money(100));
        assert_eq!(totals[&a].delta_for(AccountType::Revenue), money(100));
    }

    #[test]
    fn test_aggregate_overflow() {
        let a = AccountId::new();
        let lines = vec![
            LineInput::debit(a, Money::from_minor(i64::MAX)),
            LineInput::debit(a, money(1)),
        ];
        assert!(matches!(
            aggregate_by_account(&lines),
            Err(LedgerError::BalanceOverflow(id)) if id == a
        ));
    }

    #[test]
    fn test_replay() {
        let lines = [(money(1_000), Money::ZERO), (Money::ZERO, money(300))];
        assert_eq!(replay(AccountType::Asset, lines), money(700));
        assert_eq!(replay(AccountType::Equity, lines), money(-700));
        assert_eq!(replay(AccountType::Expense, []), Money::ZERO);
    }

    #[test]
    fn test_balance_check() {
        let check = BalanceCheck {
            account_id: AccountId::new(),
            code: "1101".into(),
            stored: money(500),
            recomputed: money(450),
        };
        assert!(!check.is_consistent());
        assert_eq!(check.drift(), money(50));
    }

    #[test]
    fn test_trial_balance_columns() {
        let rows = vec![
            TrialBalanceRow::from_balance(AccountId::new(), "1101".into(), "Cash".into(), AccountType::Asset, money(700)),
            TrialBalanceRow::from_balance(AccountId::new(), "3201".into(), "RE".into(), AccountType::Equity, money(700)),
            TrialBalanceRow::from_balance(AccountId::new(), "1102".into(), "Bank".into(), AccountType::Asset, money(-50)),
            TrialBalanceRow::from_balance(AccountId::new(), "2101".into(), "AP".into(), AccountType::Liability, money(-50)),
        ];
        assert_eq!(rows[2].credit, money(50));
        assert_eq!(rows[3].debit, money(50));

        let tb = TrialBalance::from_rows(rows);
        assert_eq!(tb.total_debit, money(750));
        assert_eq!(tb.total_credit, money(750));
        assert!(tb.is_balanced());
    }
}
