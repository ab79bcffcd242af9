//! Period closing plan.
//!
//! Closing zeroes every revenue and expense account into retained earnings
//! with a single balanced entry. The plan is pure; the caller replays the
//! balances as of the period end and posts the resulting lines.

use erp_ledger_shared::types::{AccountId, Money};
use serde::{Deserialize, Serialize};

use crate::ledger::{AccountType, LedgerError, LineInput, validate_lines};

/// A temporary account's balance at period end, in its normal sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingBalance {
    /// The account.
    pub account_id: AccountId,
    /// Account code, used in line descriptions.
    pub code: String,
    /// Revenue or Expense.
    pub account_type: AccountType,
    /// Replayed balance.
    pub balance: Money,
}

/// Lines and snapshots produced by closing a period.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClosingPlan {
    /// Closing entry lines. Empty when there is nothing to close.
    pub lines: Vec<LineInput>,
    /// Sum of revenue balances.
    pub total_revenue: Money,
    /// Sum of expense balances.
    pub total_expense: Money,
    /// Revenue minus expense.
    pub net_income: Money,
    /// Number of revenue/expense accounts zeroed.
    pub accounts_closed: usize,
}

impl ClosingPlan {
    /// True if no closing entry is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Header description of the closing entry.
#[must_use]
pub fn closing_description(period_name: &str) -> String {
    format!("Closing entry for period {period_name}")
}

/// Builds the closing entry for the given temporary balances.
///
/// - Revenue with a positive balance is debited, expense credited; negative
///   balances flip sides. Zero balances produce no line.
/// - Net income goes to retained earnings: credited when positive, debited
///   when negative, omitted when zero.
///
/// # Errors
///
/// Returns `LedgerError::Internal` if a non-temporary account is passed,
/// and any validation error from the defensive balance check.
pub fn build_closing_plan(
    balances: &[ClosingBalance],
    retained_earnings: AccountId,
) -> Result<ClosingPlan, LedgerError> {
    let mut plan = ClosingPlan::default();

    for item in balances {
        if !item.account_type.is_temporary() {
            return Err(LedgerError::Internal(format!(
                "account {} ({}) cannot be closed into retained earnings",
                item.code, item.account_type
            )));
        }
        if item.balance.is_zero() {
            continue;
        }

        let amount = item.balance.abs();
        let zeroing_debit = match item.account_type {
            AccountType::Revenue => {
                plan.total_revenue += item.balance;
                item.balance.is_positive()
            }
            _ => {
                plan.total_expense += item.balance;
                item.balance.is_negative()
            }
        };

        let line = if zeroing_debit {
            LineInput::debit(item.account_id, amount)
        } else {
            LineInput::credit(item.account_id, amount)
        };
        plan.lines.push(line.with_description(format!(
            "Close {} {}",
            item.account_type.as_str().to_lowercase(),
            item.code
        )));
        plan.accounts_closed += 1;
    }

    plan.net_income = plan.total_revenue - plan.total_expense;

    if plan.net_income.is_positive() {
        plan.lines.push(
            LineInput::credit(retained_earnings, plan.net_income)
                .with_description("Net income to retained earnings"),
        );
    } else if plan.net_income.is_negative() {
        plan.lines.push(
            LineInput::debit(retained_earnings, plan.net_income.abs())
                .with_description("Net loss to retained earnings"),
        );
    }

    if !plan.lines.is_empty() {
        validate_lines(&plan.lines)?;
    }

    Ok(plan)
}

/// What closing a period would do, and whether it can be done now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingPreview {
    /// Period name.
    pub period: String,
    /// Sum of revenue balances at period end.
    pub total_revenue: Money,
    /// Sum of expense balances at period end.
    pub total_expense: Money,
    /// Revenue minus expense.
    pub net_income: Money,
    /// Revenue accounts with a non-zero balance.
    pub revenue_accounts: usize,
    /// Expense accounts with a non-zero balance.
    pub expense_accounts: usize,
    /// True if no blocker was found.
    pub can_close: bool,
    /// Reasons the period cannot be closed yet.
    pub blockers: Vec<String>,
}

impl ClosingPreview {
    /// Builds a preview from replayed balances and blockers found by the caller.
    #[must_use]
    pub fn new(period: String, balances: &[ClosingBalance], blockers: Vec<String>) -> Self {
        let non_zero = |ty: AccountType| {
            balances
                .iter()
                .filter(move |b| b.account_type == ty && !b.balance.is_zero())
        };
        let total_revenue: Money = non_zero(AccountType::Revenue).map(|b| b.balance).sum();
        let total_expense: Money = non_zero(AccountType::Expense).map(|b| b.balance).sum();

        Self {
            period,
            total_revenue,
            total_expense,
            net_income: total_revenue - total_expense,
            revenue_accounts: non_zero(AccountType::Revenue).count(),
            expense_accounts: non_zero(AccountType::Expense).count(),
            can_close: blockers.is_empty(),
            blockers,
        }
    }
}
