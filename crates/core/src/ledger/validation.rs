//! Business rule validation for journal entries.
//!
//! Validation is split into a shape check that needs no database
//! ([`validate_lines`]) and an account check run against snapshots the
//! caller loaded inside its transaction ([`validate_accounts`]).

use std::collections::HashMap;

use erp_ledger_shared::types::{AccountId, Money};

use super::error::LedgerError;
use super::types::{AccountSnapshot, DraftInput, EntryTotals, LineInput};

/// Minimum number of lines in a journal entry.
pub const MIN_LINES: usize = 2;

/// Maximum description length accepted on headers and lines.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Validates line shape and balance. Returns the totals on success.
///
/// Rules, checked per line in order:
/// - amounts are never negative
/// - exactly one of debit/credit is non-zero
///
/// then for the whole entry:
/// - at least two lines
/// - total debit equals total credit in minor units
///
/// # Errors
///
/// Returns `LedgerError::Validation` naming the first offending line, or
/// `LedgerError::Unbalanced` with the imbalance.
pub fn validate_lines(lines: &[LineInput]) -> Result<EntryTotals, LedgerError> {
    if lines.len() < MIN_LINES {
        return Err(LedgerError::invalid(format!(
            "a journal entry needs at least {MIN_LINES} lines, got {}",
            lines.len()
        )));
    }

    let mut debit = Money::ZERO;
    let mut credit = Money::ZERO;

    for (idx, line) in lines.iter().enumerate() {
        if line.debit.is_negative() || line.credit.is_negative() {
            return Err(LedgerError::line(idx, "amounts cannot be negative"));
        }

        match (line.debit.is_zero(), line.credit.is_zero()) {
            (true, true) => return Err(LedgerError::line(idx, "line amount cannot be zero")),
            (false, false) => {
                return Err(LedgerError::line(
                    idx,
                    "line must have either a debit or a credit, not both",
                ));
            }
            _ => {}
        }

        if line
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
        {
            return Err(LedgerError::line(idx, "description is too long"));
        }

        debit = debit
            .checked_add(line.debit)
            .ok_or_else(|| LedgerError::line(idx, "debit total overflows"))?;
        credit = credit
            .checked_add(line.credit)
            .ok_or_else(|| LedgerError::line(idx, "credit total overflows"))?;
    }

    let totals = EntryTotals::new(debit, credit);
    if !totals.is_balanced() {
        return Err(LedgerError::Unbalanced {
            debit,
            credit,
            imbalance: totals.imbalance(),
        });
    }

    Ok(totals)
}

/// Validates a draft header and its lines.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_draft(input: &DraftInput) -> Result<EntryTotals, LedgerError> {
    if input.description.trim().is_empty() {
        return Err(LedgerError::invalid("description is required"));
    }
    if input.description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(LedgerError::invalid("description is too long"));
    }
    if let Some(reference) = &input.reference {
        if reference.reference_type.trim().is_empty() || reference.reference_id.trim().is_empty() {
            return Err(LedgerError::invalid(
                "reference type and id must both be present",
            ));
        }
    }

    validate_lines(&input.lines)
}

/// Checks every line's account exists, is not a header and is active.
///
/// `accounts` holds the snapshots loaded for the entry's account ids.
///
/// # Errors
///
/// Returns `LedgerError::Validation` naming the first offending line.
pub fn validate_accounts(
    lines: &[LineInput],
    accounts: &HashMap<AccountId, AccountSnapshot>,
) -> Result<(), LedgerError> {
    for (idx, line) in lines.iter().enumerate() {
        let Some(account) = accounts.get(&line.account_id) else {
            return Err(LedgerError::line(
                idx,
                format!("account {} not found", line.account_id),
            ));
        };

        if account.is_header {
            return Err(LedgerError::line(
                idx,
                format!("account {} is a header account", account.code),
            ));
        }

        if !account.is_active {
            return Err(LedgerError::line(
                idx,
                format!("account {} is inactive", account.code),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::AccountType;
    use chrono::NaiveDate;

    fn money(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    fn snapshot(code: &str, is_header: bool, is_active: bool) -> AccountSnapshot {
        AccountSnapshot {
            id: AccountId::new(),
            code: code.to_string(),
            account_type: AccountType::Asset,
            is_header,
            is_active,
        }
    }

    #[test]
    fn test_balanced_lines() {
        let lines = vec![
            LineInput::debit(AccountId::new(), money(10_000)),
            LineInput::credit(AccountId::new(), money(10_000)),
        ];
        let totals = validate_lines(&lines).unwrap();
        assert_eq!(totals.debit, money(10_000));
        assert!(totals.is_balanced());
    }

    #[test]
    fn test_unbalanced_lines_report_imbalance() {
        let lines = vec![
            LineInput::debit(AccountId::new(), money(10_000)),
            LineInput::credit(AccountId::new(), money(9_999)),
        ];
        match validate_lines(&lines) {
            Err(LedgerError::Unbalanced { imbalance, .. }) => assert_eq!(imbalance, money(1)),
            other => panic!("expected Unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn test_single_line_rejected() {
        let lines = vec![LineInput::debit(AccountId::new(), money(100))];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::Validation { line: None, .. })
        ));
    }

    #[test]
    fn test_offending_line_index_is_reported() {
        let mut both = LineInput::debit(AccountId::new(), money(100));
        both.credit = money(100);
        let lines = vec![
            LineInput::debit(AccountId::new(), money(100)),
            LineInput::credit(AccountId::new(), money(100)),
            both,
        ];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::Validation { line: Some(2), .. })
        ));
    }

    #[test]
    fn test_zero_line_rejected() {
        let lines = vec![
            LineInput::debit(AccountId::new(), Money::ZERO),
            LineInput::credit(AccountId::new(), money(100)),
        ];
        assert!(matches!(
            validate_lines(&lines),
            Err(LedgerError::Validation { line: Some(0), .. })
        ));
    }

    #[test]
    fn test_blank_description_rejected() {
        let input = DraftInput::manual(
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            "   ",
            vec![
                LineInput::debit(AccountId::new(), money(100)),
                LineInput::credit(AccountId::new(), money(100)),
            ],
        );
        assert!(validate_draft(&input).is_err());
    }

    #[test]
    fn test_header_account_rejected() {
        let cash = snapshot("1101", false, true);
        let header = snapshot("1000", true, true);
        let lines = vec![
            LineInput::debit(cash.id, money(100)),
            LineInput::credit(header.id, money(100)),
        ];
        let accounts = HashMap::from([(cash.id, cash), (header.id, header)]);

        let err = validate_accounts(&lines, &accounts).unwrap_err();
        assert_eq!(err.to_string(), "Line 1: account 1000 is a header account");
    }

    #[test]
    fn test_inactive_and_missing_accounts_rejected() {
        let inactive = snapshot("1102", false, false);
        let lines = vec![
            LineInput::debit(inactive.id, money(100)),
            LineInput::credit(AccountId::new(), money(100)),
        ];
        let accounts = HashMap::from([(inactive.id, inactive.clone())]);
        assert!(matches!(
            validate_accounts(&lines, &accounts),
            Err(LedgerError::Validation { line: Some(0), .. })
        ));

        let mut active = inactive;
        active.is_active = true;
        let accounts = HashMap::from([(active.id, active)]);
        assert!(matches!(
            validate_accounts(&lines, &accounts),
            Err(LedgerError::Validation { line: Some(1), .. })
        ));
    }
}
