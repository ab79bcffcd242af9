//! Property-based tests for journal line validation.

use proptest::prelude::*;
use erp_ledger_shared::types::{AccountId, Money};

use super::error::LedgerError;
use super::types::LineInput;
use super::validation::validate_lines;

/// Strategy to generate a valid positive amount in minor units.
fn positive_amount() -> impl Strategy<Value = Money> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(Money::from_minor)
}

/// Strategy for a vector of positive amounts.
fn amounts(max_len: usize) -> impl Strategy<Value = Vec<Money>> {
    prop::collection::vec(positive_amount(), 1..=max_len)
}

/// Debit lines for `debits` balanced by credit lines splitting the same total.
fn balanced_lines(debits: &[Money], credit_splits: usize) -> Vec<LineInput> {
    let total: Money = debits.iter().sum();
    let mut lines: Vec<LineInput> = debits
        .iter()
        .map(|amount| LineInput::debit(AccountId::new(), *amount))
        .collect();

    let splits = i64::try_from(credit_splits.max(1)).unwrap_or(1);
    let part = total.minor() / splits;
    let mut remaining = total;
    for _ in 1..splits {
        if part > 0 {
            lines.push(LineInput::credit(AccountId::new(), Money::from_minor(part)));
            remaining -= Money::from_minor(part);
        }
    }
    lines.push(LineInput::credit(AccountId::new(), remaining));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any split of equal totals validates and reports those totals.
    #[test]
    fn prop_balanced_lines_accepted(
        debits in amounts(6),
        splits in 1usize..5,
    ) {
        let lines = balanced_lines(&debits, splits);
        let totals = validate_lines(&lines);
        prop_assert!(totals.is_ok(), "balanced lines rejected: {:?}", totals);

        let totals = totals.unwrap();
        let expected: Money = debits.iter().sum();
        prop_assert_eq!(totals.debit, expected);
        prop_assert_eq!(totals.credit, expected);
    }

    /// A one-cent difference is never tolerated.
    #[test]
    fn prop_any_imbalance_rejected(
        debits in amounts(4),
        delta in 1i64..1_000,
    ) {
        let mut lines = balanced_lines(&debits, 1);
        let last = lines.len() - 1;
        lines[last].credit += Money::from_minor(delta);

        match validate_lines(&lines) {
            Err(LedgerError::Unbalanced { imbalance, .. }) => {
                prop_assert_eq!(imbalance, Money::from_minor(-delta));
            }
            other => prop_assert!(false, "expected Unbalanced, got {:?}", other),
        }
    }

    /// A zero line is rejected at its own index.
    #[test]
    fn prop_zero_line_reports_index(
        debits in amounts(4),
        insert_at in 0usize..6,
    ) {
        let mut lines = balanced_lines(&debits, 1);
        let idx = insert_at.min(lines.len());
        lines.insert(idx, LineInput::debit(AccountId::new(), Money::ZERO));

        let result = validate_lines(&lines);
        let at_idx = matches!(result, Err(LedgerError::Validation { line: Some(i), .. }) if i == idx);
        prop_assert!(
            at_idx,
            "expected validation error at line {}, got {:?}",
            idx,
            result
        );
    }

    /// Negative amounts are rejected.
    #[test]
    fn prop_negative_amount_rejected(amount in positive_amount()) {
        let lines = vec![
            LineInput::debit(AccountId::new(), -amount),
            LineInput::credit(AccountId::new(), -amount),
        ];
        let result = validate_lines(&lines);
        let rejected = matches!(result, Err(LedgerError::Validation { line: Some(0), .. }));
        prop_assert!(rejected, "negative amount accepted: {:?}", result);
    }

    /// Fewer than two lines never validate.
    #[test]
    fn prop_single_line_rejected(amount in positive_amount()) {
        let lines = vec![LineInput::debit(AccountId::new(), amount)];
        let rejected = matches!(
            validate_lines(&lines),
            Err(LedgerError::Validation { line: None, .. })
        );
        prop_assert!(rejected);
    }
}
