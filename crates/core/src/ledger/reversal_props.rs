//! Property-based tests for reversing entries.

use chrono::NaiveDate;
use proptest::prelude::*;
use erp_ledger_shared::types::{AccountId, Money};

use super::balance::aggregate_by_account;
use super::reversal::{OriginalEntry, build_reversal, reverse_lines};
use super::types::{AccountType, EntryStatus, LineInput};
use super::validation::validate_lines;

fn balanced_lines() -> impl Strategy<Value = Vec<LineInput>> {
    prop::collection::vec(1i64..5_000_000, 1..6).prop_map(|amounts| {
        let total: i64 = amounts.iter().sum();
        let mut lines: Vec<LineInput> = amounts
            .into_iter()
            .map(|m| LineInput::debit(AccountId::new(), Money::from_minor(m)))
            .collect();
        lines.push(LineInput::credit(AccountId::new(), Money::from_minor(total)));
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Reversing twice gives back the original amounts.
    #[test]
    fn prop_reversal_is_involution(lines in balanced_lines()) {
        let twice = reverse_lines(&reverse_lines(&lines));
        for (a, b) in lines.iter().zip(&twice) {
            prop_assert_eq!(a.account_id, b.account_id);
            prop_assert_eq!(a.debit, b.debit);
            prop_assert_eq!(a.credit, b.credit);
        }
    }

    /// A reversal of a balanced entry is balanced.
    #[test]
    fn prop_reversal_is_balanced(lines in balanced_lines()) {
        prop_assert!(validate_lines(&reverse_lines(&lines)).is_ok());
    }

    /// Original plus reversal nets every account to zero.
    #[test]
    fn prop_original_plus_reversal_nets_to_zero(lines in balanced_lines()) {
        let original = OriginalEntry {
            code: "JE-2025-11-0001".into(),
            status: EntryStatus::Posted,
            has_reversal: false,
            lines: lines.clone(),
        };
        let draft = build_reversal(&original, "duplicate", NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()).unwrap();

        let mut combined = lines;
        combined.extend(draft.lines);
        for totals in aggregate_by_account(&combined).unwrap().values() {
            prop_assert!(totals.delta_for(AccountType::Asset).is_zero());
        }
    }
}
