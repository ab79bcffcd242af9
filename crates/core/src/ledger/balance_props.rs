//! Property-based tests for balance math.

use proptest::prelude::*;
use erp_ledger_shared::types::{AccountId, Money};

use super::balance::{aggregate_by_account, replay};
use super::types::{AccountType, LineInput};

fn account_type() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
    ]
}

fn pair() -> impl Strategy<Value = (Money, Money)> {
    prop_oneof![
        (1i64..10_000_000).prop_map(|m| (Money::from_minor(m), Money::ZERO)),
        (1i64..10_000_000).prop_map(|m| (Money::ZERO, Money::from_minor(m))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Replaying lines in any order yields the same balance.
    #[test]
    fn prop_replay_is_order_independent(
        ty in account_type(),
        pairs in prop::collection::vec(pair(), 0..20),
    ) {
        let forward = replay(ty, pairs.iter().copied());
        let backward = replay(ty, pairs.iter().rev().copied());
        prop_assert_eq!(forward, backward);
    }

    /// Debit-normal and credit-normal replays are exact negations.
    #[test]
    fn prop_normal_sides_are_opposite(pairs in prop::collection::vec(pair(), 0..20)) {
        let asset = replay(AccountType::Asset, pairs.iter().copied());
        let liability = replay(AccountType::Liability, pairs.iter().copied());
        prop_assert_eq!(asset, -liability);
    }

    /// Aggregation preserves totals and applying per-account deltas equals
    /// replaying each line.
    #[test]
    fn prop_aggregate_matches_line_replay(
        ty in account_type(),
        picks in prop::collection::vec((0usize..3, pair()), 1..30),
    ) {
        let accounts = [AccountId::new(), AccountId::new(), AccountId::new()];
        let lines: Vec<LineInput> = picks
            .iter()
            .map(|(i, (debit, credit))| LineInput {
                account_id: accounts[*i],
                debit: *debit,
                credit: *credit,
                description: None,
            })
            .collect();

        let totals = aggregate_by_account(&lines).unwrap();
        for (account_id, agg) in &totals {
            let expected = replay(
                ty,
                lines
                    .iter()
                    .filter(|l| l.account_id == *account_id)
                    .map(|l| (l.debit, l.credit)),
            );
            prop_assert_eq!(agg.delta_for(ty), expected);
        }

        let debit: Money = totals.values().map(|t| t.debit).sum();
        let line_debit: Money = lines.iter().map(|l| l.debit).sum();
        prop_assert_eq!(debit, line_debit);
    }
}
