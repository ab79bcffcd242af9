//! Property-based tests for period calendar and closing.

use chrono::NaiveDate;
use proptest::prelude::*;
use erp_ledger_shared::types::{AccountId, Money};

use super::calendar::YearMonth;
use super::closing::{ClosingBalance, build_closing_plan};
use crate::ledger::{AccountType, aggregate_by_account};

fn year_month() -> impl Strategy<Value = YearMonth> {
    (1990i32..2100, 1u32..=12).prop_map(|(y, m)| YearMonth::new(y, m).unwrap())
}

fn temporary_balances() -> impl Strategy<Value = Vec<ClosingBalance>> {
    prop::collection::vec(
        (
            prop_oneof![Just(AccountType::Revenue), Just(AccountType::Expense)],
            -5_000_000i64..5_000_000,
        ),
        0..8,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (account_type, minor))| ClosingBalance {
                account_id: AccountId::new(),
                code: format!("{}{i:03}", if account_type == AccountType::Revenue { 4 } else { 5 }),
                account_type,
                balance: Money::from_minor(minor),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Consecutive months tile the calendar without gaps or overlap.
    #[test]
    fn prop_months_are_contiguous(ym in year_month()) {
        let next = ym.next();
        prop_assert_eq!(ym.end_date().succ_opt(), Some(next.start_date()));
        prop_assert_eq!(next.prev(), ym);
        prop_assert!(ym < next);
    }

    /// Every date belongs to exactly the month it names.
    #[test]
    fn prop_date_in_own_month(ym in year_month(), day in 1u32..=31) {
        if let Some(date) = NaiveDate::from_ymd_opt(ym.year(), ym.month(), day) {
            prop_assert!(ym.contains(date));
            prop_assert!(!ym.next().contains(date));
            prop_assert_eq!(YearMonth::from_date(date), ym);
        }
    }

    /// Applying the closing plan zeroes every temporary account and moves
    /// exactly revenue minus expense into retained earnings.
    #[test]
    fn prop_closing_zeroes_temporary_accounts(balances in temporary_balances()) {
        let re = AccountId::new();
        let plan = build_closing_plan(&balances, re).unwrap();

        let expected_ni: Money = balances
            .iter()
            .map(|b| if b.account_type == AccountType::Revenue { b.balance } else { -b.balance })
            .sum();
        prop_assert_eq!(plan.net_income, expected_ni);

        let deltas = aggregate_by_account(&plan.lines).unwrap();
        for b in &balances {
            let delta = deltas
                .get(&b.account_id)
                .map_or(Money::ZERO, |t| t.delta_for(b.account_type));
            prop_assert_eq!(b.balance + delta, Money::ZERO, "account {} not zeroed", b.code);
        }

        let re_delta = deltas
            .get(&re)
            .map_or(Money::ZERO, |t| t.delta_for(AccountType::Equity));
        prop_assert_eq!(re_delta, expected_ni);
    }
}
