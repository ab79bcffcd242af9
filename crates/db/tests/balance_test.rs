//! Integration tests for balance reconciliation and the trial balance.

#![allow(clippy::unwrap_used)]

mod common;

use common::{actor, balance, date, post, setup};
use erp_ledger_core::audit::AuditEntity;
use erp_ledger_core::auth::Role;
use erp_ledger_core::ledger::LedgerError;
use erp_ledger_db::entities::accounts;
use erp_ledger_db::repositories::AuditFilter;
use erp_ledger_shared::types::{AccountId, Money, PageRequest};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// Overwrites a stored balance behind the ledger's back.
async fn corrupt(ledger: &common::TestLedger, account: AccountId, value: i64) {
    accounts::Entity::update_many()
        .col_expr(accounts::Column::Balance, Expr::value(value))
        .filter(accounts::Column::Id.eq(account.into_inner()))
        .exec(ledger.store.connection())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_consistent_ledger_has_no_drift() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 500_000).await;
    post(&ledger, date(2025, 11, 2), c.rent, c.cash, 20_000).await;

    let balances = ledger.store.balances();
    assert!(balances.find_inconsistent_accounts().await.unwrap().is_empty());

    let check = balances.check_account(c.cash).await.unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.stored, Money::from_minor(480_000));
    assert_eq!(check.code, "1101");
}

#[tokio::test]
async fn test_drift_is_detected_and_repaired() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 500_000).await;
    corrupt(&ledger, c.cash, 123).await;

    let balances = ledger.store.balances();
    let drifted = balances.find_inconsistent_accounts().await.unwrap();
    assert_eq!(drifted.len(), 1);
    assert_eq!(drifted[0].account_id, c.cash);
    assert_eq!(drifted[0].stored, Money::from_minor(123));
    assert_eq!(drifted[0].recomputed, Money::from_minor(500_000));

    let err = balances
        .repair_balances(&actor(Role::Accountant))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ledger(),
        Some(LedgerError::InsufficientPermission { .. })
    ));
    assert_eq!(balance(&ledger, c.cash).await, 123);

    let repaired = balances
        .repair_balances(&actor(Role::Controller))
        .await
        .unwrap();
    assert_eq!(repaired.len(), 1);
    assert_eq!(balance(&ledger, c.cash).await, 500_000);
    assert!(balances.find_inconsistent_accounts().await.unwrap().is_empty());

    let audit = ledger
        .store
        .audit()
        .list(
            AuditFilter {
                entity: Some(AuditEntity::Account),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(audit.data.len(), 1);
    assert_eq!(audit.data[0].operation, "REPAIR_BALANCE");
    assert_eq!(audit.data[0].entity_id, c.cash.into_inner());
}

#[tokio::test]
async fn test_repair_without_drift_changes_nothing() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 1_000).await;

    let repaired = ledger
        .store
        .balances()
        .repair_balances(&actor(Role::Controller))
        .await
        .unwrap();

    assert!(repaired.is_empty());
    assert_eq!(balance(&ledger, c.cash).await, 1_000);
}

#[tokio::test]
async fn test_recompute_as_of_date() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 10, 5), c.cash, c.capital, 1_000).await;
    post(&ledger, date(2025, 11, 5), c.cash, c.capital, 250).await;

    let balances = ledger.store.balances();
    assert_eq!(
        balances
            .recompute_from_scratch(c.cash, date(2025, 10, 31))
            .await
            .unwrap(),
        Money::from_minor(1_000)
    );
    assert_eq!(
        balances
            .recompute_from_scratch(c.cash, date(2025, 11, 30))
            .await
            .unwrap(),
        Money::from_minor(1_250)
    );
}

#[tokio::test]
async fn test_reversed_entries_replay_to_zero() {
    let ledger = setup().await;
    let c = ledger.chart;
    let sale = post(&ledger, date(2025, 11, 3), c.receivables, c.sales, 900).await;
    ledger
        .store
        .journal()
        .reverse(&actor(Role::Accountant), sale.id(), "entered twice")
        .await
        .unwrap();

    let balances = ledger.store.balances();
    let check = balances.check_account(c.receivables).await.unwrap();
    assert_eq!(check.recomputed, Money::ZERO);
    assert!(check.is_consistent());
}

#[tokio::test]
async fn test_header_balances_roll_up() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 700).await;
    post(&ledger, date(2025, 11, 2), c.receivables, c.sales, 200).await;
    post(&ledger, date(2025, 11, 3), c.equipment, c.cash, 100).await;

    let accounts = ledger.store.accounts();
    assert_eq!(
        accounts.header_balance(c.current_assets).await.unwrap(),
        Money::from_minor(800)
    );
    assert_eq!(
        accounts.header_balance(c.assets).await.unwrap(),
        Money::from_minor(900)
    );
    assert_eq!(
        ledger
            .store
            .balances()
            .recompute_from_scratch(c.assets, date(2025, 11, 30))
            .await
            .unwrap(),
        Money::from_minor(900)
    );

    let err = ledger
        .store
        .balances()
        .check_account(c.assets)
        .await
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Validation { .. })));
}

#[tokio::test]
async fn test_trial_balance_columns_agree() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 10_000).await;
    post(&ledger, date(2025, 11, 2), c.cash, c.sales, 4_000).await;
    post(&ledger, date(2025, 11, 3), c.rent, c.cash, 1_500).await;
    post(&ledger, date(2025, 11, 4), c.equipment, c.payables, 2_000).await;

    let trial = ledger.store.balances().trial_balance().await.unwrap();

    assert_eq!(trial.total_debit, trial.total_credit);
    assert_eq!(trial.total_debit, Money::from_minor(16_000));
    let cash = trial.rows.iter().find(|r| r.code == "1101").unwrap();
    assert_eq!(cash.debit, Money::from_minor(12_500));
    assert_eq!(cash.credit, Money::ZERO);
    let sales = trial.rows.iter().find(|r| r.code == "4000").unwrap();
    assert_eq!(sales.credit, Money::from_minor(4_000));
    assert!(trial.rows.windows(2).all(|w| w[0].code < w[1].code));
}

#[tokio::test]
async fn test_account_type_locked_after_posting() {
    let ledger = setup().await;
    let c = ledger.chart;
    let accounts = ledger.store.accounts();

    let changed = accounts
        .change_account_type(c.service_revenue, erp_ledger_core::ledger::AccountType::Liability)
        .await
        .unwrap();
    assert_eq!(changed.code, "4100");

    post(&ledger, date(2025, 11, 1), c.cash, c.capital, 10).await;
    let err = accounts
        .change_account_type(c.cash, erp_ledger_core::ledger::AccountType::Expense)
        .await
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::AccountTypeLocked(_))));

    let err = accounts.deactivate_account(c.cash).await.unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Validation { .. })));
}

#[tokio::test]
async fn test_rename_account_keeps_code_and_balance() {
    let ledger = setup().await;
    let c = ledger.chart;
    post(&ledger, date(2025, 11, 1), c.rent, c.cash, 2_500).await;
    let accounts = ledger.store.accounts();

    let renamed = accounts.rename_account(c.rent, "  Office Rent ").await.unwrap();
    assert_eq!(renamed.name, "Office Rent");
    assert_eq!(renamed.code, "5100");
    assert_eq!(renamed.balance, 2_500);
    assert_eq!(accounts.get_by_code("5100").await.unwrap().name, "Office Rent");

    let err = accounts.rename_account(c.rent, "   ").await.unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Validation { .. })));
    assert_eq!(accounts.get(c.rent).await.unwrap().name, "Office Rent");
}
