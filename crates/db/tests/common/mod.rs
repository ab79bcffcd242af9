//! Shared fixtures for the repository integration tests.
//!
//! Each test gets its own in-memory SQLite database with the full schema
//! and a small chart of accounts. The business date is pinned so posting
//! windows do not depend on the clock.

#![allow(dead_code)]

use chrono::NaiveDate;
use erp_ledger_core::auth::{Actor, Role};
use erp_ledger_core::ledger::{AccountType, BusinessEvent, DraftInput, LineInput, SourceType};
use erp_ledger_db::migration::{Migrator, MigratorTrait};
use erp_ledger_db::repositories::CreateAccountInput;
use erp_ledger_db::{LedgerContext, LedgerStore};
use erp_ledger_shared::types::{AccountId, Money, UserId};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Business date used by every fixture.
pub fn today() -> NaiveDate {
    date(2025, 11, 20)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn money(minor: i64) -> Money {
    Money::from_minor(minor)
}

pub fn actor(role: Role) -> Actor {
    Actor::new(UserId::new(), role)
}

/// The seeded chart, by code.
#[derive(Debug, Clone, Copy)]
pub struct Chart {
    pub assets: AccountId,
    pub current_assets: AccountId,
    pub cash: AccountId,
    pub receivables: AccountId,
    pub equipment: AccountId,
    pub payables: AccountId,
    pub capital: AccountId,
    pub retained_earnings: AccountId,
    pub sales: AccountId,
    pub service_revenue: AccountId,
    pub cost_of_sales: AccountId,
    pub rent: AccountId,
}

pub struct TestLedger {
    pub store: LedgerStore,
    pub chart: Chart,
}

/// Fresh database, migrated and seeded.
pub async fn setup() -> TestLedger {
    setup_with(LedgerContext::default().with_today(today())).await
}

pub async fn setup_with(ctx: LedgerContext) -> TestLedger {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection, otherwise every pooled connection sees its own database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to migrate");
    setup_on(db, ctx).await
}

/// Seeds the chart on an already migrated, empty database.
pub async fn setup_on(db: DatabaseConnection, ctx: LedgerContext) -> TestLedger {
    let store = LedgerStore::new(db, ctx);
    let chart = seed_chart(&store).await;
    TestLedger { store, chart }
}

async fn seed_chart(store: &LedgerStore) -> Chart {
    let accounts = store.accounts();
    let create = |input: CreateAccountInput| {
        let accounts = accounts.clone();
        async move {
            let model = accounts
                .create_account(input)
                .await
                .expect("Failed to create account");
            AccountId::from_uuid(model.id)
        }
    };

    let assets = create(CreateAccountInput::header("1000", "Assets", AccountType::Asset)).await;
    let current_assets =
        create(CreateAccountInput::header("1100", "Current Assets", AccountType::Asset).under(assets))
            .await;
    let liabilities =
        create(CreateAccountInput::header("2000", "Liabilities", AccountType::Liability)).await;
    let equity = create(CreateAccountInput::header("3000", "Equity", AccountType::Equity)).await;

    Chart {
        assets,
        current_assets,
        cash: create(CreateAccountInput::leaf("1101", "Cash", AccountType::Asset).under(current_assets))
            .await,
        receivables: create(
            CreateAccountInput::leaf("1102", "Accounts Receivable", AccountType::Asset)
                .under(current_assets),
        )
        .await,
        equipment: create(CreateAccountInput::leaf("1201", "Equipment", AccountType::Asset).under(assets))
            .await,
        payables: create(
            CreateAccountInput::leaf("2101", "Accounts Payable", AccountType::Liability)
                .under(liabilities),
        )
        .await,
        capital: create(CreateAccountInput::leaf("3101", "Owner Capital", AccountType::Equity).under(equity))
            .await,
        retained_earnings: create(
            CreateAccountInput::leaf("3201", "Retained Earnings", AccountType::Equity).under(equity),
        )
        .await,
        sales: create(CreateAccountInput::leaf("4000", "Sales Revenue", AccountType::Revenue)).await,
        service_revenue: create(CreateAccountInput::leaf(
            "4100",
            "Service Revenue",
            AccountType::Revenue,
        ))
        .await,
        cost_of_sales: create(CreateAccountInput::leaf("5000", "Cost of Sales", AccountType::Expense))
            .await,
        rent: create(CreateAccountInput::leaf("5100", "Rent Expense", AccountType::Expense)).await,
    }
}

/// Two-line manual draft moving `amount` from `credit` to `debit`.
pub fn draft(
    entry_date: NaiveDate,
    debit: AccountId,
    credit: AccountId,
    amount: i64,
) -> DraftInput {
    DraftInput {
        entry_date,
        description: "Test entry".to_string(),
        reference: None,
        source_type: SourceType::Manual,
        lines: vec![
            LineInput::debit(debit, money(amount)),
            LineInput::credit(credit, money(amount)),
        ],
    }
}

pub fn event(
    reference_id: &str,
    entry_date: NaiveDate,
    debit: AccountId,
    credit: AccountId,
    amount: i64,
) -> BusinessEvent {
    BusinessEvent {
        reference_type: "SALE".to_string(),
        reference_id: reference_id.to_string(),
        lines: vec![
            LineInput::debit(debit, money(amount)),
            LineInput::credit(credit, money(amount)),
        ],
        entry_date,
        description: format!("Sale {reference_id}"),
    }
}

/// Creates and posts a manual entry.
pub async fn post(
    ledger: &TestLedger,
    entry_date: NaiveDate,
    debit: AccountId,
    credit: AccountId,
    amount: i64,
) -> erp_ledger_db::repositories::JournalEntryWithLines {
    let accountant = actor(Role::Accountant);
    let journal = ledger.store.journal();
    let created = journal
        .create_draft(&accountant, draft(entry_date, debit, credit, amount))
        .await
        .expect("Failed to create draft");
    journal
        .post(&accountant, created.id())
        .await
        .expect("Failed to post draft")
}

/// Stored balance column of an account.
pub async fn balance(ledger: &TestLedger, account: AccountId) -> i64 {
    ledger
        .store
        .accounts()
        .get(account)
        .await
        .expect("Failed to load account")
        .balance
}
