//! Database seeder for ERP ledger development and testing.
//!
//! Seeds a small chart of accounts (headers 1000, 1100, 2000, 3000 and the
//! postable accounts below them) and opens the current period. Accounts
//! that already exist are left alone, so the seeder can run repeatedly.
//!
//! Usage: cargo run --bin erp-ledger-seeder

use std::collections::HashMap;

use anyhow::Context;
use erp_ledger_core::ledger::{AccountType, LedgerError};
use erp_ledger_db::repositories::{AccountRepository, CreateAccountInput};
use erp_ledger_db::{LedgerStore, StoreError, connect};
use erp_ledger_shared::AppConfig;
use erp_ledger_shared::types::AccountId;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One chart row: code, name, type, parent code, header flag.
type ChartRow<'a> = (&'a str, &'static str, AccountType, Option<&'static str>, bool);

/// Default chart. Parents come before their children. Retained earnings
/// takes the code the closing run looks up.
fn chart(retained_earnings_code: &str) -> Vec<ChartRow<'_>> {
    vec![
        ("1000", "Assets", AccountType::Asset, None, true),
        ("1100", "Current Assets", AccountType::Asset, Some("1000"), true),
        ("1101", "Cash", AccountType::Asset, Some("1100"), false),
        ("1102", "Accounts Receivable", AccountType::Asset, Some("1100"), false),
        ("1201", "Equipment", AccountType::Asset, Some("1000"), false),
        ("2000", "Liabilities", AccountType::Liability, None, true),
        ("2101", "Accounts Payable", AccountType::Liability, Some("2000"), false),
        ("3000", "Equity", AccountType::Equity, None, true),
        ("3101", "Owner Capital", AccountType::Equity, Some("3000"), false),
        (retained_earnings_code, "Retained Earnings", AccountType::Equity, Some("3000"), false),
        ("4000", "Sales Revenue", AccountType::Revenue, None, false),
        ("4100", "Service Revenue", AccountType::Revenue, None, false),
        ("5000", "Cost of Sales", AccountType::Expense, None, false),
        ("5100", "Rent Expense", AccountType::Expense, None, false),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .init();

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let rows = chart(&config.ledger.retained_earnings_code);
    let store = LedgerStore::from_config(db, config.ledger.clone())?;

    info!("Seeding chart of accounts...");
    let created = seed_chart(&store.accounts(), &rows).await?;
    info!(created, total = rows.len(), "Chart seeded");

    let period = store.periods().get_or_create_current_period().await?;
    info!(period = %period.name, "Current period open");

    info!("Seeding complete!");
    Ok(())
}

async fn seed_chart(accounts: &AccountRepository, rows: &[ChartRow<'_>]) -> anyhow::Result<usize> {
    let mut ids: HashMap<&str, AccountId> = HashMap::new();
    let mut created = 0;

    for &(code, name, account_type, parent, is_header) in rows {
        match accounts.get_by_code(code).await {
            Ok(existing) => {
                info!(code, "  Account already exists, skipping...");
                ids.insert(code, AccountId::from_uuid(existing.id));
                continue;
            }
            Err(StoreError::Ledger(LedgerError::AccountNotFound(_))) => {}
            Err(err) => return Err(err.into()),
        }

        let mut input = if is_header {
            CreateAccountInput::header(code, name, account_type)
        } else {
            CreateAccountInput::leaf(code, name, account_type)
        };
        if let Some(parent) = parent {
            let parent_id = ids
                .get(parent)
                .copied()
                .with_context(|| format!("parent {parent} of {code} not seeded"))?;
            input = input.under(parent_id);
        }

        let account = accounts.create_account(input).await?;
        ids.insert(code, AccountId::from_uuid(account.id));
        created += 1;
    }

    Ok(created)
}
