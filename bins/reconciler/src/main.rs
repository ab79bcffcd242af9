//! Operator CLI for the ERP ledger.
//!
//! Checks and repairs stored balances, prints the trial balance and runs
//! the period lifecycle (preview, close, reopen, lock).
//!
//! Usage:
//!   erp-ledger-reconciler check
//!   erp-ledger-reconciler repair --role controller
//!   erp-ledger-reconciler trial-balance
//!   erp-ledger-reconciler preview 2025-10
//!   erp-ledger-reconciler close 2025-10 --notes "October close"
//!   erp-ledger-reconciler reopen 2025-10 --reason "late supplier invoice"
//!   erp-ledger-reconciler lock 2025-10
//!   erp-ledger-reconciler summary 2025-10
//!   erp-ledger-reconciler recompute 1101 --as-of 2025-10-31
//!
//! Configuration is read from `config/` and `LEDGER__*` variables.

use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use erp_ledger_core::auth::{Actor, Role};
use erp_ledger_core::period::{PeriodStatus, YearMonth};
use erp_ledger_db::repositories::CloseOptions;
use erp_ledger_db::{LedgerStore, StoreError, connect};
use erp_ledger_shared::{AppConfig, AppError};
use erp_ledger_shared::config::LoggingConfig;
use erp_ledger_shared::types::{AccountId, UserId};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "erp-ledger-reconciler")]
#[command(about = "Reconcile balances and close accounting periods", long_about = None)]
struct Cli {
    /// User recorded on audit rows.
    #[arg(long, global = true)]
    user_id: Option<UserId>,

    /// Role used for permission checks.
    #[arg(long, global = true, default_value = "controller", value_parser = parse_role)]
    role: Role,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List accounts whose stored balance differs from the journal
    Check,
    /// Overwrite drifted balances with the recomputed values
    Repair,
    /// Print the trial balance
    TrialBalance,
    /// Show what closing a period would do
    Preview {
        /// Period, YYYY-MM
        period: YearMonth,
    },
    /// Close a period and post its closing entry
    Close {
        /// Period, YYYY-MM
        period: YearMonth,

        /// Notes stored on the audit record
        #[arg(long)]
        notes: Option<String>,

        /// Do not open the following period
        #[arg(long)]
        no_provision_next: bool,
    },
    /// Reopen a closed period
    Reopen {
        /// Period, YYYY-MM
        period: YearMonth,

        /// Why the period is reopened
        #[arg(long)]
        reason: String,
    },
    /// Lock a closed period permanently
    Lock {
        /// Period, YYYY-MM
        period: YearMonth,
    },
    /// Entry counts and totals for a period
    Summary {
        /// Period, YYYY-MM
        period: YearMonth,
    },
    /// Replay an account balance from the journal
    Recompute {
        /// Account code
        code: String,

        /// Include lines dated on or before this day (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{s}'"))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store = LedgerStore::from_config(db, config.ledger)?;
    let actor = Actor::new(cli.user_id.unwrap_or_default(), cli.role);
    info!(user = %actor.user_id, role = %actor.role, "reconciler started");

    match run(&store, &actor, cli.command).await {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast::<StoreError>() {
            Ok(store_err) => {
                error!(error = %store_err, "command failed");
                let app = AppError::from(store_err);
                eprintln!("error: {app}");
                Ok(ExitCode::from(2))
            }
            Err(other) => Err(other),
        },
    }
}

async fn run(store: &LedgerStore, actor: &Actor, command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Check => {
            let drifted = store.balances().find_inconsistent_accounts().await?;
            if drifted.is_empty() {
                println!("All stored balances match the journal.");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{:<10} {:>18} {:>18}", "ACCOUNT", "STORED", "RECOMPUTED");
            for check in &drifted {
                println!("{:<10} {:>18} {:>18}", check.code, check.stored, check.recomputed);
            }
            println!("{} account(s) drifted", drifted.len());
            Ok(ExitCode::FAILURE)
        }
        Commands::Repair => {
            let repaired = store.balances().repair_balances(actor).await?;
            for check in &repaired {
                println!("{}: {} -> {}", check.code, check.stored, check.recomputed);
            }
            println!("{} account(s) repaired", repaired.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::TrialBalance => {
            let trial = store.balances().trial_balance().await?;
            println!("{:<10} {:<32} {:>18} {:>18}", "CODE", "NAME", "DEBIT", "CREDIT");
            for row in &trial.rows {
                println!(
                    "{:<10} {:<32} {:>18} {:>18}",
                    row.code, row.name, row.debit, row.credit
                );
            }
            println!(
                "{:<10} {:<32} {:>18} {:>18}",
                "", "TOTAL", trial.total_debit, trial.total_credit
            );
            Ok(if trial.total_debit == trial.total_credit {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Preview { period } => {
            let preview = store
                .periods()
                .preview_closing(period.year(), period.month())
                .await?;
            println!("Period:         {}", preview.period);
            println!("Total revenue:  {}", preview.total_revenue);
            println!("Total expense:  {}", preview.total_expense);
            println!("Net income:     {}", preview.net_income);
            println!(
                "Accounts:       {} revenue, {} expense",
                preview.revenue_accounts, preview.expense_accounts
            );
            if preview.can_close {
                println!("Ready to close.");
            } else {
                for blocker in &preview.blockers {
                    println!("Blocked: {blocker}");
                }
            }
            Ok(if preview.can_close {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Close {
            period,
            notes,
            no_provision_next,
        } => {
            let result = store
                .periods()
                .close_period(
                    actor,
                    period.year(),
                    period.month(),
                    CloseOptions {
                        notes,
                        provision_next: !no_provision_next,
                    },
                )
                .await?;
            println!("Closed {}", result.period.name);
            println!("Net income:     {}", result.net_income);
            match &result.closing_entry {
                Some(entry) => println!("Closing entry:  {}", entry.code),
                None => println!("No revenue or expense to close."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reopen { period, reason } => {
            let reopened = store
                .periods()
                .reopen_period(actor, period.year(), period.month(), &reason)
                .await?;
            println!("Reopened {}", reopened.name);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lock { period } => {
            let locked = store
                .periods()
                .lock_period(actor, period.year(), period.month())
                .await?;
            println!("Locked {}", locked.name);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Summary { period } => {
            let summary = store
                .periods()
                .get_period_summary(period.year(), period.month())
                .await?;
            println!("Period:   {} ({})", summary.period.name, PeriodStatus::from(summary.period.status));
            println!(
                "Entries:  {} draft, {} posted, {} reversed",
                summary.draft_count, summary.posted_count, summary.reversed_count
            );
            println!("Debit:    {}", summary.total_debit);
            println!("Credit:   {}", summary.total_credit);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Recompute { code, as_of } => {
            let account = store.accounts().get_by_code(&code).await?;
            let as_of = as_of.unwrap_or_else(|| store.context().today());
            let replayed = store
                .balances()
                .recompute_from_scratch(AccountId::from_uuid(account.id), as_of)
                .await?;
            println!("{} {} as of {as_of}: {replayed}", account.code, account.name);
            Ok(ExitCode::SUCCESS)
        }
    }
}
