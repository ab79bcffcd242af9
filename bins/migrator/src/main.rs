//! Database migration runner for the ERP ledger.
//!
//! Usage:
//!   erp-ledger-migrator up      - Run all pending migrations
//!   erp-ledger-migrator down    - Rollback last migration
//!   erp-ledger-migrator status  - Show migration status
//!   erp-ledger-migrator fresh   - Drop all tables and re-run migrations
//!
//! The connection string comes from `DATABASE_URL`.

use erp_ledger_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Run the migrator CLI (it sets up its own tracing)
    cli::run_cli(Migrator).await;
}
