//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Ledger repositories that run the core rules inside transactions
//! - Database migrations
//! - [`LedgerStore`], one handle over every repository

pub mod entities;
pub mod migration;
pub mod repositories;

use std::sync::Arc;
use std::time::Duration;

use erp_ledger_shared::config::{DatabaseConfig, LedgerConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

pub use repositories::{
    AccountRepository, ApprovalRepository, AuditRepository, BalanceRepository, JournalRepository,
    LedgerContext, PeriodRepository, StoreError, StoreResult,
};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    let db = Database::connect(options).await?;
    info!(
        backend = ?db.get_database_backend(),
        max_connections = config.max_connections,
        "database connected"
    );
    Ok(db)
}

/// Every ledger repository over one connection pool and one context.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: DatabaseConnection,
    ctx: Arc<LedgerContext>,
}

impl LedgerStore {
    /// Wraps a connection with an existing context.
    #[must_use]
    pub fn new(db: DatabaseConnection, ctx: LedgerContext) -> Self {
        Self {
            db,
            ctx: Arc::new(ctx),
        }
    }

    /// Builds the context from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured timezone or window is invalid.
    pub fn from_config(db: DatabaseConnection, config: LedgerConfig) -> StoreResult<Self> {
        Ok(Self::new(db, LedgerContext::from_config(config)?))
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The shared ledger context.
    #[must_use]
    pub fn context(&self) -> &LedgerContext {
        &self.ctx
    }

    /// Chart of accounts.
    #[must_use]
    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.db.clone())
    }

    /// Journal entries.
    #[must_use]
    pub fn journal(&self) -> JournalRepository {
        JournalRepository::new(self.db.clone(), Arc::clone(&self.ctx))
    }

    /// Accounting periods.
    #[must_use]
    pub fn periods(&self) -> PeriodRepository {
        PeriodRepository::new(self.db.clone(), Arc::clone(&self.ctx))
    }

    /// Balance checks and repair.
    #[must_use]
    pub fn balances(&self) -> BalanceRepository {
        BalanceRepository::new(self.db.clone(), Arc::clone(&self.ctx))
    }

    /// Approval requests.
    #[must_use]
    pub fn approvals(&self) -> ApprovalRepository {
        ApprovalRepository::new(self.db.clone(), Arc::clone(&self.ctx))
    }

    /// Audit trail.
    #[must_use]
    pub fn audit(&self) -> AuditRepository {
        AuditRepository::new(self.db.clone())
    }
}
