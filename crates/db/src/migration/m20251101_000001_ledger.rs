//! Ledger schema: accounts, journal entries and lines, entry sequences,
//! accounting periods and the audit trail.
//!
//! Plain SQL that runs unchanged on PostgreSQL and SQLite: no native enums,
//! no server-side defaults for timestamps, one statement per call.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CHART OF ACCOUNTS
        // ============================================================
        for sql in ACCOUNTS_SQL {
            db.execute_unprepared(sql).await?;
        }

        // ============================================================
        // PART 2: JOURNAL
        // ============================================================
        for sql in JOURNAL_SQL {
            db.execute_unprepared(sql).await?;
        }

        // ============================================================
        // PART 3: PERIODS
        // ============================================================
        for sql in PERIODS_SQL {
            db.execute_unprepared(sql).await?;
        }

        // ============================================================
        // PART 4: AUDIT TRAIL
        // ============================================================
        for sql in AUDIT_SQL {
            db.execute_unprepared(sql).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for sql in DROP_SQL {
            db.execute_unprepared(sql).await?;
        }
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACCOUNTS_SQL: &[&str] = &[
    r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL UNIQUE,
    name VARCHAR(200) NOT NULL,
    account_type VARCHAR(20) NOT NULL
        CHECK (account_type IN ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE')),
    parent_id UUID REFERENCES accounts(id),
    is_header BOOLEAN NOT NULL DEFAULT FALSE,
    balance BIGINT NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
    "CREATE INDEX idx_accounts_parent ON accounts(parent_id)",
    "CREATE INDEX idx_accounts_type ON accounts(account_type)",
];

const JOURNAL_SQL: &[&str] = &[
    r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    code VARCHAR(40) NOT NULL UNIQUE,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference_type VARCHAR(50),
    reference_id VARCHAR(100),
    source_type VARCHAR(20) NOT NULL
        CHECK (source_type IN ('MANUAL', 'BUSINESS_EVENT', 'REVERSAL', 'CLOSING')),
    status VARCHAR(20) NOT NULL
        CHECK (status IN ('DRAFT', 'POSTED', 'REVERSED')),
    total_debit BIGINT NOT NULL CHECK (total_debit >= 0),
    total_credit BIGINT NOT NULL CHECK (total_credit >= 0),
    created_by UUID NOT NULL,
    posted_by UUID,
    posted_at TIMESTAMPTZ,
    reverses_entry_id UUID REFERENCES journal_entries(id),
    reversed_by_entry_id UUID REFERENCES journal_entries(id),
    reversal_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CHECK (status = 'DRAFT' OR total_debit = total_credit)
)",
    "CREATE INDEX idx_journal_entries_date ON journal_entries(entry_date, status)",
    "CREATE INDEX idx_journal_entries_reference ON journal_entries(reference_type, reference_id)",
    // A business event reference can only ever be posted once.
    r"
CREATE UNIQUE INDEX ux_journal_entries_business_reference
    ON journal_entries(reference_type, reference_id)
    WHERE source_type = 'BUSINESS_EVENT'",
    r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    debit BIGINT NOT NULL DEFAULT 0 CHECK (debit >= 0),
    credit BIGINT NOT NULL DEFAULT 0 CHECK (credit >= 0),
    description TEXT,
    CHECK ((debit > 0 AND credit = 0) OR (debit = 0 AND credit > 0)),
    UNIQUE (entry_id, line_no)
)",
    "CREATE INDEX idx_journal_lines_account ON journal_lines(account_id)",
    r"
CREATE TABLE journal_sequences (
    scope VARCHAR(40) PRIMARY KEY,
    last_value BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)",
];

const PERIODS_SQL: &[&str] = &[r"
CREATE TABLE accounting_periods (
    id UUID PRIMARY KEY,
    year INTEGER NOT NULL,
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    name VARCHAR(7) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    status VARCHAR(20) NOT NULL CHECK (status IN ('OPEN', 'CLOSED', 'LOCKED')),
    closed_at TIMESTAMPTZ,
    closed_by UUID,
    net_income BIGINT,
    total_revenue BIGINT,
    total_expense BIGINT,
    closing_entry_id UUID REFERENCES journal_entries(id),
    reopened_at TIMESTAMPTZ,
    reopened_by UUID,
    reopen_reason TEXT,
    locked_at TIMESTAMPTZ,
    locked_by UUID,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (year, month),
    CHECK (start_date <= end_date)
)"];

const AUDIT_SQL: &[&str] = &[
    r"
CREATE TABLE audit_logs (
    id UUID PRIMARY KEY,
    actor_id UUID NOT NULL,
    actor_role VARCHAR(20) NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,
    operation VARCHAR(40) NOT NULL,
    entity_type VARCHAR(40) NOT NULL,
    entity_id UUID NOT NULL,
    before_status VARCHAR(30),
    after_status VARCHAR(30),
    reason TEXT,
    details TEXT
)",
    "CREATE INDEX idx_audit_logs_entity ON audit_logs(entity_type, entity_id)",
];

const DROP_SQL: &[&str] = &[
    "DROP TABLE IF EXISTS audit_logs",
    "DROP TABLE IF EXISTS accounting_periods",
    "DROP TABLE IF EXISTS journal_sequences",
    "DROP TABLE IF EXISTS journal_lines",
    "DROP TABLE IF EXISTS journal_entries",
    "DROP TABLE IF EXISTS accounts",
];
