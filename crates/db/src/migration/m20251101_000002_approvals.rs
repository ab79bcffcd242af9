//! Approval requests for business events.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(APPROVAL_REQUESTS_SQL).await?;
        db.execute_unprepared(APPROVAL_STATUS_INDEX_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS approval_requests")
            .await?;
        Ok(())
    }
}

const APPROVAL_REQUESTS_SQL: &str = r"
CREATE TABLE approval_requests (
    id UUID PRIMARY KEY,
    reference_type VARCHAR(50) NOT NULL,
    reference_id VARCHAR(100) NOT NULL,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    lines_json TEXT NOT NULL,
    total_amount BIGINT NOT NULL CHECK (total_amount >= 0),
    status VARCHAR(20) NOT NULL
        CHECK (status IN ('DRAFT', 'PENDING_APPROVAL', 'ESCALATED', 'APPROVED', 'REJECTED')),
    requested_by UUID NOT NULL,
    submitted_at TIMESTAMPTZ,
    decided_by UUID,
    decided_at TIMESTAMPTZ,
    decision_note TEXT,
    journal_entry_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    CHECK (status <> 'APPROVED' OR journal_entry_id IS NOT NULL)
)";

const APPROVAL_STATUS_INDEX_SQL: &str =
    "CREATE INDEX idx_approval_requests_status ON approval_requests(status)";
