//! Audit trail vocabulary.
//!
//! Every state change appends one [`AuditRecord`]. Records are never
//! updated or deleted.

use std::fmt;

use erp_ledger_shared::types::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{Actor, Role};

/// The audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOperation {
    /// Draft created.
    CreateDraft,
    /// Draft header or lines replaced.
    UpdateDraft,
    /// Draft deleted.
    DiscardDraft,
    /// Draft posted.
    PostEntry,
    /// Posted entry reversed.
    ReverseEntry,
    /// Period closed.
    ClosePeriod,
    /// Period reopened.
    ReopenPeriod,
    /// Period locked.
    LockPeriod,
    /// Stored balance overwritten with the recomputed one.
    RepairBalance,
    /// Business event submitted for approval.
    SubmitApproval,
    /// Request escalated above an approver's limit.
    EscalateApproval,
    /// Request approved and posted.
    ApproveRequest,
    /// Request rejected.
    RejectRequest,
}

impl AuditOperation {
    /// Returns the string representation of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDraft => "CREATE_DRAFT",
            Self::UpdateDraft => "UPDATE_DRAFT",
            Self::DiscardDraft => "DISCARD_DRAFT",
            Self::PostEntry => "POST_ENTRY",
            Self::ReverseEntry => "REVERSE_ENTRY",
            Self::ClosePeriod => "CLOSE_PERIOD",
            Self::ReopenPeriod => "REOPEN_PERIOD",
            Self::LockPeriod => "LOCK_PERIOD",
            Self::RepairBalance => "REPAIR_BALANCE",
            Self::SubmitApproval => "SUBMIT_APPROVAL",
            Self::EscalateApproval => "ESCALATE_APPROVAL",
            Self::ApproveRequest => "APPROVE_REQUEST",
            Self::RejectRequest => "REJECT_REQUEST",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntity {
    /// `journal_entries` row.
    JournalEntry,
    /// `accounting_periods` row.
    AccountingPeriod,
    /// `accounts` row.
    Account,
    /// `approval_requests` row.
    ApprovalRequest,
}

impl AuditEntity {
    /// Returns the string representation of the entity type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::JournalEntry => "JOURNAL_ENTRY",
            Self::AccountingPeriod => "ACCOUNTING_PERIOD",
            Self::Account => "ACCOUNT",
            Self::ApprovalRequest => "APPROVAL_REQUEST",
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record, ready to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Who.
    pub actor_id: UserId,
    /// With which role.
    pub actor_role: Role,
    /// What.
    pub operation: AuditOperation,
    /// On which kind of entity.
    pub entity: AuditEntity,
    /// On which entity.
    pub entity_id: Uuid,
    /// Status before the change.
    pub before_status: Option<String>,
    /// Status after the change.
    pub after_status: Option<String>,
    /// Why.
    pub reason: Option<String>,
    /// Free-form details, e.g. amounts or the related entry code.
    pub details: Option<String>,
}

impl AuditRecord {
    /// Starts a record for `actor`.
    #[must_use]
    pub fn new(
        actor: &Actor,
        operation: AuditOperation,
        entity: AuditEntity,
        entity_id: impl Into<Uuid>,
    ) -> Self {
        Self {
            actor_id: actor.user_id,
            actor_role: actor.role,
            operation,
            entity,
            entity_id: entity_id.into(),
            before_status: None,
            after_status: None,
            reason: None,
            details: None,
        }
    }

    /// Records a status change.
    #[must_use]
    pub fn transition(mut self, before: impl fmt::Display, after: impl fmt::Display) -> Self {
        self.before_status = Some(before.to_string());
        self.after_status = Some(after.to_string());
        self
    }

    /// Records the status after a creation.
    #[must_use]
    pub fn created(mut self, after: impl fmt::Display) -> Self {
        self.after_status = Some(after.to_string());
        self
    }

    /// Attaches a reason. Blank reasons are dropped.
    #[must_use]
    pub fn reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(ToString::to_string);
        self
    }

    /// Attaches details.
    #[must_use]
    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
