//! Approval repository.
//!
//! A request stores a business event until it is decided. Approval posts
//! the event in the same transaction that flips the request to APPROVED,
//! with the request row locked, so the event is posted exactly once.

use std::sync::Arc;

use chrono::Utc;
use erp_ledger_core::approval::{ApprovalAction, ApprovalError, ApprovalStatus, ApprovalWorkflow};
use erp_ledger_core::audit::{AuditEntity, AuditOperation, AuditRecord};
use erp_ledger_core::auth::{Actor, Capability, authorize};
use erp_ledger_core::ledger::{BusinessEvent, LineInput, validate_draft};
use erp_ledger_shared::types::{ApprovalRequestId, Money};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, instrument, warn};

use super::audit;
use super::context::{LedgerContext, with_deadline};
use super::error::StoreResult;
use super::journal::{JournalEntryWithLines, check_accounts, post_business_event_in_txn};
use crate::entities::{approval_requests, sea_orm_active_enums};

/// Outcome of an approve call.
#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    /// The amount exceeded the approver's limit; a controller must decide.
    Escalated(approval_requests::Model),
    /// Approved and posted.
    Approved {
        /// The request after approval.
        request: approval_requests::Model,
        /// The posted entry.
        entry: JournalEntryWithLines,
    },
}

/// Approval repository.
#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    db: DatabaseConnection,
    ctx: Arc<LedgerContext>,
}

impl ApprovalRepository {
    /// Creates a new approval repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, ctx: Arc<LedgerContext>) -> Self {
        Self { db, ctx }
    }

    /// Stores a business event as a DRAFT request.
    ///
    /// The event is validated now so a request that can never post is
    /// rejected up front.
    #[instrument(skip(self, actor, event), fields(actor = %actor.user_id, reference = %event.reference_type, id = %event.reference_id))]
    pub async fn create_request(
        &self,
        actor: &Actor,
        event: &BusinessEvent,
    ) -> StoreResult<approval_requests::Model> {
        authorize(actor, Capability::SubmitApproval)?;
        let totals = validate_draft(&event.to_draft())?;
        check_accounts(&self.db, &event.lines).await?;
        let lines_json = serde_json::to_string(&event.lines)?;

        let now = Utc::now();
        let request = approval_requests::ActiveModel {
            id: Set(ApprovalRequestId::new().into_inner()),
            reference_type: Set(event.reference_type.trim().to_string()),
            reference_id: Set(event.reference_id.trim().to_string()),
            entry_date: Set(event.entry_date),
            description: Set(event.description.trim().to_string()),
            lines_json: Set(lines_json),
            total_amount: Set(totals.debit.minor()),
            status: Set(ApprovalStatus::Draft.into()),
            requested_by: Set(actor.user_id.into_inner()),
            submitted_at: Set(None),
            decided_by: Set(None),
            decided_at: Set(None),
            decision_note: Set(None),
            journal_entry_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        Ok(request.insert(&self.db).await?)
    }

    /// Submits a DRAFT request for approval.
    #[instrument(skip(self, actor), fields(actor = %actor.user_id, request = %id))]
    pub async fn submit(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> StoreResult<approval_requests::Model> {
        with_deadline("submit_approval", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let request = lock_request(&txn, id).await?;
            let action = ApprovalWorkflow::submit(actor, request.status.into())?;
            let request = apply_action(&txn, actor, request, &action, None).await?;
            txn.commit().await?;
            Ok(request)
        })
        .await
    }

    /// Approves a pending or escalated request.
    ///
    /// Above the approver's limit the request is escalated instead.
    /// Approval posts the business event and records the entry id.
    #[instrument(skip(self, actor, note), fields(actor = %actor.user_id, request = %id))]
    pub async fn approve(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
        note: Option<String>,
    ) -> StoreResult<ApprovalOutcome> {
        with_deadline("approve_request", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let request = lock_request(&txn, id).await?;
            let amount = Money::from_minor(request.total_amount);
            let action = ApprovalWorkflow::approve(actor, request.status.into(), amount, note)?;

            let outcome = if action.posts_entry() {
                let event = decode_event(&request)?;
                let entry = post_business_event_in_txn(&txn, &self.ctx, actor, &event).await?;
                let request = apply_action(&txn, actor, request, &action, Some(&entry)).await?;
                info!(code = %entry.entry.code, "approval posted business event");
                ApprovalOutcome::Approved { request, entry }
            } else {
                let request = apply_action(&txn, actor, request, &action, None).await?;
                warn!(amount = %amount, "approval escalated, amount above approver limit");
                ApprovalOutcome::Escalated(request)
            };

            txn.commit().await?;
            Ok(outcome)
        })
        .await
    }

    /// Rejects a pending or escalated request.
    #[instrument(skip(self, actor, reason), fields(actor = %actor.user_id, request = %id))]
    pub async fn reject(
        &self,
        actor: &Actor,
        id: ApprovalRequestId,
        reason: &str,
    ) -> StoreResult<approval_requests::Model> {
        with_deadline("reject_request", self.ctx.timeout(), async {
            let txn = self.db.begin().await?;
            let request = lock_request(&txn, id).await?;
            let action = ApprovalWorkflow::reject(actor, request.status.into(), reason)?;
            let request = apply_action(&txn, actor, request, &action, None).await?;
            txn.commit().await?;
            Ok(request)
        })
        .await
    }

    /// Finds a request.
    pub async fn get(&self, id: ApprovalRequestId) -> StoreResult<approval_requests::Model> {
        approval_requests::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or_else(|| ApprovalError::RequestNotFound(id.to_string()).into())
    }

    /// Requests awaiting a decision, oldest first.
    pub async fn list_awaiting_decision(&self) -> StoreResult<Vec<approval_requests::Model>> {
        let waiting: Vec<sea_orm_active_enums::ApprovalStatus> = vec![
            ApprovalStatus::PendingApproval.into(),
            ApprovalStatus::Escalated.into(),
        ];
        Ok(approval_requests::Entity::find()
            .filter(approval_requests::Column::Status.is_in(waiting))
            .order_by_asc(approval_requests::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}

async fn lock_request(
    txn: &DatabaseTransaction,
    id: ApprovalRequestId,
) -> StoreResult<approval_requests::Model> {
    approval_requests::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| ApprovalError::RequestNotFound(id.to_string()).into())
}

/// Rebuilds the business event stored on a request.
fn decode_event(request: &approval_requests::Model) -> StoreResult<BusinessEvent> {
    let lines: Vec<LineInput> = serde_json::from_str(&request.lines_json)
        .map_err(|_| ApprovalError::CorruptPayload(request.id.to_string()))?;

    Ok(BusinessEvent {
        reference_type: request.reference_type.clone(),
        reference_id: request.reference_id.clone(),
        lines,
        entry_date: request.entry_date,
        description: request.description.clone(),
    })
}

/// Persists an approval action and writes its audit record.
async fn apply_action(
    txn: &DatabaseTransaction,
    actor: &Actor,
    request: approval_requests::Model,
    action: &ApprovalAction,
    posted: Option<&JournalEntryWithLines>,
) -> StoreResult<approval_requests::Model> {
    let from = ApprovalStatus::from(request.status);
    let to = action.new_status();
    let mut active = request.into_active_model();
    active.status = Set(to.into());
    active.updated_at = Set(Utc::now().into());

    let (operation, reason) = match action {
        ApprovalAction::Submit { submitted_at, .. } => {
            active.submitted_at = Set(Some((*submitted_at).into()));
            (AuditOperation::SubmitApproval, None)
        }
        ApprovalAction::Escalate { .. } => (AuditOperation::EscalateApproval, None),
        ApprovalAction::Approve {
            approved_by,
            approved_at,
            note,
            ..
        } => {
            active.decided_by = Set(Some(approved_by.into_inner()));
            active.decided_at = Set(Some((*approved_at).into()));
            active.decision_note = Set(note.clone());
            active.journal_entry_id = Set(posted.map(|p| p.entry.id));
            (AuditOperation::ApproveRequest, note.clone())
        }
        ApprovalAction::Reject {
            rejected_by,
            rejected_at,
            reason,
            ..
        } => {
            active.decided_by = Set(Some(rejected_by.into_inner()));
            active.decided_at = Set(Some((*rejected_at).into()));
            active.decision_note = Set(Some(reason.clone()));
            (AuditOperation::RejectRequest, Some(reason.clone()))
        }
    };
    let request = active.update(txn).await?;

    let mut record = AuditRecord::new(actor, operation, AuditEntity::ApprovalRequest, request.id)
        .transition(from, to)
        .reason(reason.as_deref());
    if let Some(entry) = posted {
        record = record.details(format!("posted as {}", entry.entry.code));
    }
    audit::record(txn, record).await?;

    Ok(request)
}
