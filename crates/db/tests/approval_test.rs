//! Integration tests for the approval workflow in front of business events.

#![allow(clippy::unwrap_used)]

mod common;

use common::{actor, balance, event, money, setup, today};
use erp_ledger_core::approval::{ApprovalError, ApprovalStatus};
use erp_ledger_core::audit::AuditEntity;
use erp_ledger_core::auth::Role;
use erp_ledger_core::ledger::{EntryStatus, LedgerError};
use erp_ledger_db::StoreError;
use erp_ledger_db::repositories::ApprovalOutcome;
use erp_ledger_shared::types::{ApprovalRequestId, JournalEntryId};

fn request_id(model: &erp_ledger_db::entities::approval_requests::Model) -> ApprovalRequestId {
    ApprovalRequestId::from_uuid(model.id)
}

#[tokio::test]
async fn test_approval_within_limit_posts_event() {
    let ledger = setup().await;
    let c = ledger.chart;
    let clerk = actor(Role::Clerk);
    let approver = actor(Role::Approver).with_approval_limit(money(100_000));
    let approvals = ledger.store.approvals();

    let sale = event("INV-2001", today(), c.receivables, c.sales, 12_500);
    let request = approvals.create_request(&clerk, &sale).await.unwrap();
    assert_eq!(ApprovalStatus::from(request.status), ApprovalStatus::Draft);
    assert_eq!(request.total_amount, 12_500);

    let submitted = approvals.submit(&clerk, request_id(&request)).await.unwrap();
    assert_eq!(
        ApprovalStatus::from(submitted.status),
        ApprovalStatus::PendingApproval
    );
    assert!(submitted.submitted_at.is_some());
    assert_eq!(balance(&ledger, c.receivables).await, 0);

    let outcome = approvals
        .approve(&approver, request_id(&request), Some("ok".to_string()))
        .await
        .unwrap();
    let ApprovalOutcome::Approved { request: approved, entry } = outcome else {
        panic!("expected approval");
    };

    assert_eq!(ApprovalStatus::from(approved.status), ApprovalStatus::Approved);
    assert_eq!(approved.journal_entry_id, Some(entry.entry.id));
    assert_eq!(approved.decided_by, Some(approver.user_id.into_inner()));
    assert_eq!(approved.decision_note.as_deref(), Some("ok"));
    assert_eq!(entry.status(), EntryStatus::Posted);
    assert_eq!(entry.entry.reference_id.as_deref(), Some("INV-2001"));
    assert_eq!(balance(&ledger, c.receivables).await, 12_500);
    assert_eq!(balance(&ledger, c.sales).await, 12_500);

    let trail = ledger
        .store
        .audit()
        .list_for_entity(AuditEntity::ApprovalRequest, request.id)
        .await
        .unwrap();
    let operations: Vec<_> = trail.iter().map(|r| r.operation.as_str()).collect();
    assert_eq!(operations, ["SUBMIT_APPROVAL", "APPROVE_REQUEST"]);
}

#[tokio::test]
async fn test_amount_above_limit_escalates_to_controller() {
    let ledger = setup().await;
    let c = ledger.chart;
    let clerk = actor(Role::Clerk);
    let approver = actor(Role::Approver).with_approval_limit(money(10_000));
    let controller = actor(Role::Controller);
    let approvals = ledger.store.approvals();

    let sale = event("INV-2002", today(), c.receivables, c.sales, 50_000);
    let request = approvals.create_request(&clerk, &sale).await.unwrap();
    let id = request_id(&request);
    approvals.submit(&clerk, id).await.unwrap();

    let outcome = approvals.approve(&approver, id, None).await.unwrap();
    let ApprovalOutcome::Escalated(escalated) = outcome else {
        panic!("expected escalation");
    };
    assert_eq!(ApprovalStatus::from(escalated.status), ApprovalStatus::Escalated);
    assert!(escalated.journal_entry_id.is_none());
    assert_eq!(balance(&ledger, c.receivables).await, 0);

    let waiting = approvals.list_awaiting_decision().await.unwrap();
    assert_eq!(waiting.len(), 1);

    let err = approvals.approve(&approver, id, None).await.unwrap_err();
    assert!(matches!(
        err.as_ledger(),
        Some(LedgerError::InsufficientPermission { .. })
    ));

    let outcome = approvals.approve(&controller, id, None).await.unwrap();
    assert!(matches!(outcome, ApprovalOutcome::Approved { .. }));
    assert_eq!(balance(&ledger, c.receivables).await, 50_000);
    assert!(approvals.list_awaiting_decision().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reject_requires_reason_and_is_final() {
    let ledger = setup().await;
    let c = ledger.chart;
    let clerk = actor(Role::Clerk);
    let approver = actor(Role::Approver);
    let approvals = ledger.store.approvals();

    let sale = event("INV-2003", today(), c.receivables, c.sales, 800);
    let request = approvals.create_request(&clerk, &sale).await.unwrap();
    let id = request_id(&request);
    approvals.submit(&clerk, id).await.unwrap();

    let err = approvals.reject(&approver, id, "   ").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Approval(ApprovalError::RejectionReasonRequired)
    ));

    let rejected = approvals.reject(&approver, id, "wrong price").await.unwrap();
    assert_eq!(ApprovalStatus::from(rejected.status), ApprovalStatus::Rejected);
    assert_eq!(rejected.decision_note.as_deref(), Some("wrong price"));

    let err = approvals.approve(&approver, id, None).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Approval(ApprovalError::InvalidTransition { .. })
    ));
    assert_eq!(balance(&ledger, c.receivables).await, 0);
}

#[tokio::test]
async fn test_draft_request_cannot_be_decided() {
    let ledger = setup().await;
    let c = ledger.chart;
    let clerk = actor(Role::Clerk);
    let approvals = ledger.store.approvals();

    let sale = event("INV-2004", today(), c.receivables, c.sales, 800);
    let request = approvals.create_request(&clerk, &sale).await.unwrap();

    let err = approvals
        .approve(&actor(Role::Controller), request_id(&request), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Approval(ApprovalError::InvalidTransition { .. })
    ));

    let err = approvals.submit(&actor(Role::Viewer), request_id(&request)).await.unwrap_err();
    assert!(matches!(
        err.as_ledger(),
        Some(LedgerError::InsufficientPermission { .. })
    ));
}

#[tokio::test]
async fn test_invalid_event_is_rejected_up_front() {
    let ledger = setup().await;
    let c = ledger.chart;
    let mut sale = event("INV-2005", today(), c.current_assets, c.sales, 800);

    let err = ledger
        .store
        .approvals()
        .create_request(&actor(Role::Clerk), &sale)
        .await
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Validation { .. })));

    sale.reference_id = "  ".to_string();
    sale.lines[0].account_id = c.receivables;
    let err = ledger
        .store
        .approvals()
        .create_request(&actor(Role::Clerk), &sale)
        .await
        .unwrap_err();
    assert!(matches!(err.as_ledger(), Some(LedgerError::Validation { .. })));
}

#[tokio::test]
async fn test_approval_of_already_posted_reference_rolls_back() {
    let ledger = setup().await;
    let c = ledger.chart;
    let clerk = actor(Role::Clerk);
    let approver = actor(Role::Approver);
    let approvals = ledger.store.approvals();

    let sale = event("INV-2006", today(), c.receivables, c.sales, 300);
    let request = approvals.create_request(&clerk, &sale).await.unwrap();
    let id = request_id(&request);
    approvals.submit(&clerk, id).await.unwrap();

    let direct = ledger
        .store
        .journal()
        .post_business_event(&approver, &sale)
        .await
        .unwrap();

    let err = approvals.approve(&approver, id, None).await.unwrap_err();
    assert!(matches!(
        err.as_ledger(),
        Some(LedgerError::DuplicateReference { .. })
    ));

    let still_pending = approvals.get(id).await.unwrap();
    assert_eq!(
        ApprovalStatus::from(still_pending.status),
        ApprovalStatus::PendingApproval
    );
    assert!(still_pending.journal_entry_id.is_none());
    assert_eq!(balance(&ledger, c.receivables).await, 300);

    let entry = ledger
        .store
        .journal()
        .get(JournalEntryId::from_uuid(direct.entry.id))
        .await
        .unwrap();
    assert_eq!(entry.status(), EntryStatus::Posted);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let ledger = setup().await;

    let err = ledger
        .store
        .approvals()
        .submit(&actor(Role::Clerk), ApprovalRequestId::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Approval(ApprovalError::RequestNotFound(_))
    ));
}
