//! Approval state machine.
//!
//! Stateless: each method checks the actor and the current status and
//! returns the [`ApprovalAction`] to persist. Posting the approved business
//! event is the caller's job, inside the same transaction.

use chrono::Utc;
use erp_ledger_shared::types::Money;

use crate::approval::error::ApprovalError;
use crate::approval::types::{ApprovalAction, ApprovalStatus};
use crate::auth::{Actor, Capability, authorize};

/// Stateless service for approval transitions.
pub struct ApprovalWorkflow;

impl ApprovalWorkflow {
    /// Submit a draft request for approval.
    ///
    /// # Errors
    ///
    /// - `Ledger(InsufficientPermission)` without `SubmitApproval`
    /// - `InvalidTransition` unless the request is a draft
    pub fn submit(actor: &Actor, current: ApprovalStatus) -> Result<ApprovalAction, ApprovalError> {
        authorize(actor, Capability::SubmitApproval)?;

        match current {
            ApprovalStatus::Draft => Ok(ApprovalAction::Submit {
                new_status: ApprovalStatus::PendingApproval,
                submitted_by: actor.user_id,
                submitted_at: Utc::now(),
            }),
            _ => Err(ApprovalError::InvalidTransition {
                from: current,
                to: ApprovalStatus::PendingApproval,
            }),
        }
    }

    /// Approve a pending or escalated request.
    ///
    /// A pending request above the actor's approval limit is escalated
    /// instead of approved. Escalated requests need `DecideEscalated`.
    ///
    /// # Errors
    ///
    /// - `Ledger(InsufficientPermission)` if the actor may not decide
    /// - `InvalidTransition` unless the request awaits a decision
    pub fn approve(
        actor: &Actor,
        current: ApprovalStatus,
        amount: Money,
        note: Option<String>,
    ) -> Result<ApprovalAction, ApprovalError> {
        match current {
            ApprovalStatus::PendingApproval => {
                authorize(actor, Capability::DecideApproval)?;
                if actor.within_approval_limit(amount) {
                    Ok(Self::approved(actor, note))
                } else {
                    Ok(ApprovalAction::Escalate {
                        new_status: ApprovalStatus::Escalated,
                        escalated_by: actor.user_id,
                        escalated_at: Utc::now(),
                    })
                }
            }
            ApprovalStatus::Escalated => {
                authorize(actor, Capability::DecideEscalated)?;
                Ok(Self::approved(actor, note))
            }
            _ => Err(ApprovalError::InvalidTransition {
                from: current,
                to: ApprovalStatus::Approved,
            }),
        }
    }

    /// Reject a pending or escalated request.
    ///
    /// # Errors
    ///
    /// - `RejectionReasonRequired` for a blank reason
    /// - `Ledger(InsufficientPermission)` if the actor may not decide
    /// - `InvalidTransition` unless the request awaits a decision
    pub fn reject(
        actor: &Actor,
        current: ApprovalStatus,
        reason: &str,
    ) -> Result<ApprovalAction, ApprovalError> {
        if reason.trim().is_empty() {
            return Err(ApprovalError::RejectionReasonRequired);
        }

        let capability = match current {
            ApprovalStatus::PendingApproval => Capability::DecideApproval,
            ApprovalStatus::Escalated => Capability::DecideEscalated,
            _ => {
                return Err(ApprovalError::InvalidTransition {
                    from: current,
                    to: ApprovalStatus::Rejected,
                });
            }
        };
        authorize(actor, capability)?;

        Ok(ApprovalAction::Reject {
            new_status: ApprovalStatus::Rejected,
            rejected_by: actor.user_id,
            rejected_at: Utc::now(),
            reason: reason.trim().to_string(),
        })
    }

    fn approved(actor: &Actor, note: Option<String>) -> ApprovalAction {
        ApprovalAction::Approve {
            new_status: ApprovalStatus::Approved,
            approved_by: actor.user_id,
            approved_at: Utc::now(),
            note,
        }
    }
}
