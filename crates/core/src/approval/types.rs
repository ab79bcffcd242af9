//! Approval domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use erp_ledger_shared::types::UserId;
use serde::{Deserialize, Serialize};

/// Status of an approval request.
///
/// Valid transitions:
/// - Draft → PendingApproval (submit)
/// - PendingApproval → Approved | Rejected (decide within limit)
/// - PendingApproval → Escalated (approve above the approver's limit)
/// - Escalated → Approved | Rejected (controller decides)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Being prepared by the requester.
    Draft,
    /// Waiting for an approver.
    PendingApproval,
    /// Waiting for a controller.
    Escalated,
    /// Approved and posted.
    Approved,
    /// Rejected (terminal).
    Rejected,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Escalated => "ESCALATED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "PENDING_APPROVAL" => Some(Self::PendingApproval),
            "ESCALATED" => Some(Self::Escalated),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if a decision is awaited.
    #[must_use]
    pub const fn awaits_decision(&self) -> bool {
        matches!(self, Self::PendingApproval | Self::Escalated)
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated approval transition with its audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalAction {
    /// Draft submitted.
    Submit {
        /// Resulting status.
        new_status: ApprovalStatus,
        /// Submitter.
        submitted_by: UserId,
        /// When.
        submitted_at: DateTime<Utc>,
    },
    /// Amount exceeds the approver's limit; a controller must decide.
    Escalate {
        /// Resulting status.
        new_status: ApprovalStatus,
        /// Approver who escalated.
        escalated_by: UserId,
        /// When.
        escalated_at: DateTime<Utc>,
    },
    /// Approved; the business event must now be posted.
    Approve {
        /// Resulting status.
        new_status: ApprovalStatus,
        /// Approver.
        approved_by: UserId,
        /// When.
        approved_at: DateTime<Utc>,
        /// Optional note.
        note: Option<String>,
    },
    /// Rejected.
    Reject {
        /// Resulting status.
        new_status: ApprovalStatus,
        /// Rejector.
        rejected_by: UserId,
        /// When.
        rejected_at: DateTime<Utc>,
        /// Mandatory reason.
        reason: String,
    },
}

impl ApprovalAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> ApprovalStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Escalate { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. } => *new_status,
        }
    }

    /// True if this action requires posting the business event.
    #[must_use]
    pub const fn posts_entry(&self) -> bool {
        matches!(self, Self::Approve { .. })
    }
}
