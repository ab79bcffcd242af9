//! Roles, capabilities and the single permission check.
//!
//! Every ledger mutation receives an [`Actor`] and calls [`authorize`] before
//! touching state. Roles are ordered from lowest to highest privilege; a
//! higher role can perform every action of a lower one.

use std::fmt;

use erp_ledger_shared::types::{Money, UserId};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// User role in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Read-only access.
    Viewer = 0,
    /// Keys in drafts and submits approval requests.
    Clerk = 1,
    /// Posts entries and decides approvals within their limit.
    Approver = 2,
    /// Reverses entries and closes periods.
    Accountant = 3,
    /// Reopens and locks periods, repairs balances, decides escalations.
    Controller = 4,
    /// Full access.
    Admin = 5,
}

impl Role {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Clerk => "CLERK",
            Self::Approver => "APPROVER",
            Self::Accountant => "ACCOUNTANT",
            Self::Controller => "CONTROLLER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "VIEWER" => Some(Self::Viewer),
            "CLERK" => Some(Self::Clerk),
            "APPROVER" => Some(Self::Approver),
            "ACCOUNTANT" => Some(Self::Accountant),
            "CONTROLLER" => Some(Self::Controller),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Returns true if this role has the capability.
    #[must_use]
    pub fn can(self, capability: Capability) -> bool {
        self >= capability.minimum_role()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something an actor may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Read entries, balances and periods.
    ViewLedger,
    /// Create, edit and discard drafts.
    CreateEntry,
    /// Post a draft.
    PostEntry,
    /// Reverse a posted entry.
    ReverseEntry,
    /// Close an accounting period.
    ClosePeriod,
    /// Reopen a closed period.
    ReopenPeriod,
    /// Lock a closed period permanently.
    LockPeriod,
    /// Overwrite drifted stored balances.
    RepairBalances,
    /// Submit a business event for approval.
    SubmitApproval,
    /// Approve or reject a pending request.
    DecideApproval,
    /// Approve or reject a request above an approver's limit.
    DecideEscalated,
}

impl Capability {
    /// Lowest role holding this capability.
    #[must_use]
    pub const fn minimum_role(self) -> Role {
        match self {
            Self::ViewLedger => Role::Viewer,
            Self::CreateEntry | Self::SubmitApproval => Role::Clerk,
            Self::PostEntry | Self::DecideApproval => Role::Approver,
            Self::ReverseEntry | Self::ClosePeriod => Role::Accountant,
            Self::ReopenPeriod | Self::LockPeriod | Self::RepairBalances | Self::DecideEscalated => {
                Role::Controller
            }
        }
    }

    /// Returns the string representation of the capability.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ViewLedger => "view the ledger",
            Self::CreateEntry => "create entries",
            Self::PostEntry => "post entries",
            Self::ReverseEntry => "reverse entries",
            Self::ClosePeriod => "close periods",
            Self::ReopenPeriod => "reopen periods",
            Self::LockPeriod => "lock periods",
            Self::RepairBalances => "repair balances",
            Self::SubmitApproval => "submit approvals",
            Self::DecideApproval => "decide approvals",
            Self::DecideEscalated => "decide escalated approvals",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user performing a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id, recorded on entries and audit rows.
    pub user_id: UserId,
    /// Role used for the permission check.
    pub role: Role,
    /// Largest amount this actor may approve. `None` means unlimited.
    pub approval_limit: Option<Money>,
}

impl Actor {
    /// Creates an actor without an approval limit.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            approval_limit: None,
        }
    }

    /// Sets the approval limit.
    #[must_use]
    pub const fn with_approval_limit(mut self, limit: Money) -> Self {
        self.approval_limit = Some(limit);
        self
    }

    /// Returns true if the actor may approve `amount` without escalation.
    ///
    /// Controllers and admins are never limited.
    #[must_use]
    pub fn within_approval_limit(&self, amount: Money) -> bool {
        if self.role.can(Capability::DecideEscalated) {
            return true;
        }
        self.approval_limit.is_none_or(|limit| amount <= limit)
    }
}

/// The one permission check used by every mutation.
///
/// # Errors
///
/// Returns `LedgerError::InsufficientPermission` if the actor's role lacks
/// the capability.
pub fn authorize(actor: &Actor, capability: Capability) -> Result<(), LedgerError> {
    if actor.role.can(capability) {
        Ok(())
    } else {
        Err(LedgerError::InsufficientPermission {
            role: actor.role.to_string(),
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    #[rstest]
    #[case(Role::Viewer, Capability::ViewLedger, true)]
    #[case(Role::Viewer, Capability::CreateEntry, false)]
    #[case(Role::Clerk, Capability::CreateEntry, true)]
    #[case(Role::Clerk, Capability::PostEntry, false)]
    #[case(Role::Approver, Capability::PostEntry, true)]
    #[case(Role::Approver, Capability::ReverseEntry, false)]
    #[case(Role::Accountant, Capability::ClosePeriod, true)]
    #[case(Role::Accountant, Capability::ReopenPeriod, false)]
    #[case(Role::Controller, Capability::LockPeriod, true)]
    #[case(Role::Controller, Capability::RepairBalances, true)]
    #[case(Role::Admin, Capability::DecideEscalated, true)]
    fn test_capability_matrix(#[case] role: Role, #[case] capability: Capability, #[case] allowed: bool) {
        assert_eq!(authorize(&actor(role), capability).is_ok(), allowed);
    }

    #[test]
    fn test_denied_error_names_role_and_capability() {
        let err = authorize(&actor(Role::Clerk), Capability::ClosePeriod).unwrap_err();
        assert_eq!(err.to_string(), "Role CLERK is not allowed to close periods");
        assert_eq!(err.http_status_code(), 403);
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Viewer < Role::Clerk);
        assert!(Role::Accountant < Role::Controller);
        assert!(Role::Controller < Role::Admin);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("approver"), Some(Role::Approver));
        assert_eq!(Role::parse("CONTROLLER"), Some(Role::Controller));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_approval_limit() {
        let approver = actor(Role::Approver).with_approval_limit(Money::from_minor(100_000));
        assert!(approver.within_approval_limit(Money::from_minor(100_000)));
        assert!(!approver.within_approval_limit(Money::from_minor(100_001)));

        let unlimited = actor(Role::Approver);
        assert!(unlimited.within_approval_limit(Money::from_minor(i64::MAX)));

        let controller = actor(Role::Controller).with_approval_limit(Money::ZERO);
        assert!(controller.within_approval_limit(Money::from_minor(1)));
    }
}
