//! Property-based tests for the approval state machine.

use proptest::prelude::*;
use erp_ledger_shared::types::{Money, UserId};

use crate::approval::service::ApprovalWorkflow;
use crate::approval::types::ApprovalStatus;
use crate::auth::{Actor, Role};

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Viewer),
        Just(Role::Clerk),
        Just(Role::Approver),
        Just(Role::Accountant),
        Just(Role::Controller),
        Just(Role::Admin),
    ]
}

fn arb_status() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Draft),
        Just(ApprovalStatus::PendingApproval),
        Just(ApprovalStatus::Escalated),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
    ]
}

fn arb_amount() -> impl Strategy<Value = Money> {
    (1i64..1_000_000_000).prop_map(Money::from_minor)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Final states never transition again, whoever asks.
    #[test]
    fn prop_final_states_are_terminal(
        role in arb_role(),
        amount in arb_amount(),
        status in prop_oneof![Just(ApprovalStatus::Approved), Just(ApprovalStatus::Rejected)],
    ) {
        let actor = Actor::new(UserId::new(), role);
        prop_assert!(ApprovalWorkflow::submit(&actor, status).is_err());
        prop_assert!(ApprovalWorkflow::approve(&actor, status, amount, None).is_err());
        prop_assert!(ApprovalWorkflow::reject(&actor, status, "reason").is_err());
    }

    /// An approver never approves above their limit; they escalate.
    #[test]
    fn prop_limit_is_respected(
        limit in arb_amount(),
        amount in arb_amount(),
    ) {
        let approver = Actor::new(UserId::new(), Role::Approver).with_approval_limit(limit);
        let action = ApprovalWorkflow::approve(&approver, ApprovalStatus::PendingApproval, amount, None).unwrap();

        if amount <= limit {
            prop_assert_eq!(action.new_status(), ApprovalStatus::Approved);
        } else {
            prop_assert_eq!(action.new_status(), ApprovalStatus::Escalated);
        }
    }

    /// Only the Approve action asks for a posting, and only from a state
    /// awaiting a decision.
    #[test]
    fn prop_posting_only_from_decision_states(
        role in arb_role(),
        status in arb_status(),
        amount in arb_amount(),
    ) {
        let actor = Actor::new(UserId::new(), role);
        if let Ok(action) = ApprovalWorkflow::approve(&actor, status, amount, None) {
            prop_assert!(status.awaits_decision());
            if action.posts_entry() {
                prop_assert_eq!(action.new_status(), ApprovalStatus::Approved);
            }
        }
    }
}
