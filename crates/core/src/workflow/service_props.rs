//! Property-based tests for WorkflowService.

use corebank_shared::types::UserId;
use proptest::prelude::*;
use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{ApprovalStatus, RedirectTarget, ReversalState};

fn arb_reversal_state() -> impl Strategy<Value = ReversalState> {
    prop_oneof![
        Just(ReversalState::Posted),
        Just(ReversalState::ReversalRequested),
        Just(ReversalState::ReversalApproved),
        Just(ReversalState::Reversed),
        Just(ReversalState::Rejected),
    ]
}

fn arb_target() -> impl Strategy<Value = RedirectTarget> {
    prop_oneof![
        Just(RedirectTarget::Bco),
        Just(RedirectTarget::Btb),
        Just(RedirectTarget::Bd),
    ]
}

fn arb_approval_status() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Pending),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
        Just(ApprovalStatus::Completed),
        arb_target().prop_map(ApprovalStatus::RedirectToBranch),
    ]
}

fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 5: Self-Approval Rejection
    // =========================================================================

    /// Property 5.1: An issuer can never approve their own reversal.
    #[test]
    fn prop_self_approval_always_rejected(
        state in arb_reversal_state(),
        user in arb_user(),
    ) {
        let result = WorkflowService::approve_reversal(state, user, user);
        prop_assert!(result.is_err());
        if state == ReversalState::ReversalRequested {
            prop_assert!(matches!(result, Err(WorkflowError::SelfApprovalForbidden(_))));
        }
    }

    /// Property 5.2: A distinct approver succeeds exactly from ReversalRequested.
    #[test]
    fn prop_distinct_approver_needs_requested_state(
        state in arb_reversal_state(),
        issuer in arb_user(),
        approver in arb_user(),
    ) {
        prop_assume!(issuer != approver);
        let result = WorkflowService::approve_reversal(state, issuer, approver);
        prop_assert_eq!(result.is_ok(), state == ReversalState::ReversalRequested);
    }

    // =========================================================================
    // Property 6: Terminal States
    // =========================================================================

    /// Property 6.1: No transition leaves a terminal reversal state.
    #[test]
    fn prop_terminal_states_stay_terminal(
        state in prop_oneof![Just(ReversalState::Reversed), Just(ReversalState::Rejected)],
        a in arb_user(),
        b in arb_user(),
    ) {
        prop_assert!(WorkflowService::request_reversal(state, a, "reason").is_err());
        prop_assert!(WorkflowService::approve_reversal(state, a, b).is_err());
        prop_assert!(WorkflowService::reject_reversal(state, b, "reason".into()).is_err());
        prop_assert!(WorkflowService::complete_reversal(state).is_err());
    }

    /// Property 6.2: Only open cash requests can be approved or rejected.
    #[test]
    fn prop_only_open_requests_decided(status in arb_approval_status()) {
        prop_assert_eq!(WorkflowService::approve(status).is_ok(), status.is_open());
        prop_assert_eq!(WorkflowService::reject(status).is_ok(), status.is_open());
    }

    /// Property 6.3: Status strings survive storage.
    #[test]
    fn prop_approval_status_round_trips(status in arb_approval_status()) {
        prop_assert_eq!(ApprovalStatus::parse(status.as_str()), Some(status));
    }
}
