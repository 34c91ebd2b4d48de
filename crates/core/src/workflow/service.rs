//! Workflow service for approval and reversal state transitions.
//!
//! Pure state machine logic; persisting the resulting state is the caller's
//! unit of work.

use chrono::Utc;
use corebank_shared::types::UserId;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{ApprovalStatus, RedirectTarget, ReversalAction, ReversalState};

/// Stateless service for managing workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    // ========== Reversal state machine ==========

    /// Request the reversal of a posted movement.
    ///
    /// # Errors
    ///
    /// - `InvalidReversalTransition` unless the reference is `Posted`
    /// - `ReversalReasonRequired` if the reason is blank
    pub fn request_reversal(
        current_state: ReversalState,
        issued_by: UserId,
        reason: &str,
    ) -> Result<ReversalAction, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::ReversalReasonRequired);
        }

        match current_state {
            ReversalState::Posted => Ok(ReversalAction::Request {
                new_state: ReversalState::ReversalRequested,
                issued_by,
                requested_at: Utc::now(),
            }),
            _ => Err(WorkflowError::InvalidReversalTransition {
                from: current_state,
                to: ReversalState::ReversalRequested,
            }),
        }
    }

    /// Approve a requested reversal.
    ///
    /// # Errors
    ///
    /// - `InvalidReversalTransition` unless the request is `ReversalRequested`
    /// - `SelfApprovalForbidden` if the approver issued the request
    pub fn approve_reversal(
        current_state: ReversalState,
        issued_by: UserId,
        approved_by: UserId,
    ) -> Result<ReversalAction, WorkflowError> {
        if current_state != ReversalState::ReversalRequested {
            return Err(WorkflowError::InvalidReversalTransition {
                from: current_state,
                to: ReversalState::ReversalApproved,
            });
        }
        if issued_by == approved_by {
            return Err(WorkflowError::SelfApprovalForbidden(approved_by));
        }

        Ok(ReversalAction::Approve {
            new_state: ReversalState::ReversalApproved,
            approved_by,
            approved_at: Utc::now(),
        })
    }

    /// Reject a requested reversal. Terminal: no reversal occurs.
    ///
    /// # Errors
    ///
    /// - `InvalidReversalTransition` unless the request is `ReversalRequested`
    /// - `RejectionReasonRequired` if the reason is blank
    pub fn reject_reversal(
        current_state: ReversalState,
        rejected_by: UserId,
        reason: String,
    ) -> Result<ReversalAction, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::RejectionReasonRequired);
        }

        match current_state {
            ReversalState::ReversalRequested => Ok(ReversalAction::Reject {
                new_state: ReversalState::Rejected,
                rejected_by,
                reason,
            }),
            _ => Err(WorkflowError::InvalidReversalTransition {
                from: current_state,
                to: ReversalState::Rejected,
            }),
        }
    }

    /// Mark an approved reversal as posted.
    ///
    /// # Errors
    ///
    /// `InvalidReversalTransition` unless the request is `ReversalApproved`.
    pub fn complete_reversal(current_state: ReversalState) -> Result<ReversalAction, WorkflowError> {
        match current_state {
            ReversalState::ReversalApproved => Ok(ReversalAction::Complete {
                new_state: ReversalState::Reversed,
                reversed_at: Utc::now(),
            }),
            _ => Err(WorkflowError::InvalidReversalTransition {
                from: current_state,
                to: ReversalState::Reversed,
            }),
        }
    }

    // ========== Cash request approvals ==========

    /// Approve an open request.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalTransition` unless the request is open.
    pub fn approve(current: ApprovalStatus) -> Result<ApprovalStatus, WorkflowError> {
        Self::from_open(current, ApprovalStatus::Approved)
    }

    /// Reject an open request.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalTransition` unless the request is open.
    pub fn reject(current: ApprovalStatus) -> Result<ApprovalStatus, WorkflowError> {
        Self::from_open(current, ApprovalStatus::Rejected)
    }

    /// Route a pending request to a branch department.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalTransition` unless the request is `Pending`.
    pub fn redirect(
        current: ApprovalStatus,
        target: RedirectTarget,
    ) -> Result<ApprovalStatus, WorkflowError> {
        let to = ApprovalStatus::RedirectToBranch(target);
        match current {
            ApprovalStatus::Pending => Ok(to),
            _ => Err(WorkflowError::InvalidApprovalTransition { from: current, to }),
        }
    }

    /// Close an approved request once its movement is posted.
    ///
    /// # Errors
    ///
    /// `InvalidApprovalTransition` unless the request is `Approved`.
    pub fn complete(current: ApprovalStatus) -> Result<ApprovalStatus, WorkflowError> {
        match current {
            ApprovalStatus::Approved => Ok(ApprovalStatus::Completed),
            _ => Err(WorkflowError::InvalidApprovalTransition {
                from: current,
                to: ApprovalStatus::Completed,
            }),
        }
    }

    fn from_open(
        current: ApprovalStatus,
        to: ApprovalStatus,
    ) -> Result<ApprovalStatus, WorkflowError> {
        if current.is_open() {
            Ok(to)
        } else {
            Err(WorkflowError::InvalidApprovalTransition { from: current, to })
        }
    }
}
