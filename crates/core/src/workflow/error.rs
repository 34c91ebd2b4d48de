//! Workflow error types for approvals and reversals.

use corebank_shared::AppError;
use corebank_shared::types::UserId;
use thiserror::Error;

use crate::workflow::types::{ApprovalStatus, ReversalState};

/// Errors that can occur during workflow transitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted an invalid reversal transition.
    #[error("Invalid reversal transition from {from} to {to}")]
    InvalidReversalTransition {
        /// The current state.
        from: ReversalState,
        /// The attempted target state.
        to: ReversalState,
    },

    /// Attempted an invalid approval transition.
    #[error("Invalid approval transition from {from} to {to}")]
    InvalidApprovalTransition {
        /// The current status.
        from: ApprovalStatus,
        /// The attempted target status.
        to: ApprovalStatus,
    },

    /// The approver issued the request.
    #[error("User {0} cannot approve a reversal they issued")]
    SelfApprovalForbidden(UserId),

    /// A reversal request must state why.
    #[error("Reversal reason is required")]
    ReversalReasonRequired,

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::ReversalReasonRequired | Self::RejectionReasonRequired => 400,
            Self::SelfApprovalForbidden(_) => 403,
            Self::InvalidReversalTransition { .. } | Self::InvalidApprovalTransition { .. } => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidReversalTransition { .. } | Self::InvalidApprovalTransition { .. } => {
                "INVALID_TRANSITION"
            }
            Self::SelfApprovalForbidden(_) => "SELF_APPROVAL_FORBIDDEN",
            Self::ReversalReasonRequired => "REVERSAL_REASON_REQUIRED",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        let message = err.to_string();
        match err {
            WorkflowError::ReversalReasonRequired | WorkflowError::RejectionReasonRequired => {
                Self::Validation(message)
            }
            WorkflowError::SelfApprovalForbidden(_) => Self::Forbidden(message),
            WorkflowError::InvalidReversalTransition { .. }
            | WorkflowError::InvalidApprovalTransition { .. } => Self::Conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = WorkflowError::InvalidReversalTransition {
            from: ReversalState::Rejected,
            to: ReversalState::ReversalApproved,
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("rejected"));
        assert!(err.to_string().contains("reversal_approved"));
    }

    #[test]
    fn test_invalid_approval_transition_error() {
        let err = WorkflowError::InvalidApprovalTransition {
            from: ApprovalStatus::Completed,
            to: ApprovalStatus::Approved,
        };
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("completed"));
    }

    #[test]
    fn test_self_approval_error() {
        let err = WorkflowError::SelfApprovalForbidden(UserId::new());
        assert_eq!(err.http_status_code(), 403);
        assert_eq!(err.error_code(), "SELF_APPROVAL_FORBIDDEN");

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 403);
    }

    #[test]
    fn test_reason_required_errors() {
        assert_eq!(WorkflowError::RejectionReasonRequired.http_status_code(), 400);
        assert_eq!(
            WorkflowError::ReversalReasonRequired.error_code(),
            "REVERSAL_REASON_REQUIRED"
        );
    }
}
