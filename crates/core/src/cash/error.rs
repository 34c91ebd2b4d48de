//! Cash orchestration error types.

use corebank_shared::AppError;
use corebank_shared::types::{BranchId, CashRequestId, ReversalRequestId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::types::CashRequestKind;
use crate::ledger::LedgerError;
use crate::store::StoreError;
use crate::workflow::WorkflowError;

/// Errors raised by the cash movement handlers.
#[derive(Debug, Error)]
pub enum CashError {
    /// The operation is reserved to head-office users.
    #[error("Only head office can {0}")]
    HeadOfficeRequired(&'static str),

    /// The user is attached to another branch.
    #[error("User {user_id} cannot act for branch {branch_id}")]
    BranchNotAuthorized {
        /// Acting user.
        user_id: UserId,
        /// Branch the operation targets.
        branch_id: BranchId,
    },

    /// Cash request not found.
    #[error("Cash request not found: {0}")]
    RequestNotFound(CashRequestId),

    /// Reversal request not found.
    #[error("Reversal request not found: {0}")]
    ReversalRequestNotFound(ReversalRequestId),

    /// The request is of another kind than the handler expects.
    #[error("Cash request {id} is a {actual} request, expected {expected}")]
    WrongRequestKind {
        /// Request id.
        id: CashRequestId,
        /// Kind the handler expects.
        expected: CashRequestKind,
        /// Kind of the stored request.
        actual: CashRequestKind,
    },

    /// Approval granted more than was asked for.
    #[error("The approved amount cannot exceed the requested amount ({approved} > {requested})")]
    ApprovedAmountExceedsRequested {
        /// Amount granted.
        approved: Decimal,
        /// Amount asked for.
        requested: Decimal,
    },

    /// No source/destination accounts are mapped for the event at the branch.
    #[error("No cash movement accounts for event {event_code} at branch {branch_id}")]
    MappingNotFound {
        /// Event code looked up.
        event_code: String,
        /// Branch looked up.
        branch_id: BranchId,
    },

    /// A reversal of the reference is already awaiting a decision.
    #[error("A reversal of {0} is already in progress")]
    ReversalInProgress(String),

    /// Ledger failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Workflow transition failure.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

impl From<StoreError> for CashError {
    fn from(err: StoreError) -> Self {
        Self::Ledger(err.into())
    }
}

impl CashError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::HeadOfficeRequired(_) => "HEAD_OFFICE_REQUIRED",
            Self::BranchNotAuthorized { .. } => "BRANCH_NOT_AUTHORIZED",
            Self::RequestNotFound(_) => "CASH_REQUEST_NOT_FOUND",
            Self::ReversalRequestNotFound(_) => "REVERSAL_REQUEST_NOT_FOUND",
            Self::WrongRequestKind { .. } => "WRONG_REQUEST_KIND",
            Self::ApprovedAmountExceedsRequested { .. } => "APPROVED_AMOUNT_EXCEEDS_REQUESTED",
            Self::MappingNotFound { .. } => "CASH_MOVEMENT_MAPPING_NOT_FOUND",
            Self::ReversalInProgress(_) => "REVERSAL_IN_PROGRESS",
            Self::Ledger(err) => err.error_code(),
            Self::Workflow(err) => err.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::HeadOfficeRequired(_) | Self::BranchNotAuthorized { .. } => 403,
            Self::RequestNotFound(_)
            | Self::ReversalRequestNotFound(_)
            | Self::MappingNotFound { .. } => 404,
            Self::WrongRequestKind { .. } | Self::ApprovedAmountExceedsRequested { .. } => 400,
            Self::ReversalInProgress(_) => 409,
            Self::Ledger(err) => err.http_status_code(),
            Self::Workflow(err) => err.http_status_code(),
        }
    }
}

impl From<CashError> for AppError {
    fn from(err: CashError) -> Self {
        match err {
            CashError::Ledger(err) => err.into(),
            CashError::Workflow(err) => err.into(),
            CashError::HeadOfficeRequired(_) | CashError::BranchNotAuthorized { .. } => {
                Self::Forbidden(err.to_string())
            }
            CashError::RequestNotFound(_)
            | CashError::ReversalRequestNotFound(_)
            | CashError::MappingNotFound { .. } => Self::NotFound(err.to_string()),
            CashError::WrongRequestKind { .. } | CashError::ApprovedAmountExceedsRequested { .. } => {
                Self::Validation(err.to_string())
            }
            CashError::ReversalInProgress(_) => Self::Conflict(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_message_is_user_facing() {
        let err = CashError::ApprovedAmountExceedsRequested {
            approved: dec!(150),
            requested: dec!(100),
        };
        assert_eq!(
            err.to_string(),
            "The approved amount cannot exceed the requested amount (150 > 100)"
        );
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_wrapped_errors_keep_their_codes() {
        let err = CashError::from(LedgerError::DuplicateReference("R-2".into()));
        assert_eq!(err.error_code(), "DUPLICATE_REFERENCE");
        assert_eq!(err.http_status_code(), 409);

        let err = CashError::from(StoreError::Cancelled);
        assert!(matches!(err, CashError::Ledger(LedgerError::Cancelled)));
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = CashError::HeadOfficeRequired("approve replenishments").into();
        assert!(matches!(app, AppError::Forbidden(_)));

        let app: AppError = CashError::from(LedgerError::DuplicateReference("R-2".into())).into();
        assert!(matches!(app, AppError::Conflict(_)));
    }
}
