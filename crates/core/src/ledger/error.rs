//! Ledger error types for posting, validation and reversal.
//!
//! Validation errors are raised before anything is written. `UnbalancedBatch`
//! is raised after the batch is built but before commit; the caller discards
//! the whole batch. Storage failures surface as `Storage` and are never
//! retried by the ledger itself.

use corebank_shared::AppError;
use corebank_shared::types::{AccountId, AccountingEntryId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Movement amount must be strictly positive and fit the ledger scale.
    #[error(
        "Invalid amount {0}: a movement amount must be greater than zero with at most 4 decimal places"
    )]
    InvalidAmount(Decimal),

    /// Reference id is blank.
    #[error("Reference id cannot be empty")]
    EmptyReference,

    /// Reference id uses the prefix reserved for reversal batches.
    #[error("Reference {0} uses the prefix reserved for reversals")]
    ReservedReference(String),

    /// Event code is blank.
    #[error("Invalid event code: {0:?}")]
    InvalidEventCode(String),

    /// Debit and credit side resolve to the same account.
    #[error("Debit and credit account must differ, both are {0}")]
    IdenticalAccounts(AccountId),

    /// Both legs of a movement must share one currency.
    #[error("Currency mismatch: debit account is {debit}, credit account is {credit}")]
    CurrencyMismatch {
        /// Currency of the debit-side account.
        debit: String,
        /// Currency of the credit-side account.
        credit: String,
    },

    /// An inter-branch movement was posted without liaison accounts.
    #[error("Inter-branch movement {0} requires liaison accounts for both branches")]
    SettlementAccountsRequired(String),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is closed or soft-deleted.
    #[error("Account {0} is closed")]
    AccountClosed(AccountId),

    // ========== Double-Entry Errors ==========
    /// Reference id has already been posted.
    #[error("Reference {0} has already been posted")]
    DuplicateReference(String),

    /// A batch needs at least one debit and one credit leg.
    #[error("A batch must contain at least 2 entries")]
    InsufficientEntries,

    /// Debits and credits of a reference do not match.
    #[error("Batch {reference} is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedBatch {
        /// Reference of the offending group.
        reference: String,
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Debit/credit amount columns disagree with the entry type.
    #[error("Entry {0} has amounts inconsistent with its entry type")]
    InconsistentEntry(AccountingEntryId),

    // ========== Reversal Errors ==========
    /// Nothing was ever posted under this reference.
    #[error("No entries found for reference {0}")]
    ReferenceNotFound(String),

    /// The approver of a reversal issued it.
    #[error("User {0} cannot approve a reversal they issued")]
    SelfApprovalForbidden(UserId),

    /// The reference has already been reversed.
    #[error("Reference {0} has already been reversed")]
    AlreadyReversed(String),

    // ========== Infrastructure Errors ==========
    /// The operation was cancelled before commit.
    #[error("Operation cancelled before commit")]
    Cancelled,

    /// Storage failure (connection loss, constraint violation, ...).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::EmptyReference => "EMPTY_REFERENCE",
            Self::ReservedReference(_) => "RESERVED_REFERENCE",
            Self::InvalidEventCode(_) => "INVALID_EVENT_CODE",
            Self::IdenticalAccounts(_) => "IDENTICAL_ACCOUNTS",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::SettlementAccountsRequired(_) => "SETTLEMENT_ACCOUNTS_REQUIRED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountClosed(_) => "ACCOUNT_CLOSED",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::InsufficientEntries => "INSUFFICIENT_ENTRIES",
            Self::UnbalancedBatch { .. } => "UNBALANCED_BATCH",
            Self::InconsistentEntry(_) => "INCONSISTENT_ENTRY",
            Self::ReferenceNotFound(_) => "REFERENCE_NOT_FOUND",
            Self::SelfApprovalForbidden(_) => "SELF_APPROVAL_FORBIDDEN",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::Cancelled => "CANCELLED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_)
            | Self::EmptyReference
            | Self::ReservedReference(_)
            | Self::InvalidEventCode(_)
            | Self::IdenticalAccounts(_)
            | Self::CurrencyMismatch { .. }
            | Self::SettlementAccountsRequired(_)
            | Self::AccountClosed(_) => 400,

            // 403 Forbidden
            Self::SelfApprovalForbidden(_) => 403,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::ReferenceNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateReference(_) | Self::AlreadyReversed(_) => 409,

            // 422 - the batch itself is wrong
            Self::InsufficientEntries
            | Self::UnbalancedBatch { .. }
            | Self::InconsistentEntry(_) => 422,

            Self::Cancelled => 499,

            // 500 Internal Server Error
            Self::Storage(_) => 500,
        }
    }

    /// Returns true if the caller may safely run the same operation again.
    ///
    /// Only a cancellation qualifies: it left no state behind. A storage
    /// failure may have hit after the commit point, so re-posting could
    /// double-post; callers deduplicate by reference id instead.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the error was detected before any write was staged.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.http_status_code() == 400 || matches!(self, Self::AccountNotFound(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidAmount(_)
            | LedgerError::EmptyReference
            | LedgerError::ReservedReference(_)
            | LedgerError::InvalidEventCode(_)
            | LedgerError::IdenticalAccounts(_)
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::SettlementAccountsRequired(_)
            | LedgerError::AccountClosed(_) => Self::Validation(message),
            LedgerError::AccountNotFound(_) | LedgerError::ReferenceNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::DuplicateReference(_) | LedgerError::AlreadyReversed(_) => {
                Self::Conflict(message)
            }
            LedgerError::SelfApprovalForbidden(_) => Self::Forbidden(message),
            LedgerError::InsufficientEntries
            | LedgerError::UnbalancedBatch { .. }
            | LedgerError::InconsistentEntry(_) => Self::BusinessRule(message),
            LedgerError::Cancelled => Self::Cancelled(message),
            LedgerError::Storage(_) => Self::Database(message),
        }
    }
}
