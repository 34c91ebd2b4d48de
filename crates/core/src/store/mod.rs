//! Storage seam of the ledger.
//!
//! A [`UnitOfWork`] is one storage transaction: reads see committed state
//! plus the unit's own staged writes, account locks are held until commit or
//! drop, and nothing becomes visible to other units before `commit`. Dropping
//! a unit without committing rolls it back.
//!
//! Every call of a unit is raced against the cancellation token it was
//! opened with. `commit` checks the token once before the commit point and is
//! not interruptible afterwards, so a cancelled operation either left nothing
//! behind or fully succeeded.

mod memory;

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use corebank_shared::AppError;
use corebank_shared::types::{AccountId, AccountingEntryId, BranchId, CashRequestId, ReversalRequestId};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cash::CashRequest;
use crate::ledger::{Account, AccountingEntry, EventCode, LedgerError, ReferenceId};
use crate::workflow::ReversalRequest;

pub use memory::MemoryLedgerStore;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected a write (reference registry).
    #[error("Unique constraint violated for {0}")]
    UniqueViolation(String),

    /// The cancellation token fired before the commit point.
    #[error("Operation cancelled")]
    Cancelled,

    /// A stored value could not be mapped back to the domain.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Connection or query failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UniqueViolation(_) => "UNIQUE_VIOLATION",
            Self::Cancelled => "CANCELLED",
            Self::InvalidData(_) => "INVALID_STORED_DATA",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::UniqueViolation(_) => 409,
            Self::Cancelled => 499,
            Self::InvalidData(_) | Self::Database(_) => 500,
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(reference) => Self::DuplicateReference(reference),
            StoreError::Cancelled => Self::Cancelled,
            StoreError::InvalidData(_) | StoreError::Database(_) => Self::Storage(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        LedgerError::from(err).into()
    }
}

/// Accounts an event code resolves to at a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashMovementAccounts {
    /// Account the cash leaves (credited).
    pub source_account_id: AccountId,
    /// Account the cash arrives in (debited).
    pub destination_account_id: AccountId,
}

/// Opens units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit of work type of this backend.
    type Unit: UnitOfWork;

    /// Starts a unit of work bound to `cancel`.
    async fn begin(&self, cancel: CancellationToken) -> Result<Self::Unit, StoreError>;
}

/// One storage transaction.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Reads an account without locking it.
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Locks accounts for update, in ascending id order, and returns them.
    ///
    /// Missing or soft-deleted accounts are absent from the result. Locks are
    /// held until commit or drop; ids this unit already holds are not
    /// locked twice.
    async fn lock_accounts(
        &mut self,
        ids: &[AccountId],
    ) -> Result<BTreeMap<AccountId, Account>, StoreError>;

    /// Resolves the accounts mapped to `event_code` at `branch_id`.
    async fn cash_movement_accounts(
        &mut self,
        event_code: &EventCode,
        branch_id: BranchId,
    ) -> Result<Option<CashMovementAccounts>, StoreError>;

    /// Resolves the inter-branch liaison account of a branch.
    async fn liaison_account(&mut self, branch_id: BranchId) -> Result<Option<AccountId>, StoreError>;

    /// Returns true if any non-deleted entry carries `reference`.
    async fn has_entries(&mut self, reference: &ReferenceId) -> Result<bool, StoreError>;

    /// Returns true if `reference` is taken in the reference registry.
    async fn reference_exists(&mut self, reference: &ReferenceId) -> Result<bool, StoreError>;

    /// Loads every non-deleted entry carrying `reference`.
    async fn entries_by_reference(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<AccountingEntry>, StoreError>;

    /// Stages new entries and registers their references.
    ///
    /// A registry clash surfaces as `UniqueViolation` here or at commit.
    async fn stage_entries(&mut self, entries: &[AccountingEntry]) -> Result<(), StoreError>;

    /// Stages the balances of a locked account.
    async fn stage_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Stages the `Posted -> Reversed` flag on entries.
    async fn mark_reversed(&mut self, entry_ids: &[AccountingEntryId]) -> Result<(), StoreError>;

    /// Loads a reversal request.
    async fn find_reversal_request(
        &mut self,
        id: ReversalRequestId,
    ) -> Result<Option<ReversalRequest>, StoreError>;

    /// Loads every reversal request for a reference.
    async fn reversal_requests_for(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<ReversalRequest>, StoreError>;

    /// Stages an insert or update of a reversal request.
    async fn save_reversal_request(&mut self, request: &ReversalRequest) -> Result<(), StoreError>;

    /// Loads a cash request.
    async fn find_cash_request(&mut self, id: CashRequestId) -> Result<Option<CashRequest>, StoreError>;

    /// Stages an insert or update of a cash request.
    async fn save_cash_request(&mut self, request: &CashRequest) -> Result<(), StoreError>;

    /// Applies every staged write atomically and returns the rows affected.
    async fn commit(self) -> Result<u64, StoreError>;

    /// Discards every staged write and releases the locks.
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Races a storage future against a cancellation token.
///
/// # Errors
///
/// Returns `StoreError::Cancelled` if the token fires first, otherwise the
/// future's own result.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(StoreError::Cancelled),
        result = fut => result,
    }
}
