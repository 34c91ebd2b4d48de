//! Duplicate and existence checks on reference ids.
//!
//! The checks run through the caller's unit of work so they see the same
//! consistency scope as the writes that follow. They are a fast path only:
//! the unique reference registry in storage is the final authority, and a
//! concurrent duplicate that slips past here fails at commit.

use tracing::warn;

use super::error::LedgerError;
use super::types::ReferenceId;
use crate::store::UnitOfWork;

/// Stateless guard over posted reference ids.
pub struct DuplicateGuard;

impl DuplicateGuard {
    /// Returns true if any non-deleted entry carries `reference`.
    pub async fn transaction_exists<U>(uow: &mut U, reference: &ReferenceId) -> Result<bool, LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        Ok(uow.has_entries(reference).await?)
    }

    /// Returns true if `reference` is taken in the reference registry.
    ///
    /// Unlike [`Self::transaction_exists`] this also covers derived reversal
    /// references.
    pub async fn reference_id_exists<U>(uow: &mut U, reference: &ReferenceId) -> Result<bool, LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        Ok(uow.reference_exists(reference).await?)
    }

    /// Fails if `reference` has already been posted.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::DuplicateReference` when the reference is taken.
    pub async fn ensure_not_posted<U>(uow: &mut U, reference: &ReferenceId) -> Result<(), LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        if Self::reference_id_exists(uow, reference).await?
            || Self::transaction_exists(uow, reference).await?
        {
            warn!(reference_id = %reference, "rejected duplicate reference");
            return Err(LedgerError::DuplicateReference(reference.to_string()));
        }
        Ok(())
    }

    /// Fails unless `reference` has been posted.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReferenceNotFound` when nothing carries the reference.
    pub async fn ensure_posted<U>(uow: &mut U, reference: &ReferenceId) -> Result<(), LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        if Self::transaction_exists(uow, reference).await? {
            Ok(())
        } else {
            Err(LedgerError::ReferenceNotFound(reference.to_string()))
        }
    }
}
