//! Ledger service: the posting and reversal pipelines over a unit of work.
//!
//! The `*_in` functions run inside a caller-owned unit of work so that an
//! orchestration handler can batch a posting with its own status updates and
//! commit once. [`LedgerService::post`] and [`LedgerService::reverse`] open
//! and commit their own unit for standalone use.

use std::collections::BTreeMap;

use corebank_shared::types::AccountId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::account::Account;
use super::entry::AccountingEntry;
use super::error::LedgerError;
use super::guard::DuplicateGuard;
use super::posting::{PostingEngine, SettlementAccounts};
use super::reversal::{ReversalCommand, ReversalEngine, ReversalOutcome};
use super::types::MovementRequest;
use super::validation::validate_batch;
use crate::store::{LedgerStore, UnitOfWork};

/// Stateless ledger service.
pub struct LedgerService;

impl LedgerService {
    /// Posts a movement inside `uow`: guard, lock, post, validate, stage.
    ///
    /// For an inter-branch request the liaison account of `request.branch_id`
    /// settles the debit side and that of the corresponding branch the credit
    /// side. All accounts are locked in one call so lock order stays global.
    ///
    /// Nothing is visible to other units until the caller commits; on error
    /// the caller drops the unit and every staged write is discarded.
    ///
    /// # Errors
    ///
    /// Any `LedgerError` from the guard, the posting engine or the validator,
    /// and `Storage`/`Cancelled` from the store.
    pub async fn post_in<U>(
        uow: &mut U,
        request: &MovementRequest,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
    ) -> Result<Vec<AccountingEntry>, LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        PostingEngine::precheck(request, debit_account_id, credit_account_id)?;
        DuplicateGuard::ensure_not_posted(uow, &request.reference_id).await?;

        let liaisons = match request.corresponding_branch_id {
            Some(corresponding) if request.is_inter_branch() => {
                let debit_liaison = uow.liaison_account(request.branch_id).await?;
                let credit_liaison = uow.liaison_account(corresponding).await?;
                match (debit_liaison, credit_liaison) {
                    (Some(debit), Some(credit)) if debit == credit => {
                        return Err(LedgerError::IdenticalAccounts(debit));
                    }
                    (Some(debit), Some(credit)) => Some((debit, credit)),
                    _ => {
                        return Err(LedgerError::SettlementAccountsRequired(
                            request.reference_id.to_string(),
                        ));
                    }
                }
            }
            _ => None,
        };

        let mut ids = vec![debit_account_id, credit_account_id];
        if let Some((debit_liaison, credit_liaison)) = liaisons {
            ids.extend([debit_liaison, credit_liaison]);
        }
        let mut accounts = uow.lock_accounts(&ids).await?;

        let mut debit = take(&mut accounts, debit_account_id)?;
        let mut credit = take(&mut accounts, credit_account_id)?;
        let mut settlement_accounts = match liaisons {
            Some((debit_liaison, credit_liaison)) => Some((
                take(&mut accounts, debit_liaison)?,
                take(&mut accounts, credit_liaison)?,
            )),
            None => None,
        };

        let settlement = settlement_accounts.as_mut().map(|(debit_liaison, credit_liaison)| {
            SettlementAccounts {
                debit_branch_liaison: debit_liaison,
                credit_branch_liaison: credit_liaison,
            }
        });
        let entries = PostingEngine::post_movement(request, &mut debit, &mut credit, settlement)?;

        if let Err(err) = validate_batch(&entries) {
            warn!(reference_id = %request.reference_id, error = %err, "Posting produced an unbalanced batch");
            return Err(err);
        }

        uow.stage_entries(&entries).await?;
        uow.stage_account(&debit).await?;
        uow.stage_account(&credit).await?;
        if let Some((debit_liaison, credit_liaison)) = &settlement_accounts {
            uow.stage_account(debit_liaison).await?;
            uow.stage_account(credit_liaison).await?;
        }
        debug!(
            reference_id = %request.reference_id,
            legs = entries.len(),
            "Movement staged"
        );

        Ok(entries)
    }

    /// Reverses a posted reference inside `uow`: load, lock, reload, reverse, validate, stage.
    ///
    /// The originals are read again once their accounts are locked, so a
    /// reversal that committed while this one waited shows up as reversed
    /// entries. The inverse legs carry `command.reversal_reference`; if that
    /// reference is already taken in the registry the staging write fails
    /// with `DuplicateReference`.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if nothing was posted under the reference
    /// - `AlreadyReversed` if its entries are already marked reversed
    /// - `SelfApprovalForbidden` if issuer and approver are the same user
    /// - `DuplicateReference` if the reversal reference is already registered
    pub async fn reverse_in<U>(
        uow: &mut U,
        command: &ReversalCommand,
    ) -> Result<ReversalOutcome, LedgerError>
    where
        U: UnitOfWork + ?Sized,
    {
        let originals = uow.entries_by_reference(&command.reference_id).await?;
        if originals.is_empty() {
            return Err(LedgerError::ReferenceNotFound(command.reference_id.to_string()));
        }

        let ids: Vec<AccountId> = originals.iter().map(|e| e.account_id).collect();
        let mut accounts = uow.lock_accounts(&ids).await?;

        let mut originals = uow.entries_by_reference(&command.reference_id).await?;
        if originals.iter().any(AccountingEntry::is_reversed) {
            warn!(reference_id = %command.reference_id, "Reference already reversed");
            return Err(LedgerError::AlreadyReversed(command.reference_id.to_string()));
        }

        let outcome = ReversalEngine::reverse(command, &mut originals, &mut accounts)?;
        validate_batch(&outcome.entries)?;

        if let Err(err) = uow.stage_entries(&outcome.entries).await {
            warn!(
                reference_id = %command.reference_id,
                reversal_reference = %command.reversal_reference,
                error = %err,
                "Reversal reference rejected"
            );
            return Err(err.into());
        }
        uow.mark_reversed(&outcome.reversed_entry_ids()).await?;
        for account in accounts.values() {
            uow.stage_account(account).await?;
        }
        debug!(
            reference_id = %command.reference_id,
            reversal_reference = %command.reversal_reference,
            legs = outcome.entries.len(),
            "Reversal staged"
        );

        Ok(outcome)
    }

    /// Posts a movement in its own unit of work and commits it.
    ///
    /// # Errors
    ///
    /// See [`Self::post_in`]; also `Storage` when the commit affects no rows.
    pub async fn post<S>(
        store: &S,
        request: &MovementRequest,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountingEntry>, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let mut uow = store.begin(cancel.clone()).await?;
        let entries = Self::post_in(&mut uow, request, debit_account_id, credit_account_id).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reference_id = %request.reference_id,
            event_code = %request.event_code,
            amount = %request.amount,
            legs = entries.len(),
            "Movement posted"
        );
        Ok(entries)
    }

    /// Reverses a reference in its own unit of work and commits it.
    ///
    /// # Errors
    ///
    /// See [`Self::reverse_in`].
    pub async fn reverse<S>(
        store: &S,
        command: &ReversalCommand,
        cancel: &CancellationToken,
    ) -> Result<ReversalOutcome, LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        let mut uow = store.begin(cancel.clone()).await?;
        let outcome = Self::reverse_in(&mut uow, command).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reference_id = %command.reference_id,
            reversal_reference = %command.reversal_reference,
            approved_by = %command.authorization.approved_by,
            "Movement reversed"
        );
        Ok(outcome)
    }
}

fn take(accounts: &mut BTreeMap<AccountId, Account>, id: AccountId) -> Result<Account, LedgerError> {
    accounts.remove(&id).ok_or(LedgerError::AccountNotFound(id))
}

/// Treats a commit that touched nothing as a failure.
pub(crate) fn ensure_committed(rows: u64) -> Result<u64, LedgerError> {
    if rows == 0 {
        return Err(LedgerError::Storage("commit affected no rows".to_string()));
    }
    Ok(rows)
}
