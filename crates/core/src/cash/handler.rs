//! Cash movement handlers.
//!
//! Every handler runs in one unit of work: authorize, guard, resolve the
//! accounts, post, validate, update the request status, then commit. Any
//! failure before the commit drops the unit and leaves nothing behind.
//! Balances are only ever touched through [`LedgerService`].

use corebank_shared::LedgerConfig;
use corebank_shared::types::{AccountId, BranchId, CashRequestId, ReversalRequestId};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::CashError;
use super::types::{
    ApproveCashRequest, BankCashCommand, BankCashDirection, CashPosting, CashRequest,
    CashRequestKind, NewCashRequest,
};
use crate::ledger::service::ensure_committed;
use crate::ledger::{
    AccountingEntry, ActorContext, DuplicateGuard, EventCode, LedgerError, LedgerService,
    MovementRequest, ReferenceId, ReversalAuthorization, ReversalCommand, ensure_valid_amount,
};
use crate::store::{CashMovementAccounts, LedgerStore, UnitOfWork};
use crate::workflow::{
    ApprovalStatus, RedirectTarget, ReversalRequest, ReversalState, WorkflowError, WorkflowService,
};

/// A reversal that was approved and posted.
#[derive(Debug, Clone)]
pub struct CompletedReversal {
    /// The request, now `Reversed`, carrying the snapshot.
    pub request: ReversalRequest,
    /// The inverse legs.
    pub entries: Vec<AccountingEntry>,
}

/// Orchestrates cash requests, bank cash movements and reversals.
pub struct CashMovementHandler<S> {
    store: S,
    reversal_prefix: String,
}

impl<S: LedgerStore> CashMovementHandler<S> {
    /// Creates a handler over `store`.
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Self {
            store,
            reversal_prefix: config.reversal_prefix.clone(),
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ========== Cash requests ==========

    /// Submits a replenishment or deposit notification for head-office approval.
    ///
    /// # Errors
    ///
    /// - `BranchNotAuthorized` if the actor belongs to another branch
    /// - `InvalidAmount` for a non-positive amount or one with more than four decimal places
    /// - `ReservedReference` if the reference uses the reversal prefix
    /// - `DuplicateReference` if the reference was already posted
    /// - `MappingNotFound` if the event code has no accounts at the branch
    pub async fn submit_request(
        &self,
        actor: &ActorContext,
        input: NewCashRequest,
        cancel: &CancellationToken,
    ) -> Result<CashRequest, CashError> {
        require_branch(actor, input.branch_id)?;
        ensure_valid_amount(input.amount)?;
        input.reference_id.ensure_unreserved(&self.reversal_prefix)?;

        let mut uow = self.store.begin(cancel.clone()).await?;
        DuplicateGuard::ensure_not_posted(&mut uow, &input.reference_id).await?;
        mapped_accounts(&mut uow, &input.event_code, input.branch_id).await?;

        let request = CashRequest {
            id: CashRequestId::new(),
            kind: input.kind,
            branch_id: input.branch_id,
            reference_id: input.reference_id,
            event_code: input.event_code,
            requested_amount: input.amount,
            approved_amount: None,
            narration: input.narration,
            status: ApprovalStatus::Pending,
            requested_by: actor.user_id,
            requested_at: chrono::Utc::now(),
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
        };
        uow.save_cash_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            request_id = %request.id,
            kind = %request.kind,
            reference_id = %request.reference_id,
            amount = %request.requested_amount,
            "Cash request submitted"
        );
        Ok(request)
    }

    /// Approves a vault replenishment and posts it.
    ///
    /// The mapped destination (branch vault) is debited and the source
    /// credited with the approved amount. The request ends `Approved`.
    ///
    /// # Errors
    ///
    /// - `HeadOfficeRequired` unless the actor acts for head office
    /// - `InvalidAmount` / `ApprovedAmountExceedsRequested` for a bad amount
    /// - `InvalidApprovalTransition` unless the request is open
    /// - any posting error; nothing is committed then
    pub async fn approve_replenishment(
        &self,
        actor: &ActorContext,
        command: ApproveCashRequest,
        cancel: &CancellationToken,
    ) -> Result<CashPosting, CashError> {
        self.approve_and_post(actor, command, CashRequestKind::Replenishment, cancel)
            .await
    }

    /// Approves a deposit notification and posts it.
    ///
    /// Same pipeline as a replenishment; the request ends `Completed`.
    ///
    /// # Errors
    ///
    /// See [`Self::approve_replenishment`].
    pub async fn approve_deposit_notification(
        &self,
        actor: &ActorContext,
        command: ApproveCashRequest,
        cancel: &CancellationToken,
    ) -> Result<CashPosting, CashError> {
        self.approve_and_post(actor, command, CashRequestKind::DepositNotification, cancel)
            .await
    }

    async fn approve_and_post(
        &self,
        actor: &ActorContext,
        command: ApproveCashRequest,
        kind: CashRequestKind,
        cancel: &CancellationToken,
    ) -> Result<CashPosting, CashError> {
        require_head_office(actor, "approve cash requests")?;

        let mut uow = self.store.begin(cancel.clone()).await?;
        let mut request = load_request(&mut uow, command.request_id).await?;
        if request.kind != kind {
            return Err(CashError::WrongRequestKind {
                id: request.id,
                expected: kind,
                actual: request.kind,
            });
        }

        let amount = command.approved_amount.unwrap_or(request.requested_amount);
        ensure_valid_amount(amount)?;
        if amount > request.requested_amount {
            warn!(
                request_id = %request.id,
                approved = %amount,
                requested = %request.requested_amount,
                "Approved amount exceeds requested amount"
            );
            return Err(CashError::ApprovedAmountExceedsRequested {
                approved: amount,
                requested: request.requested_amount,
            });
        }
        let status = WorkflowService::approve(request.status)?;

        let accounts = mapped_accounts(&mut uow, &request.event_code, request.branch_id).await?;
        let movement = MovementRequest::new(
            actor,
            request.reference_id.clone(),
            request.event_code.clone(),
            amount,
            request.narration.clone(),
        )
        .with_operation(kind.operation_type());
        let entries = post_between(
            &mut uow,
            movement,
            accounts.destination_account_id,
            accounts.source_account_id,
        )
        .await?;

        request.approved_amount = Some(amount);
        request.decide(status, actor.user_id);
        if kind == CashRequestKind::DepositNotification {
            request.status = WorkflowService::complete(request.status)?;
        }
        uow.save_cash_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            request_id = %request.id,
            kind = %kind,
            reference_id = %request.reference_id,
            amount = %amount,
            status = %request.status,
            approved_by = %actor.user_id,
            "Cash request approved"
        );
        Ok(CashPosting { request, entries })
    }

    /// Rejects an open cash request without posting anything.
    ///
    /// # Errors
    ///
    /// - `HeadOfficeRequired` unless the actor acts for head office
    /// - `RejectionReasonRequired` for a blank reason
    /// - `InvalidApprovalTransition` unless the request is open
    pub async fn reject_request(
        &self,
        actor: &ActorContext,
        request_id: CashRequestId,
        reason: String,
        cancel: &CancellationToken,
    ) -> Result<CashRequest, CashError> {
        require_head_office(actor, "reject cash requests")?;
        if reason.trim().is_empty() {
            return Err(WorkflowError::RejectionReasonRequired.into());
        }

        let mut uow = self.store.begin(cancel.clone()).await?;
        let mut request = load_request(&mut uow, request_id).await?;
        let status = WorkflowService::reject(request.status)?;
        request.decide(status, actor.user_id);
        request.rejection_reason = Some(reason);
        uow.save_cash_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(request_id = %request.id, rejected_by = %actor.user_id, "Cash request rejected");
        Ok(request)
    }

    /// Routes a pending request to a branch department.
    ///
    /// # Errors
    ///
    /// - `HeadOfficeRequired` unless the actor acts for head office
    /// - `InvalidApprovalTransition` unless the request is `Pending`
    pub async fn redirect_request(
        &self,
        actor: &ActorContext,
        request_id: CashRequestId,
        target: RedirectTarget,
        cancel: &CancellationToken,
    ) -> Result<CashRequest, CashError> {
        require_head_office(actor, "redirect cash requests")?;

        let mut uow = self.store.begin(cancel.clone()).await?;
        let mut request = load_request(&mut uow, request_id).await?;
        let status = WorkflowService::redirect(request.status, target)?;
        request.decide(status, actor.user_id);
        uow.save_cash_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(request_id = %request.id, status = %request.status, "Cash request redirected");
        Ok(request)
    }

    // ========== Bank cash ==========

    /// Posts a bank cash-in or cash-out at a branch.
    ///
    /// Cash-in debits the mapped destination (bank) and credits the source
    /// (vault); cash-out does the opposite.
    ///
    /// # Errors
    ///
    /// - `BranchNotAuthorized` if the actor belongs to another branch
    /// - `ReservedReference` if the reference uses the reversal prefix
    /// - `MappingNotFound` if the event code has no accounts at the branch
    /// - any posting error; nothing is committed then
    pub async fn post_bank_cash(
        &self,
        actor: &ActorContext,
        command: BankCashCommand,
        cancel: &CancellationToken,
    ) -> Result<Vec<AccountingEntry>, CashError> {
        require_branch(actor, command.branch_id)?;
        command.reference_id.ensure_unreserved(&self.reversal_prefix)?;

        let mut uow = self.store.begin(cancel.clone()).await?;
        let accounts = mapped_accounts(&mut uow, &command.event_code, command.branch_id).await?;
        let (debit, credit) = match command.direction {
            BankCashDirection::CashIn => {
                (accounts.destination_account_id, accounts.source_account_id)
            }
            BankCashDirection::CashOut => {
                (accounts.source_account_id, accounts.destination_account_id)
            }
        };

        let movement = MovementRequest::new(
            actor,
            command.reference_id.clone(),
            command.event_code.clone(),
            command.amount,
            command.narration,
        )
        .with_operation(command.direction.operation_type());
        let entries = post_between(&mut uow, movement, debit, credit).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reference_id = %command.reference_id,
            event_code = %command.event_code,
            operation = command.direction.operation_type().as_str(),
            amount = %command.amount,
            "Bank cash movement posted"
        );
        Ok(entries)
    }

    // ========== Reversals ==========

    /// Opens a reversal request for a posted reference.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if nothing was posted under the reference
    /// - `BranchNotAuthorized` if the actor belongs to another branch
    /// - `AlreadyReversed` if the reference was reversed before
    /// - `ReversalInProgress` if another request awaits a decision
    /// - `ReversalReasonRequired` for a blank reason
    pub async fn request_reversal(
        &self,
        actor: &ActorContext,
        reference_id: ReferenceId,
        reason: String,
        cancel: &CancellationToken,
    ) -> Result<ReversalRequest, CashError> {
        let mut uow = self.store.begin(cancel.clone()).await?;
        let originals = uow.entries_by_reference(&reference_id).await?;
        let Some(branch_id) = originals
            .iter()
            .find(|e| !e.is_auxiliary)
            .or_else(|| originals.first())
            .map(|e| e.branch_id)
        else {
            return Err(LedgerError::ReferenceNotFound(reference_id.to_string()).into());
        };
        require_branch(actor, branch_id)?;

        if originals.iter().any(AccountingEntry::is_reversed) {
            return Err(LedgerError::AlreadyReversed(reference_id.to_string()).into());
        }
        let pending = uow.reversal_requests_for(&reference_id).await?;
        if pending.iter().any(|r| r.state.is_in_flight()) {
            return Err(CashError::ReversalInProgress(reference_id.to_string()));
        }

        let action =
            WorkflowService::request_reversal(ReversalState::Posted, actor.user_id, &reason)?;
        let request = ReversalRequest::from_action(reference_id, branch_id, reason, &action)
            .ok_or(WorkflowError::InvalidReversalTransition {
                from: ReversalState::Posted,
                to: action.new_state(),
            })?;
        uow.save_reversal_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reversal_request_id = %request.id,
            reference_id = %request.reference_id,
            issued_by = %request.issued_by,
            "Reversal requested"
        );
        Ok(request)
    }

    /// Approves a reversal request and posts the inverse batch.
    ///
    /// The approver must differ from the issuer. The before/after snapshot
    /// is stored on the request.
    ///
    /// # Errors
    ///
    /// - `ReversalRequestNotFound` for an unknown request
    /// - `SelfApprovalForbidden` if the approver issued the request
    /// - `InvalidReversalTransition` unless the request is `ReversalRequested`
    /// - any reversal error; nothing is committed then
    pub async fn approve_reversal(
        &self,
        actor: &ActorContext,
        request_id: ReversalRequestId,
        cancel: &CancellationToken,
    ) -> Result<CompletedReversal, CashError> {
        let mut uow = self.store.begin(cancel.clone()).await?;
        let mut request = load_reversal_request(&mut uow, request_id).await?;
        require_branch(actor, request.branch_id)?;

        let approval =
            WorkflowService::approve_reversal(request.state, request.issued_by, actor.user_id)
                .inspect_err(|err| {
                    if matches!(err, WorkflowError::SelfApprovalForbidden(_)) {
                        warn!(
                            reversal_request_id = %request.id,
                            user_id = %actor.user_id,
                            "Self-approval of reversal refused"
                        );
                    }
                })?;
        request.apply(approval);

        let command = ReversalCommand {
            reversal_reference: request.reference_id.reversal(&self.reversal_prefix),
            reference_id: request.reference_id.clone(),
            authorization: ReversalAuthorization {
                issued_by: request.issued_by,
                approved_by: actor.user_id,
            },
            approver_name: actor.full_name.clone(),
        };
        let outcome = LedgerService::reverse_in(&mut uow, &command).await?;

        request.apply(WorkflowService::complete_reversal(request.state)?);
        request.reversal_reference = Some(command.reversal_reference.clone());
        request.snapshot = Some(outcome.snapshot);
        uow.save_reversal_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reversal_request_id = %request.id,
            reference_id = %command.reference_id,
            reversal_reference = %command.reversal_reference,
            approved_by = %actor.user_id,
            "Reversal approved and posted"
        );
        Ok(CompletedReversal {
            request,
            entries: outcome.entries,
        })
    }

    /// Rejects a reversal request. The original movement stays posted.
    ///
    /// # Errors
    ///
    /// - `ReversalRequestNotFound` for an unknown request
    /// - `RejectionReasonRequired` for a blank reason
    /// - `InvalidReversalTransition` unless the request is `ReversalRequested`
    pub async fn reject_reversal(
        &self,
        actor: &ActorContext,
        request_id: ReversalRequestId,
        reason: String,
        cancel: &CancellationToken,
    ) -> Result<ReversalRequest, CashError> {
        let mut uow = self.store.begin(cancel.clone()).await?;
        let mut request = load_reversal_request(&mut uow, request_id).await?;
        require_branch(actor, request.branch_id)?;

        request.apply(WorkflowService::reject_reversal(request.state, actor.user_id, reason)?);
        uow.save_reversal_request(&request).await?;
        ensure_committed(uow.commit().await?)?;

        info!(
            reversal_request_id = %request.id,
            reference_id = %request.reference_id,
            rejected_by = %actor.user_id,
            "Reversal rejected"
        );
        Ok(request)
    }
}

fn require_head_office(actor: &ActorContext, action: &'static str) -> Result<(), CashError> {
    if actor.is_head_office {
        return Ok(());
    }
    warn!(
        user_id = %actor.user_id,
        branch_code = %actor.branch_code,
        action,
        "Head office authorization failed"
    );
    Err(CashError::HeadOfficeRequired(action))
}

fn require_branch(actor: &ActorContext, branch_id: BranchId) -> Result<(), CashError> {
    if actor.can_act_for_branch(branch_id) {
        return Ok(());
    }
    warn!(
        user_id = %actor.user_id,
        branch_id = %branch_id,
        "Branch authorization failed"
    );
    Err(CashError::BranchNotAuthorized {
        user_id: actor.user_id,
        branch_id,
    })
}

async fn load_request<U>(uow: &mut U, id: CashRequestId) -> Result<CashRequest, CashError>
where
    U: UnitOfWork + ?Sized,
{
    uow.find_cash_request(id)
        .await?
        .ok_or(CashError::RequestNotFound(id))
}

async fn load_reversal_request<U>(
    uow: &mut U,
    id: ReversalRequestId,
) -> Result<ReversalRequest, CashError>
where
    U: UnitOfWork + ?Sized,
{
    uow.find_reversal_request(id)
        .await?
        .ok_or(CashError::ReversalRequestNotFound(id))
}

async fn mapped_accounts<U>(
    uow: &mut U,
    event_code: &EventCode,
    branch_id: BranchId,
) -> Result<CashMovementAccounts, CashError>
where
    U: UnitOfWork + ?Sized,
{
    uow.cash_movement_accounts(event_code, branch_id)
        .await?
        .ok_or_else(|| CashError::MappingNotFound {
            event_code: event_code.to_string(),
            branch_id,
        })
}

/// Posts `movement` from the debit to the credit account.
///
/// The debit account's branch originates the movement; when the credit
/// account sits in another branch the movement settles through liaisons.
async fn post_between<U>(
    uow: &mut U,
    movement: MovementRequest,
    debit_account_id: AccountId,
    credit_account_id: AccountId,
) -> Result<Vec<AccountingEntry>, CashError>
where
    U: UnitOfWork + ?Sized,
{
    let debit = uow
        .find_account(debit_account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(debit_account_id))?;
    let credit = uow
        .find_account(credit_account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(credit_account_id))?;

    let mut movement = movement.with_branch(debit.branch_id);
    if credit.branch_id != debit.branch_id {
        movement = movement.inter_branch(credit.branch_id);
    }
    Ok(LedgerService::post_in(uow, &movement, debit_account_id, credit_account_id).await?)
}
