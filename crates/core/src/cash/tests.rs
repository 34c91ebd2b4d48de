//! Scenario tests for the cash movement handlers.

use corebank_shared::LedgerConfig;
use corebank_shared::types::{AccountId, BankId, BranchId, CashRequestId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::ledger::account::fixtures::account;
use crate::ledger::{
    AccountKind, AccountingEntry, ActorContext, EntryStatus, EntryType, EventCode, LedgerError,
    OperationType, ReferenceId, reconcile_account,
};
use crate::store::{CashMovementAccounts, MemoryLedgerStore};
use crate::workflow::{ApprovalStatus, RedirectTarget, ReversalState, WorkflowError};

const REPLENISHMENT: &str = "CASH_REPLENISHMENT";
const HEAD_OFFICE_REPLENISHMENT: &str = "HO_REPLENISHMENT";
const DEPOSIT: &str = "DEPOSIT_NOTIFICATION";
const BANK_CASH: &str = "BANK_CASH";

struct Fixture {
    handler: CashMovementHandler<MemoryLedgerStore>,
    store: MemoryLedgerStore,
    branch: BranchId,
    transit: AccountId,
    vault: AccountId,
    bank: AccountId,
    customer: AccountId,
    head_office_vault: AccountId,
    teller: ActorContext,
    supervisor: ActorContext,
    head_office: ActorContext,
}

fn actor(name: &str, branch_id: BranchId, branch_code: &str, is_head_office: bool) -> ActorContext {
    ActorContext {
        user_id: UserId::new(),
        full_name: name.to_string(),
        bank_id: BankId::new(),
        branch_id,
        branch_code: branch_code.to_string(),
        is_head_office,
    }
}

fn code(value: &str) -> EventCode {
    EventCode::new(value).unwrap()
}

fn reference(value: &str) -> ReferenceId {
    ReferenceId::new(value).unwrap()
}

async fn fixture() -> Fixture {
    let branch = BranchId::new();
    let head_office_branch = BranchId::new();
    let store = MemoryLedgerStore::new();

    let transit = store
        .insert_account(account(AccountKind::Transit, branch).with_opening_balance(dec!(1000000)))
        .await;
    let vault = store
        .insert_account(account(AccountKind::Vault, branch).with_opening_balance(dec!(50000)))
        .await;
    let bank = store.insert_account(account(AccountKind::Bank, branch)).await;
    let customer = store.insert_account(account(AccountKind::Customer, branch)).await;
    let head_office_vault = store
        .insert_account(
            account(AccountKind::Vault, head_office_branch).with_opening_balance(dec!(5000000)),
        )
        .await;
    let branch_liaison = store.insert_account(account(AccountKind::Liaison, branch)).await;
    let head_office_liaison = store
        .insert_account(account(AccountKind::Liaison, head_office_branch))
        .await;
    store.set_liaison_account(branch, branch_liaison).await;
    store
        .set_liaison_account(head_office_branch, head_office_liaison)
        .await;

    let mappings = [
        (REPLENISHMENT, transit, vault),
        (HEAD_OFFICE_REPLENISHMENT, head_office_vault, vault),
        (DEPOSIT, customer, bank),
        (BANK_CASH, vault, bank),
    ];
    for (event_code, source, destination) in mappings {
        store
            .map_cash_movement(
                code(event_code),
                branch,
                CashMovementAccounts {
                    source_account_id: source,
                    destination_account_id: destination,
                },
            )
            .await;
    }

    Fixture {
        handler: CashMovementHandler::new(store.clone(), &LedgerConfig::default()),
        store,
        branch,
        transit,
        vault,
        bank,
        customer,
        head_office_vault,
        teller: actor("Teller", branch, "002", false),
        supervisor: actor("Branch Supervisor", branch, "002", false),
        head_office: actor("Head Office Controller", head_office_branch, "001", true),
    }
}

impl Fixture {
    async fn balance(&self, id: AccountId) -> Decimal {
        self.store.account(id).await.unwrap().current_balance()
    }

    async fn submit(
        &self,
        kind: CashRequestKind,
        event_code: &str,
        reference_id: &str,
        amount: Decimal,
    ) -> CashRequest {
        self.handler
            .submit_request(
                &self.teller,
                NewCashRequest {
                    kind,
                    branch_id: self.branch,
                    reference_id: reference(reference_id),
                    event_code: code(event_code),
                    amount,
                    narration: "vault top-up".into(),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    async fn approve(
        &self,
        request_id: CashRequestId,
        amount: Option<Decimal>,
    ) -> Result<CashPosting, CashError> {
        self.handler
            .approve_replenishment(
                &self.head_office,
                ApproveCashRequest {
                    request_id,
                    approved_amount: amount,
                },
                &CancellationToken::new(),
            )
            .await
    }

    async fn bank_cash(
        &self,
        direction: BankCashDirection,
        reference_id: &str,
        amount: Decimal,
    ) -> Result<Vec<AccountingEntry>, CashError> {
        self.handler
            .post_bank_cash(
                &self.teller,
                BankCashCommand {
                    direction,
                    branch_id: self.branch,
                    reference_id: reference(reference_id),
                    event_code: code(BANK_CASH),
                    amount,
                    narration: "bank run".into(),
                },
                &CancellationToken::new(),
            )
            .await
    }
}

// ========== Replenishment ==========

#[tokio::test]
async fn test_replenishment_posts_approved_amount() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;
    assert_eq!(request.status, ApprovalStatus::Pending);

    let posting = f.approve(request.id, Some(dec!(15000))).await.unwrap();

    assert_eq!(posting.request.status, ApprovalStatus::Approved);
    assert_eq!(posting.request.approved_amount, Some(dec!(15000)));
    assert_eq!(posting.request.decided_by, Some(f.head_office.user_id));
    assert_eq!(posting.entries.len(), 2);
    assert!(posting.entries.iter().all(|e| e.amount == dec!(15000)
        && e.operation_type == OperationType::CashReplenishment
        && e.initiated_by == f.head_office.user_id));

    assert_eq!(f.balance(f.vault).await, dec!(65000));
    assert_eq!(f.balance(f.transit).await, dec!(985000));
    let stored = f.store.cash_request(request.id).await.unwrap();
    assert_eq!(stored.status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_approval_defaults_to_requested_amount() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let posting = f.approve(request.id, None).await.unwrap();

    assert_eq!(posting.request.approved_amount, Some(dec!(20000)));
    assert_eq!(f.balance(f.vault).await, dec!(70000));
}

#[tokio::test]
async fn test_approved_amount_above_requested_rejected() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let err = f.approve(request.id, Some(dec!(20000.01))).await.unwrap_err();

    assert!(matches!(err, CashError::ApprovedAmountExceedsRequested { .. }));
    assert!(f.store.entries().await.is_empty());
    assert_eq!(f.balance(f.vault).await, dec!(50000));
    assert_eq!(
        f.store.cash_request(request.id).await.unwrap().status,
        ApprovalStatus::Pending
    );
}

#[tokio::test]
async fn test_zero_approved_amount_rejected() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let err = f.approve(request.id, Some(Decimal::ZERO)).await.unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::InvalidAmount(_))));
    assert!(f.store.entries().await.is_empty());
}

#[tokio::test]
async fn test_approved_amount_beyond_four_places_rejected() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let err = f.approve(request.id, Some(dec!(999.99999))).await.unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::InvalidAmount(_))));
    assert!(f.store.entries().await.is_empty());
    assert_eq!(
        f.store.cash_request(request.id).await.unwrap().status,
        ApprovalStatus::Pending
    );
}

#[tokio::test]
async fn test_submit_rejects_reserved_reference_and_sub_scale_amount() {
    let f = fixture().await;
    let new_request = |reference_id: &str, amount: Decimal| NewCashRequest {
        kind: CashRequestKind::Replenishment,
        branch_id: f.branch,
        reference_id: reference(reference_id),
        event_code: code(REPLENISHMENT),
        amount,
        narration: "vault top-up".into(),
    };
    let cancel = CancellationToken::new();

    let err = f
        .handler
        .submit_request(&f.teller, new_request("REV-REP-1", dec!(100)), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(&err, CashError::Ledger(LedgerError::ReservedReference(r)) if r == "REV-REP-1"));
    assert_eq!(err.http_status_code(), 400);

    let err = f
        .handler
        .submit_request(&f.teller, new_request("REP-1", dec!(100.00001)), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::Ledger(LedgerError::InvalidAmount(_))));
}

#[tokio::test]
async fn test_branch_user_cannot_approve() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let err = f
        .handler
        .approve_replenishment(
            &f.supervisor,
            ApproveCashRequest {
                request_id: request.id,
                approved_amount: None,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::HeadOfficeRequired(_)));
    assert_eq!(err.http_status_code(), 403);
    assert!(f.store.entries().await.is_empty());
}

#[tokio::test]
async fn test_second_approval_rejected() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;
    f.approve(request.id, None).await.unwrap();

    let err = f.approve(request.id, None).await.unwrap_err();

    assert!(matches!(
        err,
        CashError::Workflow(WorkflowError::InvalidApprovalTransition { .. })
    ));
    assert_eq!(f.store.entries().await.len(), 2);
    assert_eq!(f.balance(f.vault).await, dec!(70000));
}

#[tokio::test]
async fn test_unknown_request() {
    let f = fixture().await;
    let err = f.approve(CashRequestId::new(), None).await.unwrap_err();
    assert!(matches!(err, CashError::RequestNotFound(_)));
}

#[tokio::test]
async fn test_submit_requires_mapping_and_own_branch() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    let input = |event_code: &str, branch_id| NewCashRequest {
        kind: CashRequestKind::Replenishment,
        branch_id,
        reference_id: reference("REP-9"),
        event_code: code(event_code),
        amount: dec!(100),
        narration: String::new(),
    };

    let err = f
        .handler
        .submit_request(&f.teller, input("UNMAPPED", f.branch), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::MappingNotFound { .. }));

    let err = f
        .handler
        .submit_request(&f.teller, input(REPLENISHMENT, BranchId::new()), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::BranchNotAuthorized { .. }));
}

#[tokio::test]
async fn test_head_office_replenishment_settles_through_liaisons() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, HEAD_OFFICE_REPLENISHMENT, "REP-HO", dec!(30000))
        .await;

    let posting = f.approve(request.id, None).await.unwrap();

    assert_eq!(posting.entries.len(), 4);
    assert_eq!(posting.entries.iter().filter(|e| e.is_auxiliary).count(), 2);
    assert_eq!(f.balance(f.vault).await, dec!(80000));
    assert_eq!(f.balance(f.head_office_vault).await, dec!(4970000));

    for branch in [f.branch, f.head_office.branch_id] {
        let legs = posting.entries.iter().filter(|e| e.branch_id == branch);
        let (debit, credit) = legs.fold((Decimal::ZERO, Decimal::ZERO), |(d, c), e| {
            (d + e.debit_amount, c + e.credit_amount)
        });
        assert_eq!(debit, credit);
    }
}

// ========== Reject / redirect ==========

#[tokio::test]
async fn test_reject_posts_nothing() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;
    let cancel = CancellationToken::new();

    let err = f
        .handler
        .reject_request(&f.head_office, request.id, "  ".into(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::Workflow(WorkflowError::RejectionReasonRequired)));

    let rejected = f
        .handler
        .reject_request(&f.head_office, request.id, "vault over limit".into(), &cancel)
        .await
        .unwrap();

    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("vault over limit"));
    assert!(f.store.entries().await.is_empty());

    let err = f.approve(request.id, None).await.unwrap_err();
    assert!(matches!(err, CashError::Workflow(_)));
}

#[tokio::test]
async fn test_redirected_request_can_still_be_approved() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;
    let cancel = CancellationToken::new();

    let redirected = f
        .handler
        .redirect_request(&f.head_office, request.id, RedirectTarget::Btb, &cancel)
        .await
        .unwrap();
    assert_eq!(
        redirected.status,
        ApprovalStatus::RedirectToBranch(RedirectTarget::Btb)
    );
    assert!(f.store.entries().await.is_empty());

    let err = f
        .handler
        .redirect_request(&f.head_office, request.id, RedirectTarget::Bd, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::Workflow(_)));

    let posting = f.approve(request.id, None).await.unwrap();
    assert_eq!(posting.request.status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn test_branch_user_cannot_redirect() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::Replenishment, REPLENISHMENT, "REP-1", dec!(20000))
        .await;

    let err = f
        .handler
        .redirect_request(&f.teller, request.id, RedirectTarget::Bco, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::HeadOfficeRequired(_)));
}

// ========== Deposit notification ==========

#[tokio::test]
async fn test_deposit_notification_completes() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::DepositNotification, DEPOSIT, "DEP-1", dec!(7500))
        .await;

    let posting = f
        .handler
        .approve_deposit_notification(
            &f.head_office,
            ApproveCashRequest {
                request_id: request.id,
                approved_amount: None,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(posting.request.status, ApprovalStatus::Completed);
    assert!(posting
        .entries
        .iter()
        .all(|e| e.operation_type == OperationType::DepositNotification));
    assert_eq!(f.balance(f.bank).await, dec!(7500));
    assert_eq!(f.balance(f.customer).await, dec!(7500));
}

#[tokio::test]
async fn test_wrong_request_kind() {
    let f = fixture().await;
    let request = f
        .submit(CashRequestKind::DepositNotification, DEPOSIT, "DEP-1", dec!(7500))
        .await;

    let err = f.approve(request.id, None).await.unwrap_err();

    assert!(matches!(
        err,
        CashError::WrongRequestKind {
            expected: CashRequestKind::Replenishment,
            actual: CashRequestKind::DepositNotification,
            ..
        }
    ));
}

// ========== Bank cash ==========

#[tokio::test]
async fn test_bank_cash_in_and_out() {
    let f = fixture().await;

    let entries = f
        .bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    let bank_leg = entries.iter().find(|e| e.account_id == f.bank).unwrap();
    assert_eq!(bank_leg.entry_type, EntryType::Debit);
    assert_eq!(bank_leg.operation_type, OperationType::BankCashIn);
    assert_eq!(f.balance(f.vault).await, dec!(38000));
    assert_eq!(f.balance(f.bank).await, dec!(12000));

    f.bank_cash(BankCashDirection::CashOut, "BCO-1", dec!(2000))
        .await
        .unwrap();
    assert_eq!(f.balance(f.vault).await, dec!(40000));
    assert_eq!(f.balance(f.bank).await, dec!(10000));
}

#[tokio::test]
async fn test_bank_cash_duplicate_reference() {
    let f = fixture().await;
    f.bank_cash(BankCashDirection::CashIn, "R-2", dec!(1000))
        .await
        .unwrap();

    let err = f
        .bank_cash(BankCashDirection::CashIn, "R-2", dec!(1000))
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::DuplicateReference(_))));
    assert_eq!(f.balance(f.vault).await, dec!(49000));
    assert_eq!(f.store.entries().await.len(), 2);
}

#[tokio::test]
async fn test_bank_cash_rejects_reserved_reference() {
    let f = fixture().await;

    let err = f
        .bank_cash(BankCashDirection::CashIn, "REV-BCI-1", dec!(1000))
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::ReservedReference(_))));
    assert!(f.store.entries().await.is_empty());

    // The real reversal of BCI-1 still gets its reference.
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(1000))
        .await
        .unwrap();
    let cancel = CancellationToken::new();
    let requested = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "wrong amount".into(), &cancel)
        .await
        .unwrap();
    let completed = f
        .handler
        .approve_reversal(&f.supervisor, requested.id, &cancel)
        .await
        .unwrap();
    assert_eq!(completed.request.reversal_reference, Some(reference("REV-BCI-1")));
    assert_eq!(f.balance(f.vault).await, dec!(50000));
}

#[tokio::test]
async fn test_bank_cash_at_another_branch_forbidden() {
    let f = fixture().await;
    let outsider = actor("Teller", BranchId::new(), "003", false);

    let err = f
        .handler
        .post_bank_cash(
            &outsider,
            BankCashCommand {
                direction: BankCashDirection::CashIn,
                branch_id: f.branch,
                reference_id: reference("BCI-1"),
                event_code: code(BANK_CASH),
                amount: dec!(100),
                narration: String::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::BranchNotAuthorized { .. }));
    assert!(f.store.entries().await.is_empty());
}

#[tokio::test]
async fn test_cancelled_bank_cash_leaves_nothing() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = f
        .handler
        .post_bank_cash(
            &f.teller,
            BankCashCommand {
                direction: BankCashDirection::CashIn,
                branch_id: f.branch,
                reference_id: reference("BCI-1"),
                event_code: code(BANK_CASH),
                amount: dec!(100),
                narration: String::new(),
            },
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::Cancelled)));
    assert!(f.store.entries().await.is_empty());
    assert_eq!(f.balance(f.vault).await, dec!(50000));
}

// ========== Reversal workflow ==========

#[tokio::test]
async fn test_reversal_request_approve_restores_balances() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();

    let request = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "wrong amount".into(), &cancel)
        .await
        .unwrap();
    assert_eq!(request.state, ReversalState::ReversalRequested);
    assert_eq!(request.branch_id, f.branch);

    let completed = f
        .handler
        .approve_reversal(&f.supervisor, request.id, &cancel)
        .await
        .unwrap();

    assert_eq!(completed.request.state, ReversalState::Reversed);
    assert_eq!(completed.request.decided_by, Some(f.supervisor.user_id));
    assert_eq!(
        completed.request.reversal_reference,
        Some(reference("REV-BCI-1"))
    );
    let snapshot = completed.request.snapshot.as_ref().unwrap();
    assert_eq!(snapshot.before.len(), 2);
    assert_eq!(completed.entries.len(), 2);

    assert_eq!(f.balance(f.vault).await, dec!(50000));
    assert_eq!(f.balance(f.bank).await, Decimal::ZERO);

    let entries = f.store.entries().await;
    assert!(entries
        .iter()
        .filter(|e| e.reference_id == reference("BCI-1"))
        .all(|e| e.status == EntryStatus::Reversed));
    let vault = f.store.account(f.vault).await.unwrap();
    assert!(reconcile_account(&vault, &entries).is_balanced());

    let stored = f.store.reversal_request(request.id).await.unwrap();
    assert_eq!(stored.state, ReversalState::Reversed);
}

#[tokio::test]
async fn test_self_approved_reversal_forbidden() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();
    let request = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "wrong amount".into(), &cancel)
        .await
        .unwrap();

    let err = f
        .handler
        .approve_reversal(&f.teller, request.id, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CashError::Workflow(WorkflowError::SelfApprovalForbidden(_))
    ));
    assert_eq!(f.store.entries().await.len(), 2);
    assert_eq!(f.balance(f.vault).await, dec!(38000));
    assert_eq!(
        f.store.reversal_request(request.id).await.unwrap().state,
        ReversalState::ReversalRequested
    );
}

#[tokio::test]
async fn test_reversal_cannot_be_requested_twice() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();
    let request = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "wrong amount".into(), &cancel)
        .await
        .unwrap();

    let err = f
        .handler
        .request_reversal(&f.supervisor, reference("BCI-1"), "again".into(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::ReversalInProgress(_)));

    f.handler
        .approve_reversal(&f.supervisor, request.id, &cancel)
        .await
        .unwrap();

    let err = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "again".into(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, CashError::Ledger(LedgerError::AlreadyReversed(_))));
}

#[tokio::test]
async fn test_rejected_reversal_keeps_posting() {
    let f = fixture().await;
    let cancel = CancellationToken::new();
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();
    let request = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), "wrong amount".into(), &cancel)
        .await
        .unwrap();

    let rejected = f
        .handler
        .reject_reversal(&f.supervisor, request.id, "amount is right".into(), &cancel)
        .await
        .unwrap();

    assert_eq!(rejected.state, ReversalState::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("amount is right"));
    assert_eq!(f.balance(f.vault).await, dec!(38000));

    let err = f
        .handler
        .approve_reversal(&f.supervisor, request.id, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CashError::Workflow(WorkflowError::InvalidReversalTransition { .. })
    ));

    // A fresh request may follow a rejected one.
    f.handler
        .request_reversal(&f.teller, reference("BCI-1"), "really wrong".into(), &cancel)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reversal_of_unknown_reference() {
    let f = fixture().await;
    let err = f
        .handler
        .request_reversal(&f.teller, reference("NOPE"), "typo".into(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::Ledger(LedgerError::ReferenceNotFound(_))));
}

#[tokio::test]
async fn test_reversal_requires_reason() {
    let f = fixture().await;
    f.bank_cash(BankCashDirection::CashIn, "BCI-1", dec!(12000))
        .await
        .unwrap();

    let err = f
        .handler
        .request_reversal(&f.teller, reference("BCI-1"), String::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CashError::Workflow(WorkflowError::ReversalReasonRequired)));
}
