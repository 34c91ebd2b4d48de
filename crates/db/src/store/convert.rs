//! Conversions between entity models and ledger domain types.

use chrono::{DateTime, FixedOffset, Utc};
use corebank_core::cash::{CashRequest, CashRequestKind};
use corebank_core::ledger::{
    Account, AccountBalances, AccountKind, AccountStatus, AccountingEntry, BalanceSnapshot,
    BookingDirection, EntryStatus, EntryType, EventCode, NewAccount, OperationType, ReferenceId,
};
use corebank_core::store::StoreError;
use corebank_core::workflow::{ApprovalStatus, ReversalRequest, ReversalState};
use corebank_shared::types::{
    AccountId, AccountingEntryId, BankId, BranchId, CashRequestId, ReversalRequestId, UserId,
};
use sea_orm::ActiveValue::{NotSet, Set};

use crate::entities::{accounting_entries, accounts, cash_requests, reversal_requests};

fn invalid(column: &str, value: &str) -> StoreError {
    StoreError::InvalidData(format!("unexpected {column} '{value}'"))
}

fn parse<T>(column: &str, value: &str, parser: impl Fn(&str) -> Option<T>) -> Result<T, StoreError> {
    parser(value).ok_or_else(|| invalid(column, value))
}

fn reference(column: &str, value: String) -> Result<ReferenceId, StoreError> {
    ReferenceId::new(value).map_err(|e| StoreError::InvalidData(format!("{column}: {e}")))
}

fn event_code(value: String) -> Result<EventCode, StoreError> {
    EventCode::new(value).map_err(|e| StoreError::InvalidData(format!("event_code: {e}")))
}

pub(crate) fn to_db_time(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.into()
}

fn from_db_time(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

// ========== Accounts ==========

pub(crate) fn account_from_model(model: accounts::Model) -> Result<Account, StoreError> {
    let kind = parse("account kind", &model.kind, AccountKind::parse)?;
    let booking_direction = parse(
        "booking direction",
        &model.booking_direction,
        BookingDirection::parse,
    )?;
    let status = parse("account status", &model.status, AccountStatus::parse)?;

    let mut account = Account::open(NewAccount {
        account_number: model.account_number,
        name: model.name,
        kind,
        booking_direction,
        currency: model.currency,
        bank_id: BankId::from_uuid(model.bank_id),
        branch_id: BranchId::from_uuid(model.branch_id),
        category_code: model.category_code,
    })
    .with_id(AccountId::from_uuid(model.id))
    .with_balances(AccountBalances {
        current: model.current_balance,
        debit: model.debit_balance,
        credit: model.credit_balance,
        last: model.last_balance,
        beginning: model.beginning_balance,
        beginning_debit: model.beginning_debit_balance,
        beginning_credit: model.beginning_credit_balance,
        version: model.version,
    });
    account.status = status;
    account.is_deleted = model.is_deleted;
    Ok(account)
}

pub(crate) fn account_to_active(account: &Account) -> accounts::ActiveModel {
    let balances = account.balances();
    let now = to_db_time(Utc::now());
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        account_number: Set(account.account_number.clone()),
        name: Set(account.name.clone()),
        kind: Set(account.kind.as_str().to_string()),
        booking_direction: Set(account.booking_direction.as_str().to_string()),
        currency: Set(account.currency.clone()),
        status: Set(account.status.as_str().to_string()),
        bank_id: Set(account.bank_id.into_inner()),
        branch_id: Set(account.branch_id.into_inner()),
        category_code: Set(account.category_code.clone()),
        current_balance: Set(balances.current),
        debit_balance: Set(balances.debit),
        credit_balance: Set(balances.credit),
        last_balance: Set(balances.last),
        beginning_balance: Set(balances.beginning),
        beginning_debit_balance: Set(balances.beginning_debit),
        beginning_credit_balance: Set(balances.beginning_credit),
        version: Set(balances.version),
        is_deleted: Set(account.is_deleted),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

/// Active model updating only the balance columns of a locked account.
pub(crate) fn account_balances_update(account: &Account) -> accounts::ActiveModel {
    let balances = account.balances();
    accounts::ActiveModel {
        id: sea_orm::ActiveValue::Unchanged(account.id.into_inner()),
        current_balance: Set(balances.current),
        debit_balance: Set(balances.debit),
        credit_balance: Set(balances.credit),
        last_balance: Set(balances.last),
        version: Set(balances.version),
        updated_at: Set(to_db_time(Utc::now())),
        ..Default::default()
    }
}

// ========== Entries ==========

pub(crate) fn entry_from_model(model: accounting_entries::Model) -> Result<AccountingEntry, StoreError> {
    Ok(AccountingEntry {
        id: AccountingEntryId::from_uuid(model.id),
        entry_date: from_db_time(model.entry_date),
        value_date: from_db_time(model.value_date),
        entry_type: parse("entry type", &model.entry_type, EntryType::parse)?,
        currency: model.currency,
        amount: model.amount,
        debit_amount: model.debit_amount,
        credit_amount: model.credit_amount,
        account_id: AccountId::from_uuid(model.account_id),
        counter_account_id: AccountId::from_uuid(model.counter_account_id),
        balance: BalanceSnapshot {
            account_version: model.account_version,
            previous_balance: model.previous_balance,
            current_balance: model.current_balance,
            debit_balance_bf: model.debit_balance_bf,
            credit_balance_bf: model.credit_balance_bf,
        },
        reference_id: reference("reference_id", model.reference_id)?,
        event_code: event_code(model.event_code)?,
        operation_type: parse("operation type", &model.operation_type, OperationType::parse)?,
        narration: model.narration,
        initiated_by: UserId::from_uuid(model.initiated_by),
        initiator_name: model.initiator_name,
        branch_id: BranchId::from_uuid(model.branch_id),
        status: parse("entry status", &model.status, EntryStatus::parse)?,
        is_auxiliary: model.is_auxiliary,
        reverses_entry_id: model.reverses_entry_id.map(AccountingEntryId::from_uuid),
    })
}

pub(crate) fn entry_to_active(entry: &AccountingEntry) -> accounting_entries::ActiveModel {
    accounting_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        entry_date: Set(to_db_time(entry.entry_date)),
        value_date: Set(to_db_time(entry.value_date)),
        entry_type: Set(entry.entry_type.as_str().to_string()),
        currency: Set(entry.currency.clone()),
        amount: Set(entry.amount),
        debit_amount: Set(entry.debit_amount),
        credit_amount: Set(entry.credit_amount),
        account_id: Set(entry.account_id.into_inner()),
        counter_account_id: Set(entry.counter_account_id.into_inner()),
        account_version: Set(entry.balance.account_version),
        previous_balance: Set(entry.balance.previous_balance),
        current_balance: Set(entry.balance.current_balance),
        debit_balance_bf: Set(entry.balance.debit_balance_bf),
        credit_balance_bf: Set(entry.balance.credit_balance_bf),
        reference_id: Set(entry.reference_id.to_string()),
        event_code: Set(entry.event_code.to_string()),
        operation_type: Set(entry.operation_type.as_str().to_string()),
        narration: Set(entry.narration.clone()),
        initiated_by: Set(entry.initiated_by.into_inner()),
        initiator_name: Set(entry.initiator_name.clone()),
        branch_id: Set(entry.branch_id.into_inner()),
        status: Set(entry.status.as_str().to_string()),
        is_auxiliary: Set(entry.is_auxiliary),
        reverses_entry_id: Set(entry.reverses_entry_id.map(AccountingEntryId::into_inner)),
        is_deleted: Set(false),
        created_at: NotSet,
    }
}

// ========== Reversal requests ==========

pub(crate) fn reversal_request_from_model(
    model: reversal_requests::Model,
) -> Result<ReversalRequest, StoreError> {
    let snapshot = model
        .snapshot
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| StoreError::InvalidData(format!("reversal snapshot: {e}")))?;

    Ok(ReversalRequest {
        id: ReversalRequestId::from_uuid(model.id),
        reference_id: reference("reference_id", model.reference_id)?,
        branch_id: BranchId::from_uuid(model.branch_id),
        state: parse("reversal state", &model.state, ReversalState::parse)?,
        issued_by: UserId::from_uuid(model.issued_by),
        reason: model.reason,
        requested_at: from_db_time(model.requested_at),
        decided_by: model.decided_by.map(UserId::from_uuid),
        decided_at: model.decided_at.map(from_db_time),
        rejection_reason: model.rejection_reason,
        reversal_reference: model
            .reversal_reference
            .map(|r| reference("reversal_reference", r))
            .transpose()?,
        snapshot,
    })
}

pub(crate) fn reversal_request_to_active(
    request: &ReversalRequest,
) -> Result<reversal_requests::ActiveModel, StoreError> {
    let snapshot = request
        .snapshot
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| StoreError::InvalidData(format!("reversal snapshot: {e}")))?;

    Ok(reversal_requests::ActiveModel {
        id: Set(request.id.into_inner()),
        reference_id: Set(request.reference_id.to_string()),
        branch_id: Set(request.branch_id.into_inner()),
        state: Set(request.state.as_str().to_string()),
        issued_by: Set(request.issued_by.into_inner()),
        reason: Set(request.reason.clone()),
        requested_at: Set(to_db_time(request.requested_at)),
        decided_by: Set(request.decided_by.map(UserId::into_inner)),
        decided_at: Set(request.decided_at.map(to_db_time)),
        rejection_reason: Set(request.rejection_reason.clone()),
        reversal_reference: Set(request.reversal_reference.as_ref().map(ToString::to_string)),
        snapshot: Set(snapshot),
    })
}

// ========== Cash requests ==========

pub(crate) fn cash_request_from_model(model: cash_requests::Model) -> Result<CashRequest, StoreError> {
    Ok(CashRequest {
        id: CashRequestId::from_uuid(model.id),
        kind: parse("cash request kind", &model.kind, CashRequestKind::parse)?,
        branch_id: BranchId::from_uuid(model.branch_id),
        reference_id: reference("reference_id", model.reference_id)?,
        event_code: event_code(model.event_code)?,
        requested_amount: model.requested_amount,
        approved_amount: model.approved_amount,
        narration: model.narration,
        status: parse("approval status", &model.status, ApprovalStatus::parse)?,
        requested_by: UserId::from_uuid(model.requested_by),
        requested_at: from_db_time(model.requested_at),
        decided_by: model.decided_by.map(UserId::from_uuid),
        decided_at: model.decided_at.map(from_db_time),
        rejection_reason: model.rejection_reason,
    })
}

pub(crate) fn cash_request_to_active(request: &CashRequest) -> cash_requests::ActiveModel {
    cash_requests::ActiveModel {
        id: Set(request.id.into_inner()),
        kind: Set(request.kind.as_str().to_string()),
        branch_id: Set(request.branch_id.into_inner()),
        reference_id: Set(request.reference_id.to_string()),
        event_code: Set(request.event_code.to_string()),
        requested_amount: Set(request.requested_amount),
        approved_amount: Set(request.approved_amount),
        narration: Set(request.narration.clone()),
        status: Set(request.status.as_str().to_string()),
        requested_by: Set(request.requested_by.into_inner()),
        requested_at: Set(to_db_time(request.requested_at)),
        decided_by: Set(request.decided_by.map(UserId::into_inner)),
        decided_at: Set(request.decided_at.map(to_db_time)),
        rejection_reason: Set(request.rejection_reason.clone()),
    }
}
