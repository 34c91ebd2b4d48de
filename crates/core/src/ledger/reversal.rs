//! Reversal engine: offsets every leg of a posted movement.
//!
//! Each original leg gets one inverse leg on the same account, with debit and
//! credit swapped and the same amount, so every touched balance returns to
//! where it was before the movement. Originals are only ever flagged
//! `Reversed`; nothing is deleted or rewritten.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use corebank_shared::types::{AccountId, AccountingEntryId, UserId};
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::balance::AccountBalanceSnapshot;
use super::entry::{AccountingEntry, split_amount};
use super::error::LedgerError;
use super::types::{EntryStatus, OperationType, ReferenceId};

/// Who issued and who approved a reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversalAuthorization {
    /// User who requested the reversal.
    pub issued_by: UserId,
    /// User who approved it; must differ from `issued_by`.
    pub approved_by: UserId,
}

/// Input of [`ReversalEngine::reverse`].
#[derive(Debug, Clone)]
pub struct ReversalCommand {
    /// Reference of the movement being reversed.
    pub reference_id: ReferenceId,
    /// Reference carried by the inverse legs.
    pub reversal_reference: ReferenceId,
    /// Issuer and approver.
    pub authorization: ReversalAuthorization,
    /// Display name of the approver, recorded as initiator.
    pub approver_name: String,
}

/// Structured before/after audit record of a reversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalSnapshot {
    /// Original legs as they stood before the reversal.
    pub before: Vec<AccountingEntry>,
    /// Inverse legs produced by the reversal.
    pub after: Vec<AccountingEntry>,
    /// Balances of every touched account before the reversal.
    pub balances_before: Vec<AccountBalanceSnapshot>,
    /// Balances of every touched account after the reversal.
    pub balances_after: Vec<AccountBalanceSnapshot>,
}

/// Result of a reversal.
#[derive(Debug, Clone)]
pub struct ReversalOutcome {
    /// Inverse legs to persist.
    pub entries: Vec<AccountingEntry>,
    /// Audit snapshot.
    pub snapshot: ReversalSnapshot,
}

impl ReversalOutcome {
    /// Ids of the original legs that are now reversed.
    #[must_use]
    pub fn reversed_entry_ids(&self) -> Vec<AccountingEntryId> {
        self.entries.iter().filter_map(|e| e.reverses_entry_id).collect()
    }
}

/// Stateless reversal engine.
pub struct ReversalEngine;

impl ReversalEngine {
    /// Produces the inverse batch for `originals` and flags them reversed.
    ///
    /// `accounts` must hold every account the originals touch, already locked
    /// by the caller. As with posting, every check runs before any balance or
    /// status is changed.
    ///
    /// # Errors
    ///
    /// - `ReferenceNotFound` if `originals` holds no leg for the reference
    /// - `SelfApprovalForbidden` if issuer and approver are the same user
    /// - `AlreadyReversed` if any leg is already reversed
    /// - `AccountNotFound` / `AccountClosed` for a missing or closed account
    pub fn reverse(
        command: &ReversalCommand,
        originals: &mut [AccountingEntry],
        accounts: &mut BTreeMap<AccountId, Account>,
    ) -> Result<ReversalOutcome, LedgerError> {
        let authorization = command.authorization;
        let reference = &command.reference_id;

        if originals.is_empty() || originals.iter().any(|e| &e.reference_id != reference) {
            return Err(LedgerError::ReferenceNotFound(reference.to_string()));
        }
        if authorization.issued_by == authorization.approved_by {
            return Err(LedgerError::SelfApprovalForbidden(authorization.approved_by));
        }
        if originals.iter().any(AccountingEntry::is_reversed) {
            return Err(LedgerError::AlreadyReversed(reference.to_string()));
        }
        for original in originals.iter() {
            accounts
                .get(&original.account_id)
                .ok_or(LedgerError::AccountNotFound(original.account_id))?
                .ensure_postable()?;
        }

        let touched: BTreeSet<AccountId> = originals.iter().map(|e| e.account_id).collect();
        let balances_before = balance_snapshots(accounts, &touched);
        let before = originals.to_vec();

        let entry_date = Utc::now();
        let mut entries = Vec::with_capacity(originals.len());
        for original in originals.iter_mut() {
            let Some(account) = accounts.get_mut(&original.account_id) else {
                return Err(LedgerError::AccountNotFound(original.account_id));
            };
            let entry_type = original.entry_type.opposite();
            let balance = account.apply(entry_type, original.amount);
            let (debit_amount, credit_amount) = split_amount(entry_type, original.amount);

            entries.push(AccountingEntry {
                id: AccountingEntryId::new(),
                entry_date,
                value_date: entry_date,
                entry_type,
                currency: original.currency.clone(),
                amount: original.amount,
                debit_amount,
                credit_amount,
                account_id: original.account_id,
                counter_account_id: original.counter_account_id,
                balance,
                reference_id: command.reversal_reference.clone(),
                event_code: original.event_code.clone(),
                operation_type: OperationType::Reversal,
                narration: format!("Reversal of {reference}: {}", original.narration),
                initiated_by: authorization.approved_by,
                initiator_name: command.approver_name.clone(),
                branch_id: original.branch_id,
                status: EntryStatus::Posted,
                is_auxiliary: original.is_auxiliary,
                reverses_entry_id: Some(original.id),
            });
            original.status = EntryStatus::Reversed;
        }

        let balances_after = balance_snapshots(accounts, &touched);
        let snapshot = ReversalSnapshot {
            before,
            after: entries.clone(),
            balances_before,
            balances_after,
        };

        Ok(ReversalOutcome { entries, snapshot })
    }
}

fn balance_snapshots(
    accounts: &BTreeMap<AccountId, Account>,
    touched: &BTreeSet<AccountId>,
) -> Vec<AccountBalanceSnapshot> {
    touched
        .iter()
        .filter_map(|id| accounts.get(id))
        .map(Account::balance_snapshot)
        .collect()
}
