//! Posting engine: turns a movement request into balanced entries.
//!
//! The engine is pure. It mutates the in-memory accounts handed to it and
//! returns the entries; persisting both is the caller's unit of work.

use chrono::{DateTime, Utc};
use corebank_shared::types::{AccountId, AccountingEntryId};

use super::account::Account;
use super::entry::{AccountingEntry, split_amount};
use super::error::LedgerError;
use super::types::{EntryStatus, EntryType, MovementRequest, ensure_valid_amount};

/// Liaison accounts settling an inter-branch movement.
#[derive(Debug)]
pub struct SettlementAccounts<'a> {
    /// Liaison account in the books of the debit-side branch.
    pub debit_branch_liaison: &'a mut Account,
    /// Liaison account in the books of the credit-side branch.
    pub credit_branch_liaison: &'a mut Account,
}

/// Stateless posting engine.
pub struct PostingEngine;

impl PostingEngine {
    /// Posts a movement of `request.amount` from `credit` to `debit`.
    ///
    /// Produces one debit leg and one credit leg sharing the request's
    /// reference. An inter-branch request additionally produces two auxiliary
    /// liaison legs so that each branch's books balance on their own:
    ///
    /// ```text
    /// debit-side branch:  Dr debit account        / Cr debit-branch liaison
    /// credit-side branch: Dr credit-branch liaison / Cr credit account
    /// ```
    ///
    /// Every check runs before any balance is touched, so an error leaves the
    /// accounts exactly as they were. The duplicate-reference check is the
    /// caller's job (see `DuplicateGuard`) because it needs storage.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive or has more than four decimal places
    /// - `IdenticalAccounts` if two legs would hit the same account
    /// - `AccountClosed` if an account is closed or soft-deleted
    /// - `CurrencyMismatch` if the accounts do not share a currency
    /// - `SettlementAccountsRequired` for an inter-branch request without liaisons
    pub fn post_movement(
        request: &MovementRequest,
        debit: &mut Account,
        credit: &mut Account,
        settlement: Option<SettlementAccounts<'_>>,
    ) -> Result<Vec<AccountingEntry>, LedgerError> {
        let settlement = if request.is_inter_branch() {
            Some(settlement.ok_or_else(|| {
                LedgerError::SettlementAccountsRequired(request.reference_id.to_string())
            })?)
        } else {
            None
        };

        Self::validate(request, debit, credit, settlement.as_ref())?;

        let entry_date = Utc::now();
        let entries = match settlement {
            None => {
                let (debit_id, credit_id) = (debit.id, credit.id);
                vec![
                    Self::leg(request, entry_date, debit, credit_id, EntryType::Debit, false),
                    Self::leg(request, entry_date, credit, debit_id, EntryType::Credit, false),
                ]
            }
            Some(SettlementAccounts {
                debit_branch_liaison,
                credit_branch_liaison,
            }) => {
                let (debit_id, credit_id) = (debit.id, credit.id);
                let (debit_liaison_id, credit_liaison_id) =
                    (debit_branch_liaison.id, credit_branch_liaison.id);
                vec![
                    Self::leg(request, entry_date, debit, debit_liaison_id, EntryType::Debit, false),
                    Self::leg(
                        request,
                        entry_date,
                        debit_branch_liaison,
                        debit_id,
                        EntryType::Credit,
                        true,
                    ),
                    Self::leg(
                        request,
                        entry_date,
                        credit_branch_liaison,
                        credit_id,
                        EntryType::Debit,
                        true,
                    ),
                    Self::leg(request, entry_date, credit, credit_liaison_id, EntryType::Credit, false),
                ]
            }
        };

        Ok(entries)
    }

    /// Checks that need neither storage nor loaded accounts.
    ///
    /// The ledger service runs this before it locks anything; `post_movement`
    /// runs it again so the engine stays safe to call on its own.
    pub(crate) fn precheck(
        request: &MovementRequest,
        debit_account_id: AccountId,
        credit_account_id: AccountId,
    ) -> Result<(), LedgerError> {
        ensure_valid_amount(request.amount)?;
        if debit_account_id == credit_account_id {
            return Err(LedgerError::IdenticalAccounts(debit_account_id));
        }
        Ok(())
    }

    fn validate(
        request: &MovementRequest,
        debit: &Account,
        credit: &Account,
        settlement: Option<&SettlementAccounts<'_>>,
    ) -> Result<(), LedgerError> {
        Self::precheck(request, debit.id, credit.id)?;

        let mut involved: Vec<&Account> = vec![debit, credit];
        if let Some(settlement) = settlement {
            involved.push(settlement.debit_branch_liaison);
            involved.push(settlement.credit_branch_liaison);
        }

        let mut seen: Vec<AccountId> = Vec::with_capacity(involved.len());
        for account in &involved {
            if seen.contains(&account.id) {
                return Err(LedgerError::IdenticalAccounts(account.id));
            }
            seen.push(account.id);
        }

        for account in &involved {
            account.ensure_postable()?;
        }

        if let Some(mismatch) = involved.iter().find(|a| a.currency != debit.currency) {
            return Err(LedgerError::CurrencyMismatch {
                debit: debit.currency.clone(),
                credit: mismatch.currency.clone(),
            });
        }

        Ok(())
    }

    /// Builds one leg and applies it to `account`.
    fn leg(
        request: &MovementRequest,
        entry_date: DateTime<Utc>,
        account: &mut Account,
        counter_account_id: AccountId,
        entry_type: EntryType,
        is_auxiliary: bool,
    ) -> AccountingEntry {
        let balance = account.apply(entry_type, request.amount);
        let (debit_amount, credit_amount) = split_amount(entry_type, request.amount);

        AccountingEntry {
            id: AccountingEntryId::new(),
            entry_date,
            value_date: request.value_date,
            entry_type,
            currency: account.currency.clone(),
            amount: request.amount,
            debit_amount,
            credit_amount,
            account_id: account.id,
            counter_account_id,
            balance,
            reference_id: request.reference_id.clone(),
            event_code: request.event_code.clone(),
            operation_type: request.operation_type,
            narration: request.narration.clone(),
            initiated_by: request.initiated_by,
            initiator_name: request.initiator_name.clone(),
            branch_id: account.branch_id,
            status: EntryStatus::Posted,
            is_auxiliary,
            reverses_entry_id: None,
        }
    }
}
