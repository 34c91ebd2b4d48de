//! Accounting entry domain types.

use chrono::{DateTime, Utc};
use corebank_shared::types::{AccountId, AccountingEntryId, BranchId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::BalanceSnapshot;
use super::types::{EntryStatus, EntryType, EventCode, OperationType, ReferenceId};

/// One leg of a posted movement.
///
/// Each movement consists of entries sharing a reference id whose debits and
/// credits balance. Once posted, an entry only ever changes status to
/// `Reversed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingEntry {
    /// Unique identifier for this entry.
    pub id: AccountingEntryId,
    /// When the entry was booked.
    pub entry_date: DateTime<Utc>,
    /// Value date of the movement.
    pub value_date: DateTime<Utc>,
    /// Whether this leg debits or credits `account_id`.
    pub entry_type: EntryType,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Amount of the leg (always positive).
    pub amount: Decimal,
    /// Equal to `amount` on a debit leg, zero otherwise.
    pub debit_amount: Decimal,
    /// Equal to `amount` on a credit leg, zero otherwise.
    pub credit_amount: Decimal,
    /// Account this leg is booked on.
    pub account_id: AccountId,
    /// Account on the other side of the movement.
    pub counter_account_id: AccountId,
    /// Balances of `account_id` around this leg.
    pub balance: BalanceSnapshot,
    /// Correlation key shared by every leg of the movement.
    pub reference_id: ReferenceId,
    /// Business event code.
    pub event_code: EventCode,
    /// Operation classification.
    pub operation_type: OperationType,
    /// Narration.
    pub narration: String,
    /// User who initiated the movement.
    pub initiated_by: UserId,
    /// Display name of the initiator.
    pub initiator_name: String,
    /// Branch whose books carry this leg.
    pub branch_id: BranchId,
    /// Posted or reversed.
    pub status: EntryStatus,
    /// System-generated supporting leg (inter-branch settlement).
    pub is_auxiliary: bool,
    /// Original entry offset by this one, on reversal legs.
    pub reverses_entry_id: Option<AccountingEntryId>,
}

impl AccountingEntry {
    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => self.amount,
            EntryType::Credit => -self.amount,
        }
    }

    /// Returns true if the debit/credit columns agree with the entry type.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.entry_type {
            EntryType::Debit => {
                self.debit_amount == self.amount && self.credit_amount.is_zero()
            }
            EntryType::Credit => {
                self.credit_amount == self.amount && self.debit_amount.is_zero()
            }
        }
    }

    /// Returns true if the entry has been offset by a reversal.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.status == EntryStatus::Reversed
    }
}

/// Splits an amount into `(debit_amount, credit_amount)` for an entry type.
#[must_use]
pub fn split_amount(entry_type: EntryType, amount: Decimal) -> (Decimal, Decimal) {
    match entry_type {
        EntryType::Debit => (amount, Decimal::ZERO),
        EntryType::Credit => (Decimal::ZERO, amount),
    }
}
