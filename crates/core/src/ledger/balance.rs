//! Account balance calculations.
//!
//! Booking direction rules, per-entry balance snapshots, reconciliation of an
//! account against its entries, and statement reconstruction.

use chrono::{DateTime, Utc};
use corebank_shared::types::{AccountId, AccountingEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::entry::AccountingEntry;
use super::types::AccountKind;

/// Whether an account's balance grows on debits or on credits.
///
/// - Debit-normal (vaults, tellers, nostros): balance += debit - credit
/// - Credit-normal (customer deposits, liaison payables): balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingDirection {
    /// Balance increases on debit.
    DebitNormal,
    /// Balance increases on credit.
    CreditNormal,
}

impl BookingDirection {
    /// Default booking direction for an account kind.
    #[must_use]
    pub const fn for_kind(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Teller
            | AccountKind::Vault
            | AccountKind::Transit
            | AccountKind::Bank
            | AccountKind::Internal => Self::DebitNormal,
            AccountKind::Customer | AccountKind::Liaison => Self::CreditNormal,
        }
    }

    /// Calculates the balance change for an entry.
    #[must_use]
    pub fn calculate_balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::DebitNormal => debit - credit,
            Self::CreditNormal => credit - debit,
        }
    }

    /// Returns the string representation of the direction.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DebitNormal => "debit_normal",
            Self::CreditNormal => "credit_normal",
        }
    }

    /// Parses a direction from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debit_normal" | "debit" => Some(Self::DebitNormal),
            "credit_normal" | "credit" => Some(Self::CreditNormal),
            _ => None,
        }
    }
}

/// Point-in-time balance information recorded on an entry.
///
/// - `previous_balance`, `debit_balance_bf` and `credit_balance_bf` are taken
///   before the entry is applied
/// - `current_balance` is the balance after the entry
/// - `account_version` increases by exactly one per applied entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Account version after this entry.
    pub account_version: i64,
    /// Balance before this entry.
    pub previous_balance: Decimal,
    /// Balance after this entry.
    pub current_balance: Decimal,
    /// Cumulative debits brought forward.
    pub debit_balance_bf: Decimal,
    /// Cumulative credits brought forward.
    pub credit_balance_bf: Decimal,
}

/// Balances of one account captured for the reversal audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalanceSnapshot {
    /// The account.
    pub account_id: AccountId,
    /// Current balance.
    pub current_balance: Decimal,
    /// Cumulative debits.
    pub debit_balance: Decimal,
    /// Cumulative credits.
    pub credit_balance: Decimal,
    /// Account version.
    pub version: i64,
}

/// Outcome of reconciling an account against its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Beginning balance plus the signed sum of all entries.
    pub expected: Decimal,
    /// Balance stored on the account.
    pub actual: Decimal,
}

impl Reconciliation {
    /// Difference between the stored and the recomputed balance.
    #[must_use]
    pub fn drift(&self) -> Decimal {
        self.actual - self.expected
    }

    /// Returns true if the account reconciles exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.drift().is_zero()
    }
}

/// Recomputes an account's balance from the entries that reference it.
///
/// Reversed originals are counted together with their inverse legs, so a
/// reversed movement nets to zero.
#[must_use]
pub fn reconcile_account(account: &Account, entries: &[AccountingEntry]) -> Reconciliation {
    let movement: Decimal = entries
        .iter()
        .filter(|entry| entry.account_id == account.id)
        .map(|entry| {
            account
                .booking_direction
                .calculate_balance_change(entry.debit_amount, entry.credit_amount)
        })
        .sum();

    Reconciliation {
        expected: account.balances().beginning + movement,
        actual: account.current_balance(),
    }
}

/// One line of an account statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementLine {
    /// Entry behind the line.
    pub entry_id: AccountingEntryId,
    /// Value date.
    pub value_date: DateTime<Utc>,
    /// Reference of the movement.
    pub reference_id: String,
    /// Narration.
    pub narration: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Balance after the line.
    pub balance: Decimal,
}

/// Rebuilds a statement for one account from entry snapshots alone.
///
/// Lines are ordered by account version, which is the order the entries were
/// applied in.
#[must_use]
pub fn statement_lines(account_id: AccountId, entries: &[AccountingEntry]) -> Vec<StatementLine> {
    let mut own: Vec<&AccountingEntry> = entries
        .iter()
        .filter(|entry| entry.account_id == account_id)
        .collect();
    own.sort_by_key(|entry| entry.balance.account_version);

    own.into_iter()
        .map(|entry| StatementLine {
            entry_id: entry.id,
            value_date: entry.value_date,
            reference_id: entry.reference_id.to_string(),
            narration: entry.narration.clone(),
            debit: entry.debit_amount,
            credit: entry.credit_amount,
            balance: entry.balance.current_balance,
        })
        .collect()
}
