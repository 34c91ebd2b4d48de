//! Ledger domain types for posting movements.
//!
//! This module defines the closed enumerations, validated identifiers and
//! request types used by the posting and reversal engines.

use chrono::{DateTime, Utc};
use corebank_shared::types::{BankId, BranchId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::LedgerError;

/// Entry type: either Debit or Credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit leg.
    Debit,
    /// Credit leg.
    Credit,
}

impl EntryType {
    /// Returns the other side of the ledger.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Returns the string representation of the entry type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Parses an entry type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debit" | "dr" => Some(Self::Debit),
            "credit" | "cr" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a ledger account represents in the bank's books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Customer deposit or loan account.
    Customer,
    /// Cash drawer of a teller.
    Teller,
    /// Branch vault.
    Vault,
    /// Cash in transit between vaults.
    Transit,
    /// Inter-branch liaison (due to / due from) account.
    Liaison,
    /// Nostro account held at a correspondent bank.
    Bank,
    /// Any other internal general-ledger account.
    Internal,
}

impl AccountKind {
    /// Returns the string representation of the account kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Teller => "teller",
            Self::Vault => "vault",
            Self::Transit => "transit",
            Self::Liaison => "liaison",
            Self::Bank => "bank",
            Self::Internal => "internal",
        }
    }

    /// Parses an account kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "customer" => Some(Self::Customer),
            "teller" => Some(Self::Teller),
            "vault" => Some(Self::Vault),
            "transit" => Some(Self::Transit),
            "liaison" => Some(Self::Liaison),
            "bank" => Some(Self::Bank),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }
}

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Account accepts postings.
    Open,
    /// Account is closed; no further postings.
    Closed,
}

impl AccountStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// Status of a posted accounting entry.
///
/// The only legal transition is `Posted -> Reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry is live in the ledger.
    Posted,
    /// Entry has been offset by a reversal batch.
    Reversed,
}

impl EntryStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "posted" => Some(Self::Posted),
            "reversed" => Some(Self::Reversed),
            _ => None,
        }
    }
}

/// Business operation that produced a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Cash deposited at a bank (vault to nostro).
    BankCashIn,
    /// Cash withdrawn from a bank (nostro to vault).
    BankCashOut,
    /// Vault replenishment approved by head office.
    CashReplenishment,
    /// Customer deposit notification approved by head office.
    DepositNotification,
    /// Plain transfer between two accounts.
    Transfer,
    /// Offsetting batch of a previous movement.
    Reversal,
}

impl OperationType {
    /// Returns the string representation of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BankCashIn => "bank_cash_in",
            Self::BankCashOut => "bank_cash_out",
            Self::CashReplenishment => "cash_replenishment",
            Self::DepositNotification => "deposit_notification",
            Self::Transfer => "transfer",
            Self::Reversal => "reversal",
        }
    }

    /// Parses an operation type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bank_cash_in" => Some(Self::BankCashIn),
            "bank_cash_out" => Some(Self::BankCashOut),
            "cash_replenishment" => Some(Self::CashReplenishment),
            "deposit_notification" => Some(Self::DepositNotification),
            "transfer" => Some(Self::Transfer),
            "reversal" => Some(Self::Reversal),
            _ => None,
        }
    }
}

/// Decimal places every stored amount and balance carries.
///
/// Matches the scale of the `NUMERIC(19, 4)` money columns.
pub const AMOUNT_SCALE: u32 = 4;

/// Checks that `amount` is positive and fits in [`AMOUNT_SCALE`] places.
///
/// Trailing zeros do not count, so `1.50000` is accepted.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` otherwise.
pub fn ensure_valid_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

/// Correlation key tying together all legs of one logical movement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceId(String);

impl ReferenceId {
    /// Creates a reference id, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EmptyReference` if nothing is left after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::EmptyReference);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the reference of the batch that reverses this one.
    #[must_use]
    pub fn reversal(&self, prefix: &str) -> Self {
        Self(format!("{prefix}{}", self.0))
    }

    /// Returns true if the reference starts with the reversal `prefix`.
    #[must_use]
    pub fn is_reserved(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }

    /// Fails if the reference collides with the reversal namespace.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReservedReference` for a reference starting with `prefix`.
    pub fn ensure_unreserved(&self, prefix: &str) -> Result<(), LedgerError> {
        if self.is_reserved(prefix) {
            return Err(LedgerError::ReservedReference(self.0.clone()));
        }
        Ok(())
    }

    /// Returns the reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ReferenceId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReferenceId> for String {
    fn from(value: ReferenceId) -> Self {
        value.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag identifying the business event that triggered a posting.
///
/// Codes are stored upper-case so lookups never depend on caller casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventCode(String);

impl EventCode {
    /// Creates an event code.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidEventCode` for a blank code.
    pub fn new(value: impl Into<String>) -> Result<Self, LedgerError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidEventCode(value));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EventCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventCode> for String {
    fn from(value: EventCode) -> Self {
        value.0
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the user performing an operation.
///
/// Passed explicitly into every orchestration call; nothing in the ledger
/// reads the caller from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// The acting user.
    pub user_id: UserId,
    /// Display name recorded on entries.
    pub full_name: String,
    /// Bank the user works for.
    pub bank_id: BankId,
    /// Branch the user is attached to.
    pub branch_id: BranchId,
    /// Code of that branch.
    pub branch_code: String,
    /// Whether the user acts for the head office.
    pub is_head_office: bool,
}

impl ActorContext {
    /// Returns true if the actor may operate on the given branch.
    #[must_use]
    pub fn can_act_for_branch(&self, branch_id: BranchId) -> bool {
        self.is_head_office || self.branch_id == branch_id
    }
}

/// Input of the posting engine.
///
/// Transient: never persisted as such, only through the entries it produces.
#[derive(Debug, Clone)]
pub struct MovementRequest {
    /// Free text carried on both legs.
    pub narration: String,
    /// User who initiated the movement.
    pub initiated_by: UserId,
    /// Display name of the initiator.
    pub initiator_name: String,
    /// Value date of the movement.
    pub value_date: DateTime<Utc>,
    /// Amount moved (must be positive).
    pub amount: Decimal,
    /// Business event code.
    pub event_code: EventCode,
    /// Correlation key shared by every leg.
    pub reference_id: ReferenceId,
    /// Originating branch.
    pub branch_id: BranchId,
    /// Operation classification.
    pub operation_type: OperationType,
    /// Branch on the other side of an inter-branch movement.
    pub corresponding_branch_id: Option<BranchId>,
}

impl MovementRequest {
    /// Creates a same-branch transfer request on behalf of `actor`, valued now.
    #[must_use]
    pub fn new(
        actor: &ActorContext,
        reference_id: ReferenceId,
        event_code: EventCode,
        amount: Decimal,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            narration: narration.into(),
            initiated_by: actor.user_id,
            initiator_name: actor.full_name.clone(),
            value_date: Utc::now(),
            amount,
            event_code,
            reference_id,
            branch_id: actor.branch_id,
            operation_type: OperationType::Transfer,
            corresponding_branch_id: None,
        }
    }

    /// Sets the operation type.
    #[must_use]
    pub fn with_operation(mut self, operation_type: OperationType) -> Self {
        self.operation_type = operation_type;
        self
    }

    /// Sets the originating branch.
    #[must_use]
    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = branch_id;
        self
    }

    /// Sets the value date.
    #[must_use]
    pub fn with_value_date(mut self, value_date: DateTime<Utc>) -> Self {
        self.value_date = value_date;
        self
    }

    /// Marks the movement as settled with another branch.
    #[must_use]
    pub fn inter_branch(mut self, corresponding_branch_id: BranchId) -> Self {
        self.corresponding_branch_id = Some(corresponding_branch_id);
        self
    }

    /// Returns true if the movement crosses branches.
    #[must_use]
    pub fn is_inter_branch(&self) -> bool {
        self.corresponding_branch_id
            .is_some_and(|branch| branch != self.branch_id)
    }
}
