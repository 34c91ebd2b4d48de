//! Cash request types and handler commands.

use chrono::{DateTime, Utc};
use corebank_shared::types::{BranchId, CashRequestId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{AccountingEntry, EventCode, OperationType, ReferenceId};
use crate::workflow::ApprovalStatus;

/// Kind of a cash request awaiting head-office approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashRequestKind {
    /// A branch asks for its vault to be topped up.
    Replenishment,
    /// A branch reports a customer deposit made at the bank.
    DepositNotification,
}

impl CashRequestKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Replenishment => "replenishment",
            Self::DepositNotification => "deposit_notification",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replenishment" => Some(Self::Replenishment),
            "deposit_notification" => Some(Self::DepositNotification),
            _ => None,
        }
    }

    /// Operation type recorded on the entries of an approved request.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        match self {
            Self::Replenishment => OperationType::CashReplenishment,
            Self::DepositNotification => OperationType::DepositNotification,
        }
    }
}

impl std::fmt::Display for CashRequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A branch's cash request.
///
/// The reference id is reserved at submission and carried by the entries
/// posted when the request is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashRequest {
    /// Unique identifier.
    pub id: CashRequestId,
    /// What is being requested.
    pub kind: CashRequestKind,
    /// Requesting branch.
    pub branch_id: BranchId,
    /// Reference of the movement posted on approval.
    pub reference_id: ReferenceId,
    /// Event code resolving the source and destination accounts.
    pub event_code: EventCode,
    /// Amount asked for.
    pub requested_amount: Decimal,
    /// Amount granted, once approved.
    pub approved_amount: Option<Decimal>,
    /// Free text carried on the entries.
    pub narration: String,
    /// Current approval status.
    pub status: ApprovalStatus,
    /// User who submitted the request.
    pub requested_by: UserId,
    /// When it was submitted.
    pub requested_at: DateTime<Utc>,
    /// User who approved, rejected or redirected it.
    pub decided_by: Option<UserId>,
    /// When that decision was taken.
    pub decided_at: Option<DateTime<Utc>>,
    /// Rejection reason, if rejected.
    pub rejection_reason: Option<String>,
}

impl CashRequest {
    /// Records a decision and the new status.
    pub fn decide(&mut self, status: ApprovalStatus, decided_by: UserId) {
        self.status = status;
        self.decided_by = Some(decided_by);
        self.decided_at = Some(Utc::now());
    }
}

/// Input for submitting a cash request.
#[derive(Debug, Clone)]
pub struct NewCashRequest {
    /// What is being requested.
    pub kind: CashRequestKind,
    /// Requesting branch.
    pub branch_id: BranchId,
    /// Reference the approval will post under.
    pub reference_id: ReferenceId,
    /// Event code of the movement.
    pub event_code: EventCode,
    /// Amount asked for.
    pub amount: Decimal,
    /// Free text.
    pub narration: String,
}

/// Head-office approval of a cash request.
#[derive(Debug, Clone, Copy)]
pub struct ApproveCashRequest {
    /// Request being approved.
    pub request_id: CashRequestId,
    /// Amount granted; `None` grants the full requested amount.
    pub approved_amount: Option<Decimal>,
}

/// Direction of a bank cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankCashDirection {
    /// Cash leaves the vault for the bank.
    CashIn,
    /// Cash comes back from the bank into the vault.
    CashOut,
}

impl BankCashDirection {
    /// Operation type recorded on the entries.
    #[must_use]
    pub const fn operation_type(&self) -> OperationType {
        match self {
            Self::CashIn => OperationType::BankCashIn,
            Self::CashOut => OperationType::BankCashOut,
        }
    }
}

/// A bank cash-in or cash-out at a branch.
///
/// The event code maps to the vault (source) and the bank account
/// (destination) of the branch; cash-out runs the mapping backwards.
#[derive(Debug, Clone)]
pub struct BankCashCommand {
    /// Cash-in or cash-out.
    pub direction: BankCashDirection,
    /// Branch the movement happens at.
    pub branch_id: BranchId,
    /// Reference of the movement.
    pub reference_id: ReferenceId,
    /// Event code resolving the accounts.
    pub event_code: EventCode,
    /// Amount moved.
    pub amount: Decimal,
    /// Free text.
    pub narration: String,
}

/// Result of an approval that posted a movement.
#[derive(Debug, Clone)]
pub struct CashPosting {
    /// The request after its status update.
    pub request: CashRequest,
    /// The legs that were committed.
    pub entries: Vec<AccountingEntry>,
}
