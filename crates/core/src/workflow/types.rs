//! Workflow domain types for approvals and reversals.
//!
//! Statuses are closed enumerations; storage goes through `as_str`/`parse`
//! and everything else matches exhaustively.

use chrono::{DateTime, Utc};
use corebank_shared::types::{BranchId, ReversalRequestId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::{ReferenceId, ReversalSnapshot};

/// Department a head-office user can route a request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectTarget {
    /// Branch cash office.
    Bco,
    /// Branch treasury back office.
    Btb,
    /// Branch directorate.
    Bd,
}

impl RedirectTarget {
    /// Returns the string representation of the target.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bco => "bco",
            Self::Btb => "btb",
            Self::Bd => "bd",
        }
    }

    /// Parses a target from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bco" => Some(Self::Bco),
            "btb" => Some(Self::Btb),
            "bd" => Some(Self::Bd),
            _ => None,
        }
    }
}

/// Approval status of a cash request.
///
/// The valid transitions are:
/// - Pending → Approved | Rejected | RedirectToBranch
/// - RedirectToBranch → Approved | Rejected
/// - Approved → Completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a head-office decision.
    Pending,
    /// Approved; the movement has been posted.
    Approved,
    /// Rejected; nothing was posted.
    Rejected,
    /// Routed to a branch department for handling.
    RedirectToBranch(RedirectTarget),
    /// Fully processed.
    Completed,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RedirectToBranch(RedirectTarget::Bco) => "redirect_bco",
            Self::RedirectToBranch(RedirectTarget::Btb) => "redirect_btb",
            Self::RedirectToBranch(RedirectTarget::Bd) => "redirect_bd",
            Self::Completed => "completed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        match s.as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            _ => s
                .strip_prefix("redirect_")
                .and_then(RedirectTarget::parse)
                .map(Self::RedirectToBranch),
        }
    }

    /// Returns true if the request still awaits a decision.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::RedirectToBranch(_))
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reversal state of a posted reference.
///
/// The valid transitions are:
/// - Posted → ReversalRequested (request)
/// - ReversalRequested → ReversalApproved (approve)
/// - ReversalRequested → Rejected (reject, terminal)
/// - ReversalApproved → Reversed (complete, terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalState {
    /// Movement is posted and no reversal is in flight.
    Posted,
    /// A reversal has been requested.
    ReversalRequested,
    /// The reversal has been approved by a second user.
    ReversalApproved,
    /// Inverse entries have been posted.
    Reversed,
    /// The request was turned down; no reversal occurs.
    Rejected,
}

impl ReversalState {
    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::ReversalRequested => "reversal_requested",
            Self::ReversalApproved => "reversal_approved",
            Self::Reversed => "reversed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "posted" => Some(Self::Posted),
            "reversal_requested" => Some(Self::ReversalRequested),
            "reversal_approved" => Some(Self::ReversalApproved),
            "reversed" => Some(Self::Reversed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the state is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Reversed | Self::Rejected)
    }

    /// Returns true if a request in this state blocks new requests.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::ReversalRequested | Self::ReversalApproved)
    }
}

impl fmt::Display for ReversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action produced by a reversal state transition, with its audit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReversalAction {
    /// Reversal requested.
    Request {
        /// The new state (ReversalRequested).
        new_state: ReversalState,
        /// The requesting user.
        issued_by: UserId,
        /// When the request was made.
        requested_at: DateTime<Utc>,
    },
    /// Reversal approved by a second user.
    Approve {
        /// The new state (ReversalApproved).
        new_state: ReversalState,
        /// The approving user.
        approved_by: UserId,
        /// When it was approved.
        approved_at: DateTime<Utc>,
    },
    /// Reversal turned down.
    Reject {
        /// The new state (Rejected).
        new_state: ReversalState,
        /// The rejecting user.
        rejected_by: UserId,
        /// Reason for rejection.
        reason: String,
    },
    /// Inverse entries posted.
    Complete {
        /// The new state (Reversed).
        new_state: ReversalState,
        /// When the inverse batch was posted.
        reversed_at: DateTime<Utc>,
    },
}

impl ReversalAction {
    /// Returns the state this action moves to.
    #[must_use]
    pub fn new_state(&self) -> ReversalState {
        match self {
            Self::Request { new_state, .. }
            | Self::Approve { new_state, .. }
            | Self::Reject { new_state, .. }
            | Self::Complete { new_state, .. } => *new_state,
        }
    }
}

/// Reversal record for one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalRequest {
    /// Unique identifier.
    pub id: ReversalRequestId,
    /// Reference of the movement to reverse.
    pub reference_id: ReferenceId,
    /// Branch of the requester.
    pub branch_id: BranchId,
    /// Current state.
    pub state: ReversalState,
    /// User who asked for the reversal.
    pub issued_by: UserId,
    /// Why the movement should be reversed.
    pub reason: String,
    /// When it was requested.
    pub requested_at: DateTime<Utc>,
    /// User who approved or rejected it.
    pub decided_by: Option<UserId>,
    /// When it was approved or rejected.
    pub decided_at: Option<DateTime<Utc>>,
    /// Rejection reason, if rejected.
    pub rejection_reason: Option<String>,
    /// Reference of the inverse batch, once posted.
    pub reversal_reference: Option<ReferenceId>,
    /// Before/after audit snapshot, once posted.
    pub snapshot: Option<ReversalSnapshot>,
}

impl ReversalRequest {
    /// Builds a request from a `Request` action.
    ///
    /// Returns `None` for any other action.
    #[must_use]
    pub fn from_action(
        reference_id: ReferenceId,
        branch_id: BranchId,
        reason: String,
        action: &ReversalAction,
    ) -> Option<Self> {
        match action {
            ReversalAction::Request {
                new_state,
                issued_by,
                requested_at,
            } => Some(Self {
                id: ReversalRequestId::new(),
                reference_id,
                branch_id,
                state: *new_state,
                issued_by: *issued_by,
                reason,
                requested_at: *requested_at,
                decided_by: None,
                decided_at: None,
                rejection_reason: None,
                reversal_reference: None,
                snapshot: None,
            }),
            _ => None,
        }
    }

    /// Records the audit fields of a transition.
    pub fn apply(&mut self, action: ReversalAction) {
        self.state = action.new_state();
        match action {
            ReversalAction::Request { .. } | ReversalAction::Complete { .. } => {}
            ReversalAction::Approve {
                approved_by,
                approved_at,
                ..
            } => {
                self.decided_by = Some(approved_by);
                self.decided_at = Some(approved_at);
            }
            ReversalAction::Reject {
                rejected_by,
                reason,
                ..
            } => {
                self.decided_by = Some(rejected_by);
                self.decided_at = Some(Utc::now());
                self.rejection_reason = Some(reason);
            }
        }
    }
}
