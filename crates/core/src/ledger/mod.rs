//! Double-entry accounting engine.
//!
//! This module implements the core ledger functionality:
//! - Accounts and their running balances
//! - The posting engine producing balanced entry batches
//! - The double-entry validator
//! - The duplicate/existence guard on reference ids
//! - The reversal engine
//! - The ledger service running them over a unit of work

pub mod account;
pub mod balance;
pub mod entry;
pub mod error;
pub mod guard;
pub mod posting;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use account::{Account, AccountBalances, NewAccount};
pub use balance::{
    AccountBalanceSnapshot, BalanceSnapshot, BookingDirection, Reconciliation, StatementLine,
    reconcile_account, statement_lines,
};
pub use entry::{AccountingEntry, split_amount};
pub use error::LedgerError;
pub use guard::DuplicateGuard;
pub use posting::{PostingEngine, SettlementAccounts};
pub use reversal::{
    ReversalAuthorization, ReversalCommand, ReversalEngine, ReversalOutcome, ReversalSnapshot,
};
pub use service::LedgerService;
pub use types::{
    AMOUNT_SCALE, AccountKind, AccountStatus, ActorContext, EntryStatus, EntryType, EventCode,
    MovementRequest, OperationType, ReferenceId, ensure_valid_amount,
};
pub use validation::{evaluate_double_entry_rule, validate_batch};
