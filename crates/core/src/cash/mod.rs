//! Cash movement orchestration.
//!
//! Head-office approval of vault replenishments and deposit notifications,
//! bank cash-in/cash-out, and the reversal request workflow, all running
//! through the ledger core.

pub mod error;
pub mod handler;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::CashError;
pub use handler::{CashMovementHandler, CompletedReversal};
pub use types::{
    ApproveCashRequest, BankCashCommand, BankCashDirection, CashPosting, CashRequest,
    CashRequestKind, NewCashRequest,
};
