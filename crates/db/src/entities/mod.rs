//! `SeaORM` entity definitions.
//!
//! Enumerated columns are stored as text and parsed into the domain enums
//! by the store; each table carries a CHECK constraint on the allowed values.

pub mod accounting_entries;
pub mod accounts;
pub mod branch_liaison_accounts;
pub mod cash_movement_accounts;
pub mod cash_requests;
pub mod ledger_references;
pub mod reversal_requests;

pub mod prelude {
    //! Entity re-exports.
    pub use super::accounting_entries::Entity as AccountingEntries;
    pub use super::accounts::Entity as Accounts;
    pub use super::branch_liaison_accounts::Entity as BranchLiaisonAccounts;
    pub use super::cash_movement_accounts::Entity as CashMovementAccounts;
    pub use super::cash_requests::Entity as CashRequests;
    pub use super::ledger_references::Entity as LedgerReferences;
    pub use super::reversal_requests::Entity as ReversalRequests;
}
