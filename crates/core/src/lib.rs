//! Core business logic for Corebank.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached through the [`store::LedgerStore`] seam; an in-memory
//! implementation ships here and the Postgres one lives in `corebank-db`.
//!
//! # Modules
//!
//! - `ledger` - Double-entry posting, validation, duplicate guard and reversal
//! - `workflow` - Approval and reversal state machines
//! - `store` - Unit of work traits and the in-memory store
//! - `cash` - Cash movement orchestration handlers

pub mod cash;
pub mod ledger;
pub mod store;
pub mod workflow;
