//! Approval and reversal workflows.
//!
//! # Modules
//!
//! - `types` - Closed status enumerations and the reversal record
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use service::WorkflowService;
pub use types::{
    ApprovalStatus, RedirectTarget, ReversalAction, ReversalRequest, ReversalState,
};
