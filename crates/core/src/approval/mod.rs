//! Approval workflow in front of business-event posting.
//!
//! A request carries a business event. Reaching APPROVED posts the event
//! exactly once; the posted entry id is stored on the request.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod approval_props;

pub use error::ApprovalError;
pub use service::ApprovalWorkflow;
pub use types::{ApprovalAction, ApprovalStatus};
