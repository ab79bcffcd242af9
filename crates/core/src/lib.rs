//! Core ledger rules for the ERP ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here; the `db`
//! crate wraps them in transactions.
//!
//! # Modules
//!
//! - `ledger` - Double-entry validation, balance math, reversal, entry codes
//! - `period` - Accounting period calendar, state machine and closing plan
//! - `auth` - Roles and the single capability check
//! - `audit` - Vocabulary of the append-only audit trail
//! - `approval` - Approval state machine in front of business-event posting

pub mod approval;
pub mod audit;
pub mod auth;
pub mod ledger;
pub mod period;
