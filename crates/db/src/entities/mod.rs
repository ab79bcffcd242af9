//! `SeaORM` entity definitions.
//!
//! One module per table. Monetary columns are `BIGINT` minor units.

pub mod accounting_periods;
pub mod accounts;
pub mod approval_requests;
pub mod audit_logs;
pub mod journal_entries;
pub mod journal_lines;
pub mod journal_sequences;
pub mod sea_orm_active_enums;
