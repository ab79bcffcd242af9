//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Domain types for journal entries and lines
//! - Line and account validation
//! - Balance math by normal side
//! - Reversing entries
//! - Entry code formatting
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod numbering;
pub mod reversal;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod validation_props;

pub use balance::{
    BalanceCheck, LineTotals, TrialBalance, TrialBalanceRow, aggregate_by_account, replay,
};
pub use error::LedgerError;
pub use numbering::{format_entry_code, sequence_scope};
pub use reversal::{OriginalEntry, build_reversal, check_reversible, reverse_lines};
pub use types::{
    AccountSnapshot, AccountType, BusinessEvent, DraftInput, EntryStatus, EntryTotals, LineInput,
    NormalBalance, Reference, SourceType,
};
pub use validation::{validate_accounts, validate_draft, validate_lines};
