//! Repository abstractions for data access.
//!
//! Repositories wrap the pure rules from `erp_ledger_core` in database
//! transactions. Every mutating call runs in one transaction under the
//! configured deadline and writes its audit record before committing.

pub mod account;
pub mod approval;
pub mod audit;
pub mod balance;
pub mod context;
pub mod error;
pub mod journal;
pub mod period;

pub use account::{AccountFilter, AccountRepository, CreateAccountInput};
pub use approval::{ApprovalOutcome, ApprovalRepository};
pub use audit::{AuditFilter, AuditRepository};
pub use balance::BalanceRepository;
pub use context::LedgerContext;
pub use error::{StoreError, StoreResult};
pub use journal::{JournalEntryWithLines, JournalFilter, JournalRepository};
pub use period::{
    CLOSING_REFERENCE_TYPE, CloseOptions, LastClosingInfo, PeriodCloseResult, PeriodFilter,
    PeriodRepository, PeriodSummary,
};
