//! Ledger error types for validation and state errors.
//!
//! This module defines all errors that can occur during ledger operations,
//! including line validation, account registry rules, period state
//! violations and entry state transitions.

use chrono::NaiveDate;
use erp_ledger_shared::types::{AccountId, JournalEntryId, Money, MoneyError, PeriodId};
use erp_ledger_shared::AppError;
use thiserror::Error;

use crate::auth::Capability;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A line or header is malformed. `line` is the 0-based line index.
    #[error("{}", validation_message(*.line, .reason))]
    Validation {
        /// Offending line index, if the problem is line-specific.
        line: Option<usize>,
        /// Human-readable reason.
        reason: String,
    },

    /// Debits and credits differ.
    #[error("Entry is not balanced. Debit: {debit}, Credit: {credit}, Imbalance: {imbalance}")]
    Unbalanced {
        /// Total debit.
        debit: Money,
        /// Total credit.
        credit: Money,
        /// Debit minus credit.
        imbalance: Money,
    },

    /// An amount could not be represented in minor units.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account code already in use.
    #[error("Account code {0} already exists")]
    DuplicateAccountCode(String),

    /// Account type cannot change once posted lines reference it.
    #[error("Cannot change type of account {0} because it has posted lines")]
    AccountTypeLocked(String),

    /// Retained earnings account is not configured in the chart.
    #[error("Retained earnings account {0} not found")]
    RetainedEarningsMissing(String),

    // ========== Period Errors ==========
    /// Target period is CLOSED or LOCKED.
    #[error("period {period} is closed")]
    PeriodClosed {
        /// Period name, e.g. `2025-11`.
        period: String,
    },

    /// No period can be provisioned for this date.
    #[error("Posting date {date} is outside the allowed posting window")]
    PostingDateOutOfRange {
        /// The rejected date.
        date: NaiveDate,
    },

    /// Period not found.
    #[error("Accounting period {0} not found")]
    PeriodNotFound(String),

    /// Closing a period that is already CLOSED or LOCKED.
    #[error("period {0} is already closed")]
    AlreadyClosed(String),

    /// An earlier period is still OPEN.
    #[error("Cannot close period {period}: earlier period {earliest_open} is still open")]
    EarlierPeriodsOpen {
        /// The period being closed.
        period: String,
        /// Earliest open period before it.
        earliest_open: String,
    },

    /// Draft entries are dated inside the period.
    #[error("Cannot close period {period}: {count} draft entries pending")]
    DraftEntriesPending {
        /// The period being closed.
        period: String,
        /// Number of drafts.
        count: u64,
    },

    /// LOCKED periods are terminal.
    #[error("period {0} is locked")]
    PeriodLocked(String),

    /// Reopen or lock on a period that is not CLOSED.
    #[error("period {0} is not closed")]
    PeriodNotClosed(String),

    // ========== Entry State Errors ==========
    /// Entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),

    /// Entry is no longer DRAFT.
    #[error("Journal entry {0} is already posted")]
    AlreadyPosted(String),

    /// Entry has already been reversed.
    #[error("Journal entry {0} is already reversed")]
    AlreadyReversed(String),

    /// Reversal of an entry that was never posted.
    #[error("Journal entry {0} is not posted")]
    NotPosted(String),

    /// A stored entry failed re-validation at post time.
    #[error("Journal entry {entry_id} is unbalanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// The entry.
        entry_id: JournalEntryId,
        /// Total debit.
        debit: Money,
        /// Total credit.
        credit: Money,
    },

    /// Business event reference already posted.
    #[error("Reference {reference_type}#{reference_id} has already been posted as {entry_code}")]
    DuplicateReference {
        /// Source document type.
        reference_type: String,
        /// Source document identifier.
        reference_id: String,
        /// Code of the existing entry.
        entry_code: String,
    },

    /// Reverse, reopen and reject require a reason.
    #[error("A reason is required")]
    ReasonRequired,

    // ========== Authorization ==========
    /// Actor's role lacks the capability.
    #[error("Role {role} is not allowed to {capability}")]
    InsufficientPermission {
        /// Actor role name.
        role: String,
        /// Denied capability.
        capability: Capability,
    },

    // ========== Internal ==========
    /// Arithmetic overflow on stored balances.
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn validation_message(line: Option<usize>, reason: &str) -> String {
    match line {
        Some(line) => format!("Line {line}: {reason}"),
        None => reason.to_string(),
    }
}

impl LedgerError {
    /// Shorthand for a line-level validation error.
    #[must_use]
    pub fn line(line: usize, reason: impl Into<String>) -> Self {
        Self::Validation {
            line: Some(line),
            reason: reason.into(),
        }
    }

    /// Shorthand for an entry-level validation error.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Validation {
            line: None,
            reason: reason.into(),
        }
    }

    /// Period-closed error naming the period.
    #[must_use]
    pub fn period_closed(period: impl Into<String>) -> Self {
        Self::PeriodClosed {
            period: period.into(),
        }
    }

    /// Not-found error for an account id.
    #[must_use]
    pub fn account_not_found(id: AccountId) -> Self {
        Self::AccountNotFound(id.to_string())
    }

    /// Not-found error for an entry id.
    #[must_use]
    pub fn entry_not_found(id: JournalEntryId) -> Self {
        Self::EntryNotFound(id.to_string())
    }

    /// Not-found error for a period id.
    #[must_use]
    pub fn period_not_found(id: PeriodId) -> Self {
        Self::PeriodNotFound(id.to_string())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unbalanced { .. } => "UNBALANCED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::AccountTypeLocked(_) => "ACCOUNT_TYPE_LOCKED",
            Self::RetainedEarningsMissing(_) => "RETAINED_EARNINGS_MISSING",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::PostingDateOutOfRange { .. } => "POSTING_DATE_OUT_OF_RANGE",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::AlreadyClosed(_) => "ALREADY_CLOSED",
            Self::EarlierPeriodsOpen { .. } => "EARLIER_PERIODS_OPEN",
            Self::DraftEntriesPending { .. } => "DRAFT_ENTRIES_PENDING",
            Self::PeriodLocked(_) => "PERIOD_LOCKED",
            Self::PeriodNotClosed(_) => "PERIOD_NOT_CLOSED",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AlreadyPosted(_) => "ALREADY_POSTED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::DuplicateReference { .. } => "DUPLICATE_REFERENCE",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::InsufficientPermission { .. } => "INSUFFICIENT_PERMISSION",
            Self::BalanceOverflow(_) => "BALANCE_OVERFLOW",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::Validation { .. }
            | Self::Unbalanced { .. }
            | Self::InvalidAmount(_)
            | Self::ReasonRequired => 400,

            // 403 Forbidden
            Self::InsufficientPermission { .. } => 403,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::PeriodNotFound(_) | Self::EntryNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateAccountCode(_) | Self::DuplicateReference { .. } => 409,

            // 422 Unprocessable - state machine violations
            Self::AccountTypeLocked(_)
            | Self::PeriodClosed { .. }
            | Self::PostingDateOutOfRange { .. }
            | Self::AlreadyClosed(_)
            | Self::EarlierPeriodsOpen { .. }
            | Self::DraftEntriesPending { .. }
            | Self::PeriodLocked(_)
            | Self::PeriodNotClosed(_)
            | Self::AlreadyPosted(_)
            | Self::AlreadyReversed(_)
            | Self::NotPosted(_) => 422,

            // 500 Internal Server Error
            Self::RetainedEarningsMissing(_)
            | Self::UnbalancedEntry { .. }
            | Self::BalanceOverflow(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Domain errors are deterministic; only storage-level failures retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::BusinessRule(message),
            _ => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::line(1, "zero amount").error_code(), "VALIDATION_ERROR");
        assert_eq!(
            LedgerError::Unbalanced {
                debit: Money::from_minor(100),
                credit: Money::from_minor(50),
                imbalance: Money::from_minor(50),
            }
            .error_code(),
            "UNBALANCED"
        );
        assert_eq!(LedgerError::AlreadyPosted("JE-2025-11-0001".into()).error_code(), "ALREADY_POSTED");
        assert_eq!(LedgerError::ReasonRequired.error_code(), "REASON_REQUIRED");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::invalid("no lines").http_status_code(), 400);
        assert_eq!(
            LedgerError::InsufficientPermission {
                role: "VIEWER".into(),
                capability: Capability::PostEntry,
            }
            .http_status_code(),
            403
        );
        assert_eq!(LedgerError::EntryNotFound("x".into()).http_status_code(), 404);
        assert_eq!(LedgerError::period_closed("2025-11").http_status_code(), 422);
        assert_eq!(LedgerError::Internal("boom".into()).http_status_code(), 500);
    }

    #[test]
    fn test_domain_errors_are_not_retryable() {
        assert!(!LedgerError::AlreadyPosted("x".into()).is_retryable());
        assert!(!LedgerError::period_closed("2025-11").is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(LedgerError::period_closed("2025-11").to_string(), "period 2025-11 is closed");
        assert_eq!(LedgerError::line(2, "account is a header").to_string(), "Line 2: account is a header");
        assert_eq!(LedgerError::invalid("at least two lines").to_string(), "at least two lines");

        let err = LedgerError::Unbalanced {
            debit: Money::from_minor(10_000),
            credit: Money::from_minor(5_000),
            imbalance: Money::from_minor(5_000),
        };
        assert_eq!(
            err.to_string(),
            "Entry is not balanced. Debit: 100.00, Credit: 50.00, Imbalance: 50.00"
        );
    }

    #[test]
    fn test_app_error_mapping_keeps_business_message() {
        let app: AppError = LedgerError::period_closed("2025-11").into();
        assert!(matches!(app, AppError::BusinessRule(_)));
        assert_eq!(app.user_message(), "period 2025-11 is closed");

        let app: AppError = LedgerError::Internal("constraint xyz".into()).into();
        assert!(matches!(app, AppError::Internal(_)));
        assert_ne!(app.user_message(), "Internal error: constraint xyz");
    }
}
