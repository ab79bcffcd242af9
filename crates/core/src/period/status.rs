//! Accounting period state machine.
//!
//! ```text
//! OPEN --close--> CLOSED --lock--> LOCKED (terminal)
//!   ^               |
//!   +----reopen-----+
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Status of an accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodStatus {
    /// Accepts postings.
    Open,
    /// Closed; may be reopened.
    Closed,
    /// Closed permanently.
    Locked,
}

impl PeriodStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Locked => "LOCKED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "CLOSED" => Some(Self::Closed),
            "LOCKED" => Some(Self::Locked),
            _ => None,
        }
    }

    /// Returns true if entries may be posted into the period.
    #[must_use]
    pub const fn allows_posting(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// CLOSED or LOCKED.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::Locked)
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change requested on a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodAction {
    /// OPEN → CLOSED.
    Close,
    /// CLOSED → OPEN.
    Reopen,
    /// CLOSED → LOCKED.
    Lock,
}

impl PeriodAction {
    /// Operation name recorded in the audit trail.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "CLOSE_PERIOD",
            Self::Reopen => "REOPEN_PERIOD",
            Self::Lock => "LOCK_PERIOD",
        }
    }
}

/// Validates a period transition and returns the resulting status.
///
/// # Errors
///
/// - close on CLOSED/LOCKED: `AlreadyClosed`
/// - reopen or lock on LOCKED: `PeriodLocked`
/// - reopen or lock on OPEN: `PeriodNotClosed`
pub fn validate_status_transition(
    period_name: &str,
    from: PeriodStatus,
    action: PeriodAction,
) -> Result<PeriodStatus, LedgerError> {
    match (from, action) {
        (PeriodStatus::Open, PeriodAction::Close) => Ok(PeriodStatus::Closed),
        (PeriodStatus::Closed, PeriodAction::Reopen) => Ok(PeriodStatus::Open),
        (PeriodStatus::Closed, PeriodAction::Lock) => Ok(PeriodStatus::Locked),
        (PeriodStatus::Closed | PeriodStatus::Locked, PeriodAction::Close) => {
            Err(LedgerError::AlreadyClosed(period_name.to_string()))
        }
        (PeriodStatus::Locked, PeriodAction::Reopen | PeriodAction::Lock) => {
            Err(LedgerError::PeriodLocked(period_name.to_string()))
        }
        (PeriodStatus::Open, PeriodAction::Reopen | PeriodAction::Lock) => {
            Err(LedgerError::PeriodNotClosed(period_name.to_string()))
        }
    }
}

/// Checks that an entry may be posted into a period.
///
/// # Errors
///
/// Returns `LedgerError::PeriodClosed` naming the period.
pub fn ensure_open(period_name: &str, status: PeriodStatus) -> Result<(), LedgerError> {
    if status.allows_posting() {
        Ok(())
    } else {
        Err(LedgerError::period_closed(period_name))
    }
}
