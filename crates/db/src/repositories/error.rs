//! Storage error type shared by all repositories.

use std::time::Duration;

use erp_ledger_core::approval::ApprovalError;
use erp_ledger_core::ledger::LedgerError;
use erp_ledger_shared::AppError;
use sea_orm::DbErr;

/// Result type alias using [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from a repository operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A ledger rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An approval rule rejected the operation.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// The transaction did not finish before its deadline and was rolled back.
    #[error("{op} did not complete within {}s", limit.as_secs())]
    Timeout {
        /// Operation name.
        op: &'static str,
        /// Deadline that was exceeded.
        limit: Duration,
    },

    /// A stored payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns the ledger error, if this is one.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(err) | Self::Approval(ApprovalError::Ledger(err)) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the caller may retry after re-reading state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout { .. })
    }

    /// True if the database rejected a write on a unique constraint.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(err)
                if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Ledger(inner) => inner.into(),
            StoreError::Approval(inner) => inner.into(),
            StoreError::Timeout { .. } => Self::Unavailable(err.to_string()),
            StoreError::Database(inner) => Self::Database(inner.to_string()),
            StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
