//! Approval error types.

use erp_ledger_shared::AppError;
use thiserror::Error;

use crate::approval::types::ApprovalStatus;
use crate::ledger::LedgerError;

/// Errors that can occur during approval operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// Attempted an invalid status transition.
    #[error("Invalid approval transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ApprovalStatus,
        /// The attempted target status.
        to: ApprovalStatus,
    },

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Approval request not found.
    #[error("Approval request {0} not found")]
    RequestNotFound(String),

    /// Stored payload could not be read back.
    #[error("Approval request {0} has an unreadable payload")]
    CorruptPayload(String),

    /// Permission or validation failure from the ledger rules.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ApprovalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_APPROVAL_TRANSITION",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::RequestNotFound(_) => "APPROVAL_REQUEST_NOT_FOUND",
            Self::CorruptPayload(_) => "CORRUPT_APPROVAL_PAYLOAD",
            Self::Ledger(inner) => inner.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } => 422,
            Self::RejectionReasonRequired => 400,
            Self::RequestNotFound(_) => 404,
            Self::CorruptPayload(_) => 500,
            Self::Ledger(inner) => inner.http_status_code(),
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::Ledger(inner) => inner.into(),
            ApprovalError::InvalidTransition { .. } => Self::BusinessRule(err.to_string()),
            ApprovalError::RejectionReasonRequired => Self::Validation(err.to_string()),
            ApprovalError::RequestNotFound(_) => Self::NotFound(err.to_string()),
            ApprovalError::CorruptPayload(_) => Self::Internal(err.to_string()),
        }
    }
}
