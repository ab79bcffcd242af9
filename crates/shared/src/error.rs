//! User-facing error type.
//!
//! Ledger and storage errors are translated into `AppError` at the edge of
//! the system. Caller-correctable errors keep their specific message;
//! infrastructure errors are reduced to a generic retry hint.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Message shown for infrastructure failures.
pub const TRY_AGAIN_MESSAGE: &str = "The ledger is temporarily unavailable, please try again";

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Access denied for the actor's role.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or unbalanced input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// State machine violation (already posted, period closed, ...).
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflict (e.g., duplicate code or reference).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient failure; the caller may retry once it knows the outcome.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error, including ledger integrity failures.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::BusinessRule(_) => 422,
            Self::Conflict(_) => 409,
            Self::Unavailable(_) => 503,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::Unavailable(_) => "UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if a caller may retry after re-querying state.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Database(_))
    }

    /// Message safe to show to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::BusinessRule(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Unavailable(_) | Self::Database(_) | Self::Internal(_) => {
                TRY_AGAIN_MESSAGE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Forbidden(String::new()), 403, "FORBIDDEN")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::BusinessRule(String::new()), 422, "BUSINESS_RULE_VIOLATION")]
    #[case(AppError::Conflict(String::new()), 409, "CONFLICT")]
    #[case(AppError::Unavailable(String::new()), 503, "UNAVAILABLE")]
    #[case(AppError::Database(String::new()), 500, "DATABASE_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_user_message_keeps_business_reason() {
        let err = AppError::BusinessRule("period 2025-11 is closed".into());
        assert_eq!(err.user_message(), "period 2025-11 is closed");
    }

    #[test]
    fn test_user_message_hides_infrastructure_details() {
        let err = AppError::Database("connection reset by peer at 10.0.0.5".into());
        assert_eq!(err.user_message(), TRY_AGAIN_MESSAGE);
        assert!(err.is_retryable());
        assert!(!AppError::Validation("x".into()).is_retryable());
    }
}
