//! Expense error types.
//!
//! Permission predicates never produce these for a denial; a denial is
//! `Ok(false)`. Actions turn denials into the variants below.

use hostfund_shared::AppError;
use hostfund_shared::types::{CollectiveId, ExpenseId, Money};
use thiserror::Error;

use crate::expense::types::ExpenseStatus;

/// Result type alias using `ExpenseError`.
pub type ExpenseResult<T> = Result<T, ExpenseError>;

/// Errors that can occur during expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// No authenticated user on the request.
    #[error("You need to be logged in to manage expenses")]
    Unauthenticated,

    /// The requester lacks the capability, or the status disallows the operation.
    #[error("{0}")]
    Forbidden(String),

    /// The collective cannot cover the expense.
    #[error(
        "You don't have enough funds to pay this expense. Current balance: {balance}, Expense amount: {amount}"
    )]
    InsufficientFunds {
        /// Collective balance at the time of the check.
        balance: Money,
        /// Expense amount.
        amount: Money,
    },

    /// Structurally invalid request.
    #[error("{0}")]
    BadRequest(String),

    /// Expense not found.
    #[error("Expense {0} not found")]
    NotFound(ExpenseId),

    /// Collective not found.
    #[error("Collective {0} not found")]
    CollectiveNotFound(CollectiveId),

    /// The stored status changed since the expense was read.
    #[error("Expense status changed from {expected} to {actual}")]
    StaleStatus {
        /// Status the transition was computed from.
        expected: ExpenseStatus,
        /// Status found in storage.
        actual: ExpenseStatus,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ExpenseError {
    /// Shorthand for a [`ExpenseError::Forbidden`] with a message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::InsufficientFunds { .. } => 402,
            Self::BadRequest(_) => 400,
            Self::NotFound(_) | Self::CollectiveNotFound(_) => 404,
            Self::StaleStatus { .. } => 409,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "EXPENSE_NOT_FOUND",
            Self::CollectiveNotFound(_) => "COLLECTIVE_NOT_FOUND",
            Self::StaleStatus { .. } => "STALE_STATUS",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ExpenseError> for AppError {
    fn from(err: ExpenseError) -> Self {
        let message = err.to_string();
        match err {
            ExpenseError::Unauthenticated => Self::Unauthorized(message),
            ExpenseError::Forbidden(_) => Self::Forbidden(message),
            ExpenseError::InsufficientFunds { .. } => Self::InsufficientFunds(message),
            ExpenseError::BadRequest(_) => Self::BadRequest(message),
            ExpenseError::NotFound(_) | ExpenseError::CollectiveNotFound(_) => {
                Self::NotFound(message)
            }
            ExpenseError::StaleStatus { .. } => Self::Conflict(message),
            ExpenseError::Database(_) => Self::Database(message),
        }
    }
}
