//! Validation failures of an invoice edit.

use paytrack_core::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable reason for a rejected edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    NegativeAmount,
    MissingPaymentDate,
    InvalidStatus,
    AmountOutOfRange,
}

impl ValidationReason {
    pub fn code(self) -> &'static str {
        match self {
            ValidationReason::NegativeAmount => "NEGATIVE_AMOUNT",
            ValidationReason::MissingPaymentDate => "MISSING_PAYMENT_DATE",
            ValidationReason::InvalidStatus => "INVALID_STATUS",
            ValidationReason::AmountOutOfRange => "AMOUNT_OUT_OF_RANGE",
        }
    }
}

impl core::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// An edit the amount rule refuses to apply.
///
/// Deterministic: re-evaluating the same input yields the same error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("negative amount")]
    NegativeAmount,

    /// The resulting status requires a payment date and none was recorded.
    #[error("missing payment date for status {0}")]
    MissingPaymentDate(String),

    /// The status label is unknown, or not allowed by the active policy.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// Fines or total do not fit in a decimal.
    #[error("amount out of range: {0}")]
    AmountOutOfRange(String),
}

impl ValidationError {
    pub fn reason(&self) -> ValidationReason {
        match self {
            ValidationError::NegativeAmount => ValidationReason::NegativeAmount,
            ValidationError::MissingPaymentDate(_) => ValidationReason::MissingPaymentDate,
            ValidationError::InvalidStatus(_) => ValidationReason::InvalidStatus,
            ValidationError::AmountOutOfRange(_) => ValidationReason::AmountOutOfRange,
        }
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::validation(format!("{}: {}", err.reason().code(), err))
    }
}
