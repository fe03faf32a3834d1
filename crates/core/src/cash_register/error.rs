//! Cash register error types.
//!
//! Every variant belongs to exactly one [`ErrorKind`]: validation,
//! invalid state, not found or persistence.

use caixa_shared::types::{CashSessionId, MovementId, PaymentMethodId};
use caixa_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during cash register operations.
#[derive(Debug, Error)]
pub enum CashError {
    // ========== Validation Errors ==========
    /// Movement amounts must be strictly positive.
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount has more decimal places or a larger magnitude than the ledger holds.
    #[error("Amount {0} is out of range: at most 4 decimal places and below 10^15")]
    AmountOutOfRange(Decimal),

    /// A running total left the representable range.
    #[error("Total for payment method {0} overflowed")]
    TotalOverflow(String),

    /// Opening float cannot be negative.
    #[error("Opening amount cannot be negative, got {0}")]
    NegativeOpeningAmount(Decimal),

    /// Declared counts cannot be negative.
    #[error("Declared amount for payment method {payment_method_id} cannot be negative, got {amount}")]
    NegativeDeclaredAmount {
        /// Payment method of the offending row.
        payment_method_id: PaymentMethodId,
        /// Offending amount.
        amount: Decimal,
    },

    /// The same payment method was declared twice.
    #[error("Payment method {0} declared more than once")]
    DuplicateDeclaredValue(PaymentMethodId),

    // ========== State Errors ==========
    /// Session is already closed.
    #[error("Cash session {0} is closed")]
    SessionClosed(CashSessionId),

    /// Session was soft-deleted.
    #[error("Cash session {0} has been deleted")]
    SessionDeleted(CashSessionId),

    /// Operation requires a closed session.
    #[error("Cash session {0} is still open")]
    SessionStillOpen(CashSessionId),

    // ========== Lookup Errors ==========
    /// Session not found.
    #[error("Cash session not found: {0}")]
    SessionNotFound(CashSessionId),

    /// Movement not found or already removed.
    #[error("Movement not found: {0}")]
    MovementNotFound(MovementId),

    /// Payment method missing from the catalog.
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(PaymentMethodId),

    /// The configured cash payment method code is not in the catalog.
    #[error("Cash payment method '{0}' is not registered")]
    CashMethodNotConfigured(String),

    // ========== Persistence Errors ==========
    /// Store round-trip failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl CashError {
    /// Creates a persistence error.
    #[must_use]
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NonPositiveAmount(_)
            | Self::AmountOutOfRange(_)
            | Self::TotalOverflow(_)
            | Self::NegativeOpeningAmount(_)
            | Self::NegativeDeclaredAmount { .. }
            | Self::DuplicateDeclaredValue(_) => ErrorKind::Validation,

            Self::SessionClosed(_) | Self::SessionDeleted(_) | Self::SessionStillOpen(_) => {
                ErrorKind::InvalidState
            }

            Self::SessionNotFound(_)
            | Self::MovementNotFound(_)
            | Self::PaymentMethodNotFound(_)
            | Self::CashMethodNotConfigured(_) => ErrorKind::NotFound,

            Self::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            Self::TotalOverflow(_) => "TOTAL_OVERFLOW",
            Self::NegativeOpeningAmount(_) => "NEGATIVE_OPENING_AMOUNT",
            Self::NegativeDeclaredAmount { .. } => "NEGATIVE_DECLARED_AMOUNT",
            Self::DuplicateDeclaredValue(_) => "DUPLICATE_DECLARED_VALUE",
            Self::SessionClosed(_) => "SESSION_CLOSED",
            Self::SessionDeleted(_) => "SESSION_DELETED",
            Self::SessionStillOpen(_) => "SESSION_STILL_OPEN",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            Self::PaymentMethodNotFound(_) => "PAYMENT_METHOD_NOT_FOUND",
            Self::CashMethodNotConfigured(_) => "CASH_METHOD_NOT_CONFIGURED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

impl From<CashError> for AppError {
    fn from(err: CashError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
