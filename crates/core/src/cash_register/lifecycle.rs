//! Session lifecycle: open, close, list, soft-delete.

use std::collections::HashSet;
use std::sync::Arc;

use caixa_shared::types::{CashSessionId, TenantId, UserId, fits_ledger};
use rust_decimal::Decimal;
use tracing::info;

use super::error::CashError;
use super::store::LedgerStore;
use super::types::{CashSession, CloseSessionInput, ClosingDeclaredValue, DeclaredValue, NewCashSession};

/// Trims a free-form note, mapping blank input to `None`.
pub(crate) fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Validates declared counts: non-negative, storable, at most one per payment method.
///
/// # Errors
///
/// Returns `NegativeDeclaredAmount`, `AmountOutOfRange` or `DuplicateDeclaredValue`.
pub fn validate_declared_values(declared: &[DeclaredValue]) -> Result<(), CashError> {
    let mut seen = HashSet::with_capacity(declared.len());
    for value in declared {
        if value.amount < Decimal::ZERO {
            return Err(CashError::NegativeDeclaredAmount {
                payment_method_id: value.payment_method_id,
                amount: value.amount,
            });
        }
        if !fits_ledger(value.amount) {
            return Err(CashError::AmountOutOfRange(value.amount));
        }
        if !seen.insert(value.payment_method_id) {
            return Err(CashError::DuplicateDeclaredValue(value.payment_method_id));
        }
    }
    Ok(())
}

/// Opens and closes cash sessions.
pub struct SessionLifecycle<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> SessionLifecycle<S> {
    /// Creates a lifecycle manager over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Opens a new session.
    ///
    /// Several open sessions may coexist for the same tenant and operator.
    ///
    /// # Errors
    ///
    /// Returns `NegativeOpeningAmount` for a negative float, `AmountOutOfRange`
    /// for a float the ledger cannot store exactly, or a persistence error.
    pub async fn open_session(
        &self,
        tenant_id: TenantId,
        operator_id: UserId,
        opening_amount: Decimal,
        opening_note: Option<String>,
    ) -> Result<CashSession, CashError> {
        if opening_amount < Decimal::ZERO {
            return Err(CashError::NegativeOpeningAmount(opening_amount));
        }
        if !fits_ledger(opening_amount) {
            return Err(CashError::AmountOutOfRange(opening_amount));
        }

        let session = self
            .store
            .create_session(NewCashSession {
                tenant_id,
                operator_id,
                opening_amount,
                opening_note: normalize_note(opening_note),
            })
            .await?;

        info!(
            session_id = %session.id,
            tenant_id = %tenant_id,
            operator_id = %operator_id,
            sequence_number = session.sequence_number,
            opening_amount = %opening_amount,
            "Cash session opened"
        );

        Ok(session)
    }

    /// Closes an open session, recording the declared counts.
    ///
    /// Declared values, the closed status and the closing timestamp commit
    /// together; on any error the session stays open.
    ///
    /// # Errors
    ///
    /// - `NegativeDeclaredAmount` / `DuplicateDeclaredValue` for bad input
    /// - `SessionNotFound`, `SessionClosed`, `SessionDeleted`
    /// - `PaymentMethodNotFound` for an unknown declared method
    pub async fn close_session(
        &self,
        session_id: CashSessionId,
        closing_note: Option<String>,
        declared_values: Vec<DeclaredValue>,
    ) -> Result<CashSession, CashError> {
        validate_declared_values(&declared_values)?;

        let declared_count = declared_values.len();
        let session = self
            .store
            .close_session(CloseSessionInput {
                session_id,
                closing_note: normalize_note(closing_note),
                declared_values,
            })
            .await?;

        info!(
            session_id = %session.id,
            tenant_id = %session.tenant_id,
            operator_id = %session.operator_id,
            declared_count,
            "Cash session closed"
        );

        Ok(session)
    }

    /// Lists open sessions for a tenant, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn list_open_sessions(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<CashSession>, CashError> {
        self.store.list_open_sessions(tenant_id).await
    }

    /// Gets a session by ID, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the ID is unknown.
    pub async fn get_session(&self, session_id: CashSessionId) -> Result<CashSession, CashError> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or(CashError::SessionNotFound(session_id))
    }

    /// Soft-deletes a session. Movements are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session is unknown or already deleted.
    pub async fn delete_session(&self, session_id: CashSessionId) -> Result<CashSession, CashError> {
        let session = self.store.delete_session(session_id).await?;

        info!(
            session_id = %session.id,
            tenant_id = %session.tenant_id,
            status = ?session.status,
            "Cash session deleted"
        );

        Ok(session)
    }

    /// Declared values recorded at close (empty while open).
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the ID is unknown.
    pub async fn declared_values(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<ClosingDeclaredValue>, CashError> {
        self.get_session(session_id).await?;
        self.store.declared_values(session_id).await
    }
}
