//! Movement recorder: withdrawals, supplies and payment postings.

use std::sync::Arc;

use caixa_shared::types::{
    CashSessionId, MovementId, PaymentMethodId, PaymentReferenceId, PositiveAmount, UserId,
    fits_ledger,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::error::CashError;
use super::lifecycle::normalize_note;
use super::store::LedgerStore;
use super::types::{LedgerMovement, NewMovement};

/// Converts a raw amount into a strictly positive one.
///
/// # Errors
///
/// Returns `NonPositiveAmount` for zero or negative input and
/// `AmountOutOfRange` for input the ledger cannot store exactly.
pub fn require_positive(amount: Decimal) -> Result<PositiveAmount, CashError> {
    if amount <= Decimal::ZERO {
        return Err(CashError::NonPositiveAmount(amount));
    }
    if !fits_ledger(amount) {
        return Err(CashError::AmountOutOfRange(amount));
    }
    PositiveAmount::new(amount).ok_or(CashError::AmountOutOfRange(amount))
}

/// Appends movements to open sessions.
pub struct MovementRecorder<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> MovementRecorder<S> {
    /// Creates a recorder over `store`.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Records cash removed from the till.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` if `amount <= 0`, `AmountOutOfRange` if it cannot be stored exactly
    /// - `SessionNotFound`, `SessionClosed`, `SessionDeleted`
    pub async fn record_withdrawal(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        note: Option<String>,
        authorized_by: UserId,
    ) -> Result<LedgerMovement, CashError> {
        let amount = require_positive(amount)?;
        self.append(NewMovement::withdrawal(
            session_id,
            amount,
            normalize_note(note),
            authorized_by,
        ))
        .await
    }

    /// Records cash injected into the till.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` if `amount <= 0`, `AmountOutOfRange` if it cannot be stored exactly
    /// - `SessionNotFound`, `SessionClosed`, `SessionDeleted`
    pub async fn record_supply(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        note: Option<String>,
        authorized_by: UserId,
    ) -> Result<LedgerMovement, CashError> {
        let amount = require_positive(amount)?;
        self.append(NewMovement::supply(
            session_id,
            amount,
            normalize_note(note),
            authorized_by,
        ))
        .await
    }

    /// Records a settled payment. The payment reference is not validated.
    ///
    /// # Errors
    ///
    /// - `NonPositiveAmount` if `amount <= 0`, `AmountOutOfRange` if it cannot be stored exactly
    /// - `SessionNotFound`, `SessionClosed`, `SessionDeleted`
    /// - `PaymentMethodNotFound` if the method is not in the catalog
    pub async fn record_payment(
        &self,
        session_id: CashSessionId,
        payment_method_id: PaymentMethodId,
        amount: Decimal,
        payment_reference_id: PaymentReferenceId,
    ) -> Result<LedgerMovement, CashError> {
        let amount = require_positive(amount)?;
        self.append(NewMovement::payment(
            session_id,
            payment_method_id,
            amount,
            payment_reference_id,
        ))
        .await
    }

    /// Soft-deletes a movement. Allowed on closed sessions; never touches the session.
    ///
    /// # Errors
    ///
    /// Returns `MovementNotFound` if the movement is unknown or already removed.
    pub async fn remove_movement(&self, movement_id: MovementId) -> Result<LedgerMovement, CashError> {
        let movement = self.store.remove_movement(movement_id).await?;

        info!(
            movement_id = %movement.id,
            session_id = %movement.session_id,
            sequence_number = movement.sequence_number,
            kind = ?movement.kind,
            amount = %movement.amount,
            "Movement removed"
        );

        Ok(movement)
    }

    /// Lists a session's movements ordered by sequence number.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session is unknown.
    pub async fn list_movements(
        &self,
        session_id: CashSessionId,
        include_removed: bool,
    ) -> Result<Vec<LedgerMovement>, CashError> {
        if self.store.find_session(session_id).await?.is_none() {
            return Err(CashError::SessionNotFound(session_id));
        }

        let mut movements = self.store.list_movements(session_id).await?;
        if !include_removed {
            movements.retain(|m| m.record_state.is_active());
        }
        Ok(movements)
    }

    async fn append(&self, input: NewMovement) -> Result<LedgerMovement, CashError> {
        let movement = self.store.append_movement(input).await?;

        debug!(
            movement_id = %movement.id,
            session_id = %movement.session_id,
            sequence_number = movement.sequence_number,
            kind = ?movement.kind,
            amount = %movement.amount,
            "Movement recorded"
        );

        Ok(movement)
    }
}
